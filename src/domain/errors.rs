//! Error kinds for the durable orchestration engine.
//!
//! Each variant below corresponds to one of the named error kinds in the
//! system design: `UsageError`, `SchemaError`, `CycleDetected`, `UnknownTool`,
//! `UnknownAgent`, `PermissionDenied`, `TenantPolicyViolation`,
//! `BudgetExceeded`, `ConsentRequired`, `MissingApiKey`, `SafetyBlocked`,
//! `BrokerUnavailable`, `ResumeStateMissing`, `JobTimeout`, `JobCancelled`,
//! `ExecutorTransient`, `ExecutorPermanent`, `CvfArtifactMissing`,
//! `CvfValidatorFailed`.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type returned by the engine's core components.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("usage error: {0}")]
    UsageError(String),

    #[error("schema validation failed for {subject}: {detail}")]
    SchemaError { subject: String, detail: String },

    #[error("cycle detected in graph: {0}")]
    CycleDetected(String),

    #[error("unknown tool referenced: {0}")]
    UnknownTool(String),

    #[error("unknown agent referenced: {0}")]
    UnknownAgent(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("tenant policy violation: {0}")]
    TenantPolicyViolation(String),

    #[error("budget exceeded: requested {requested:.2}, ceiling {ceiling:.2}")]
    BudgetExceeded { requested: f64, ceiling: f64 },

    #[error("consent required for tool: {0}")]
    ConsentRequired(String),

    #[error("missing API key for tool {tool}: expected env var {env_var}")]
    MissingApiKey { tool: String, env_var: String },

    #[error("safety blocked: {0}")]
    SafetyBlocked(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("resume requested but no state exists for run {0}")]
    ResumeStateMissing(String),

    #[error("job timeout exceeded for job {0}")]
    JobTimeout(String),

    #[error("job cancelled: {0}")]
    JobCancelled(String),

    #[error("executor transient failure for node {node_id}: {message}")]
    ExecutorTransient { node_id: Uuid, message: String },

    #[error("executor permanent failure for node {node_id}: {message}")]
    ExecutorPermanent { node_id: Uuid, message: String },

    #[error("CVF artifact missing for {auv_id}: {path}")]
    CvfArtifactMissing { auv_id: String, path: String },

    #[error("CVF validator failed for domain {domain}: {detail}")]
    CvfValidatorFailed { domain: String, detail: String },

    #[error("run-graph subprocess failed for job {job_id}: {message}")]
    JobExecutionFailed { job_id: String, message: String },

    #[error("no required-artifact mapping for AUV {0}")]
    UnknownAuv(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("io error: {0}")]
    IoError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}

/// Classification of an executor failure, used by the graph runner to decide
/// whether a node is retried, retried with a shorter backoff, or failed
/// outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retried up to the node's attempts ceiling with normal backoff.
    Transient,
    /// Not retried; the node fails immediately.
    Permanent,
    /// Retried up to the ceiling with a shorter backoff.
    Timeout,
    /// Never retried.
    Cancelled,
}

impl DomainError {
    /// Classify an error for retry purposes. Unknown errors default to
    /// `Transient`, matching the rule that unclassified errors are retried.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            DomainError::ExecutorPermanent { .. } => FailureClass::Permanent,
            DomainError::JobTimeout(_) => FailureClass::Timeout,
            DomainError::JobCancelled(_) => FailureClass::Cancelled,
            DomainError::ExecutorTransient { .. } => FailureClass::Transient,
            _ => FailureClass::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_permanent_is_never_retried() {
        let err = DomainError::ExecutorPermanent {
            node_id: Uuid::nil(),
            message: "bad params".into(),
        };
        assert_eq!(err.failure_class(), FailureClass::Permanent);
    }

    #[test]
    fn job_timeout_and_cancelled_get_their_own_classes() {
        assert_eq!(DomainError::JobTimeout("RUN-1".into()).failure_class(), FailureClass::Timeout);
        assert_eq!(DomainError::JobCancelled("RUN-1".into()).failure_class(), FailureClass::Cancelled);
    }

    #[test]
    fn unclassified_errors_default_to_transient() {
        assert_eq!(DomainError::DatabaseError("connection reset".into()).failure_class(), FailureClass::Transient);
        assert_eq!(DomainError::UsageError("bad flag".into()).failure_class(), FailureClass::Transient);
    }

    #[test]
    fn sqlx_error_converts_to_database_error() {
        let err: DomainError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DomainError::DatabaseError(_)));
    }
}

//! Ports: the trait seams the rest of the crate implements against.
//!
//! Kept in the domain layer so it stays free of I/O itself, while still
//! defining the interfaces that infrastructure and service code must
//! satisfy: this system's tenant/run/job/event/ledger/executor seams.

use async_trait::async_trait;
use std::path::PathBuf;

use super::errors::DomainResult;
use super::models::artifact::ArtifactManifest;
use super::models::job::Job;
use super::models::observability::{ObservabilityEvent, SpendLedgerEvent};
use super::models::run_state::RunState;
use super::models::tenant::TenantId;

/// Maps a tenant to its filesystem roots and validates tenant names.
pub trait TenantStore: Send + Sync {
    /// Root directory for a tenant's run artifacts (`runs/` or
    /// `runs/tenants/<tenant>/`).
    fn runs_root(&self, tenant: &TenantId) -> PathBuf;

    /// Root directory for a tenant's packaged output bundles (`dist/` or
    /// `dist/tenants/<tenant>/`).
    fn dist_root(&self, tenant: &TenantId) -> PathBuf;

    /// Confirm `path` lives under the tenant's own root: a job for tenant
    /// T must never write outside that root.
    fn is_within_tenant(&self, tenant: &TenantId, path: &std::path::Path) -> bool;
}

/// Durable, atomically-written run state storage: the run state file is
/// persisted via write-temp-then-rename so a crash never leaves a torn
/// write behind.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    async fn load(&self, tenant: &TenantId, run_id: &str) -> DomainResult<Option<RunState>>;
    async fn save(&self, tenant: &TenantId, state: &RunState) -> DomainResult<()>;
    fn state_path(&self, tenant: &TenantId, run_id: &str) -> PathBuf;
}

/// Durable job submission and claim lifecycle.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn enqueue(&self, job: Job) -> DomainResult<Job>;
    async fn get(&self, job_id: &str) -> DomainResult<Option<Job>>;
    async fn list(&self, status: Option<super::models::job::JobStatus>) -> DomainResult<Vec<Job>>;
    async fn claim_next(&self, worker_id: &str, lock_duration_ms: u64) -> DomainResult<Option<Job>>;
    async fn renew_lock(&self, job_id: &str, worker_id: &str, lock_duration_ms: u64) -> DomainResult<()>;
    async fn complete(&self, job_id: &str) -> DomainResult<()>;
    async fn fail(&self, job_id: &str, error: &str, retry_at_ms: Option<u64>) -> DomainResult<()>;
    async fn cancel(&self, job_id: &str) -> DomainResult<()>;
    /// Persist the worker's captured stdout/stderr tail for this job's
    /// current attempt.
    async fn set_logs(&self, job_id: &str, logs: &str) -> DomainResult<()>;
    async fn pause_queue(&self) -> DomainResult<()>;
    async fn resume_queue(&self) -> DomainResult<()>;
    async fn is_paused(&self) -> DomainResult<bool>;
    async fn clean(&self, older_than_ms: u64, status: super::models::job::JobStatus) -> DomainResult<u64>;
}

/// Append-only observability event sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ObservabilityEvent) -> DomainResult<()>;
}

/// Append-only spend ledger sink, one file per session.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn record(&self, event: SpendLedgerEvent) -> DomainResult<()>;
}

/// The executor contract every node type implements. The runner never
/// inspects an executor's internals, only this contract.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        ctx: &ExecutorContext,
        params: &super::models::graph::NodeParams,
    ) -> DomainResult<ExecutorOutcome>;
}

/// Context handed to an executor: tenant root, run id, and the router's
/// tool plan when the node requested capabilities.
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    pub tenant: TenantId,
    pub run_id: String,
    pub auv_id: Option<String>,
    pub run_root: PathBuf,
    pub tool_plan: Option<super::models::decision::ToolPlan>,
    pub env: std::collections::BTreeMap<String, String>,
}

/// What an executor invocation produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOutcome {
    pub artifacts: ArtifactManifest,
    pub metadata: Option<serde_json::Value>,
}

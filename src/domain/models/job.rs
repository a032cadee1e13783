//! Job queue model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Priority bucket for queue ordering. Higher numeric value runs first.
pub type Priority = i32;

/// Optional constraints carried on a job's payload and checked against
/// tenant policy before enqueue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub budget_usd: Option<f64>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

/// The payload a submitter provides when enqueuing a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(rename = "type")]
    pub job_type: String,
    pub graph_file: String,
    pub tenant: String,
    pub run_id: Option<String>,
    pub priority: Priority,
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Queue-visible job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
    Cancelled,
    Paused,
}

/// A durable job, namespaced by type and tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub stalled_count: u32,
    pub backoff_delay_ms: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Worker-owned lock, renewed periodically while active; `None` when
    /// the job is not currently claimed.
    pub lock_owner: Option<String>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Tail of the worker's child-process stdout/stderr for this job's
    /// most recent attempt.
    #[serde(default)]
    pub logs: Option<String>,
}

impl Job {
    /// Exponential backoff with a ceiling applied to retry delays.
    pub fn next_backoff_ms(&self, ceiling_ms: u64) -> u64 {
        let exp = self.backoff_delay_ms.saturating_mul(1u64 << self.attempts.min(16));
        exp.min(ceiling_ms)
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

//! Observability event and spend-ledger event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correlation ids threaded through a single observability event. Any of
/// these may be absent depending on which layer emitted the event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationIds {
    pub agent_id: Option<String>,
    pub job_id: Option<String>,
    pub run_id: Option<String>,
    pub auv_id: Option<String>,
}

/// One append-only record in `observability/hooks.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub timestamp: DateTime<Utc>,
    /// Verb-phrase event name, e.g. `node.started`, `job.enqueued`.
    pub event: String,
    #[serde(flatten)]
    pub correlation: CorrelationIds,
    pub payload: serde_json::Value,
}

impl ObservabilityEvent {
    pub fn new(event: impl Into<String>, correlation: CorrelationIds, payload: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event: event.into(),
            correlation,
            payload,
        }
    }
}

/// One append-only record in `observability/ledgers/<session>.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendLedgerEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub tool_id: String,
    pub capabilities: Vec<String>,
    pub estimated_cost_usd: f64,
}

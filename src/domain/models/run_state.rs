//! Run state model: per-node lifecycle state plus the run-wide envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Per-node lifecycle state, as a strict state machine:
/// `pending -> ready -> running -> {succeeded, failed, cancelled, skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Cancelled | NodeStatus::Skipped
        )
    }
}

/// Durable per-node state tracked across a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Opaque executor checkpoint, if the executor supports partial resume.
    pub checkpoint: Option<serde_json::Value>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            status: NodeStatus::Pending,
            attempts: 0,
            started_at: None,
            finished_at: None,
            last_error: None,
            checkpoint: None,
        }
    }
}

/// The full persisted state of one graph run, written atomically
/// (write-temp-then-rename) after every state-changing transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub project_id: String,
    pub nodes: BTreeMap<Uuid, NodeState>,
    pub completed: BTreeSet<Uuid>,
    pub failed: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, project_id: impl Into<String>, node_ids: &[Uuid]) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            project_id: project_id.into(),
            nodes: node_ids
                .iter()
                .map(|id| (*id, NodeState::default()))
                .collect(),
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reset any `running` node to `ready` on resume: its executor did not
    /// observably complete, so it must re-run from scratch.
    pub fn reset_running_to_ready(&mut self) {
        for state in self.nodes.values_mut() {
            if state.status == NodeStatus::Running {
                state.status = NodeStatus::Ready;
                state.started_at = None;
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn is_complete(&self) -> bool {
        self.nodes
            .values()
            .all(|state| state.status.is_terminal())
    }

    pub fn succeeded_ids(&self) -> BTreeSet<Uuid> {
        self.nodes
            .iter()
            .filter(|(_, s)| s.status == NodeStatus::Succeeded)
            .map(|(id, _)| *id)
            .collect()
    }
}

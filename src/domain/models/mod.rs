//! Domain models
//!
//! Pure domain entities for the durable orchestration engine: no I/O, no
//! framework concerns, only data and the invariants that can be checked
//! without external state.

pub mod artifact;
pub mod decision;
pub mod graph;
pub mod job;
pub mod observability;
pub mod policy;
pub mod run_state;
pub mod tenant;
pub mod tool;

pub use artifact::{ArtifactManifest, ManifestEntry};
pub use decision::{AlternativeCandidate, DecisionRecord, PlanEntry, PlanTotals, RejectedCandidate, ToolPlan, ROUTER_VERSION};
pub use graph::{GraphSpec, NodeParams, NodeSpec};
pub use job::{Constraints, Job, JobPayload, JobStatus, Priority};
pub use observability::{CorrelationIds, ObservabilityEvent, SpendLedgerEvent};
pub use policy::{AgentPolicy, OnMissingPrimary, PolicyBundle, SafetyFlags, SecondaryOverrides, TenantCeiling, TierDefaults};
pub use run_state::{NodeState, NodeStatus, RunState};
pub use tenant::TenantId;
pub use tool::{CostModel, SideEffect, Tier, Tool, ToolRegistry};

//! Router decision record.

use serde::{Deserialize, Serialize};

/// Version tag embedded in every decision record, bumped when the router's
/// algorithm changes in a way that could alter historical replay.
pub const ROUTER_VERSION: &str = "1";

/// A single plan entry: one tool serving one or more requested capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub tool_id: String,
    pub capabilities_served: Vec<String>,
    pub estimated_cost_usd: f64,
    pub rationale: String,
    pub side_effects: Vec<super::tool::SideEffect>,
}

/// A candidate rejected while serving some capability, with the first
/// filter reason that applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub capability: String,
    pub tool_id: String,
    pub reason: String,
}

/// One considered alternative for a capability, marked selected or
/// rejected with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub tool_id: String,
    pub selected: bool,
    pub reason: String,
}

/// Aggregate totals over a plan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlanTotals {
    pub total_cost_usd: f64,
    pub tool_count: usize,
    pub capability_count: usize,
}

/// The full audit trail produced by `plan_tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub router_version: String,
    pub agent_id: String,
    pub requested_capabilities: Vec<String>,
    pub effective_budget_usd: f64,
    pub ok: bool,
    pub plan: Vec<PlanEntry>,
    pub rejected: Vec<RejectedCandidate>,
    pub alternatives: std::collections::BTreeMap<String, Vec<AlternativeCandidate>>,
    pub warnings: Vec<String>,
    pub totals: PlanTotals,
    /// Present only when `ok=false` and the sole failure is budget: the
    /// smallest budget that would have made the plan succeed.
    pub minimum_feasible_budget_usd: Option<f64>,
}

/// Full return value of the capability router's pure core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPlan {
    pub ok: bool,
    pub plan: Vec<PlanEntry>,
    pub rejected: Vec<RejectedCandidate>,
    pub alternatives: std::collections::BTreeMap<String, Vec<AlternativeCandidate>>,
    pub warnings: Vec<String>,
    pub totals: PlanTotals,
    pub decision_record: DecisionRecord,
}

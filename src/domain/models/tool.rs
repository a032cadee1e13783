//! Tool registry entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tier a tool belongs to. Primary tools are free/local and require no
/// consent; secondary tools require explicit consent and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::Secondary => "secondary",
        }
    }
}

/// Side effects a tool may have, used by the production-mutation safety
/// filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    Network,
    FileRead,
    FileWrite,
    Exec,
    Database,
}

/// Cost model for a tool. New tools should declare `FlatPerRun`; the legacy
/// `cost_score` path is kept only for backward compatibility (see
/// DESIGN.md, Open Question 2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostModel {
    FlatPerRun { usd: f64 },
    LegacyScore { cost_score: f64 },
}

impl CostModel {
    /// Dollar cost of a single invocation. The legacy path converts
    /// `cost_score` to dollars at a fixed $0.01 per point.
    pub fn cost_usd(self) -> f64 {
        match self {
            CostModel::FlatPerRun { usd } => usd,
            CostModel::LegacyScore { cost_score } => cost_score * 0.01,
        }
    }
}

/// A tool the router can select to serve a capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub tier: Tier,
    pub capabilities: BTreeSet<String>,
    pub cost_model: CostModel,
    /// Env var name whose presence gates this tool (bypassed in TEST_MODE).
    pub api_key_env: Option<String>,
    pub side_effects: BTreeSet<SideEffect>,
}

impl Tool {
    pub fn requires_consent(&self) -> bool {
        self.tier == Tier::Secondary
    }

    pub fn has_mutating_side_effect(&self) -> bool {
        self.side_effects.contains(&SideEffect::Exec)
            || self.side_effects.contains(&SideEffect::FileWrite)
            || self.side_effects.contains(&SideEffect::Database)
    }
}

/// Closed set of tools known to the router, keyed by tool-id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolRegistry {
    pub tools: std::collections::BTreeMap<String, Tool>,
}

impl ToolRegistry {
    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }
}

//! Policy bundle entities.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How the router should behave when a capability has no primary candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum OnMissingPrimary {
    /// Reject the capability outright.
    RejectCapability,
    /// Allow a secondary candidate, optionally overriding the effective
    /// budget for this capability only.
    ProposeSecondaryWithBudget { fallback_budget_usd: Option<f64> },
}

impl Default for OnMissingPrimary {
    fn default() -> Self {
        OnMissingPrimary::RejectCapability
    }
}

/// Per-tier router defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDefaults {
    pub prefer_tier: Option<super::tool::Tier>,
    pub default_budget_usd: f64,
    pub secondary_default_budget_usd: f64,
    pub require_secondary_consent: bool,
}

/// Per-agent constraints: an allowlist of tool-ids and optional
/// per-capability budget ceilings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPolicy {
    pub allowlist: Option<BTreeSet<String>>,
    pub total_budget_ceiling_usd: Option<f64>,
    pub per_capability_budget_ceiling_usd: BTreeMap<String, f64>,
}

/// Per-tenant budget and capability ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCeiling {
    pub budget_ceiling_usd: f64,
    pub allowed_capabilities: BTreeSet<String>,
}

/// Global safety flags governing production-mutation and test-mode gates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyFlags {
    pub allow_production_mutations: bool,
    pub require_test_mode_for: BTreeSet<String>,
}

/// Secondary-tier overrides: per-tool budget overrides applied after the
/// ordinary cost calculation, ahead of the per-capability agent ceiling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecondaryOverrides {
    pub budget_overrides: BTreeMap<String, f64>,
}

/// The full policy bundle: capability map, tier defaults, per-agent
/// allowlists, per-tenant ceilings, safety flags, and fallback policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    /// capability -> ordered candidate tool-ids.
    pub capability_map: BTreeMap<String, Vec<String>>,
    pub tier_defaults: TierDefaults,
    pub agents: BTreeMap<String, AgentPolicy>,
    pub tenants: BTreeMap<String, TenantCeiling>,
    pub safety: SafetyFlags,
    pub secondary: SecondaryOverrides,
    #[serde(default)]
    pub on_missing_primary: OnMissingPrimary,
}

impl PolicyBundle {
    /// An empty bundle: no tenant ceilings or capability routing
    /// configured, so [`PolicyBundle::tenant_ceiling`] always returns
    /// `None` and enqueue-time checks become no-ops. Used where no
    /// `policies.yaml` has been loaded for the deployment.
    pub fn empty() -> Self {
        Self {
            capability_map: BTreeMap::new(),
            tier_defaults: TierDefaults {
                prefer_tier: None,
                default_budget_usd: 0.0,
                secondary_default_budget_usd: 0.0,
                require_secondary_consent: true,
            },
            agents: BTreeMap::new(),
            tenants: BTreeMap::new(),
            safety: SafetyFlags::default(),
            secondary: SecondaryOverrides::default(),
            on_missing_primary: OnMissingPrimary::RejectCapability,
        }
    }

    pub fn candidates_for(&self, capability: &str) -> &[String] {
        self.capability_map
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn agent_policy(&self, agent_id: &str) -> Option<&AgentPolicy> {
        self.agents.get(agent_id)
    }

    pub fn tenant_ceiling(&self, tenant: &str) -> Option<&TenantCeiling> {
        self.tenants.get(tenant)
    }

    /// Tool ids that appear in the capability map or any agent allowlist.
    /// Used by load-time cross-reference validation against the registry.
    pub fn referenced_tool_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for candidates in self.capability_map.values() {
            ids.extend(candidates.iter().cloned());
        }
        for agent in self.agents.values() {
            if let Some(allowlist) = &agent.allowlist {
                ids.extend(allowlist.iter().cloned());
            }
        }
        ids
    }
}

//! The capability router's pure core.
//!
//! `plan_tools` is a pure, deterministic function: identical inputs produce
//! bitwise-identical outputs and decision records. It never panics or
//! returns an `Err` for policy-level problems — those are collected into
//! `rejected[]`/`warnings[]` and surfaced through `ok=false`. The only hard
//! errors it can hit (unknown tool referenced by the capability map or an
//! allowlist) are caught earlier, at policy load time (see
//! `router::validate`).

use std::collections::BTreeMap;

use crate::domain::models::decision::{
    AlternativeCandidate, DecisionRecord, PlanEntry, PlanTotals, RejectedCandidate, ToolPlan,
    ROUTER_VERSION,
};
use crate::domain::models::policy::{OnMissingPrimary, PolicyBundle};
use crate::domain::models::tool::{CostModel, Tier, Tool, ToolRegistry};

use super::env::{RouterEnv, RouterHints};

/// One candidate's filter outcome for a single capability.
enum Verdict {
    Pass { cost_usd: f64 },
    Reject { reason: String },
}

/// `planTools(agent_id, requested_capabilities, budget_usd?, secondary_consent, env, registry, policies, hints?) -> ToolPlan`
#[allow(clippy::too_many_arguments)]
pub fn plan_tools(
    agent_id: &str,
    requested_capabilities: &[String],
    budget_usd: Option<f64>,
    secondary_consent: bool,
    env: &RouterEnv,
    registry: &ToolRegistry,
    policies: &PolicyBundle,
    hints: Option<&RouterHints>,
) -> ToolPlan {
    // Step 1: dedup, preserving first-seen order.
    let mut seen = std::collections::BTreeSet::new();
    let capabilities: Vec<String> = requested_capabilities
        .iter()
        .filter(|c| seen.insert((*c).clone()))
        .cloned()
        .collect();

    let agent_policy = policies.agent_policy(agent_id);

    // Step 2: resolve the effective budget.
    let mut effective_budget = resolve_effective_budget(budget_usd, &capabilities, registry, policies);
    if let Some(ceiling) = agent_policy.and_then(|p| p.total_budget_ceiling_usd) {
        effective_budget = effective_budget.min(ceiling);
    }

    let mut plan_entries: Vec<PlanEntry> = Vec::new();
    let mut rejected: Vec<RejectedCandidate> = Vec::new();
    let mut alternatives: BTreeMap<String, Vec<AlternativeCandidate>> = BTreeMap::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut served: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for capability in &capabilities {
        let candidates = order_candidates(capability, registry, policies, hints);
        if candidates.is_empty() {
            rejected.push(RejectedCandidate {
                capability: capability.clone(),
                tool_id: String::new(),
                reason: "no candidates registered for this capability".into(),
            });
            warnings.push(format!("capability '{capability}' has no candidate tools"));
            continue;
        }

        let has_primary = candidates
            .iter()
            .any(|id| registry.get(id).is_some_and(|t| t.tier == Tier::Primary));
        let (allow_secondary_fallback, fallback_budget) = match (&policies.on_missing_primary, has_primary) {
            (OnMissingPrimary::ProposeSecondaryWithBudget { fallback_budget_usd }, false) => {
                (true, *fallback_budget_usd)
            }
            _ => (false, None),
        };

        let cap_alternatives = alternatives.entry(capability.clone()).or_default();
        let mut chosen: Option<(String, f64)> = None;

        for tool_id in &candidates {
            let verdict = evaluate_candidate(
                tool_id,
                capability,
                registry,
                policies,
                agent_policy,
                env,
                secondary_consent,
                allow_secondary_fallback,
                &plan_entries,
                effective_budget,
                fallback_budget,
            );

            match verdict {
                Verdict::Pass { cost_usd } => {
                    cap_alternatives.push(AlternativeCandidate {
                        tool_id: tool_id.clone(),
                        selected: chosen.is_none(),
                        reason: if chosen.is_none() {
                            rationale(registry.get(tool_id), allow_secondary_fallback)
                        } else {
                            "not selected: an earlier candidate already satisfies this capability".into()
                        },
                    });
                    if chosen.is_none() {
                        chosen = Some((tool_id.clone(), cost_usd));
                        if allow_secondary_fallback {
                            if let Some(fb) = fallback_budget {
                                effective_budget = effective_budget.max(fb);
                            }
                        }
                    }
                }
                Verdict::Reject { reason } => {
                    cap_alternatives.push(AlternativeCandidate {
                        tool_id: tool_id.clone(),
                        selected: false,
                        reason: reason.clone(),
                    });
                    rejected.push(RejectedCandidate {
                        capability: capability.clone(),
                        tool_id: tool_id.clone(),
                        reason,
                    });
                }
            }
        }

        match chosen {
            Some((tool_id, cost_usd)) => {
                served.insert(capability.clone());
                if let Some(entry) = plan_entries.iter_mut().find(|e| e.tool_id == tool_id) {
                    entry.capabilities_served.push(capability.clone());
                } else {
                    let tool = registry.get(&tool_id);
                    plan_entries.push(PlanEntry {
                        tool_id,
                        capabilities_served: vec![capability.clone()],
                        estimated_cost_usd: cost_usd,
                        rationale: rationale(tool, allow_secondary_fallback),
                        side_effects: tool
                            .map(|t| t.side_effects.iter().copied().collect())
                            .unwrap_or_default(),
                    });
                }
            }
            None => {
                warnings.push(format!(
                    "capability '{capability}' could not be satisfied by any candidate"
                ));
            }
        }
    }

    let total_cost_usd: f64 = plan_entries.iter().map(|e| e.estimated_cost_usd).sum();
    let totals = PlanTotals {
        total_cost_usd,
        tool_count: plan_entries.len(),
        capability_count: capabilities.len(),
    };

    let all_served = capabilities.iter().all(|c| served.contains(c));
    let within_budget = total_cost_usd <= effective_budget + f64::EPSILON;
    let ok = capabilities.is_empty() || (all_served && within_budget);

    let minimum_feasible_budget_usd = if !ok && all_served && !within_budget {
        Some(total_cost_usd)
    } else {
        None
    };

    let decision_record = DecisionRecord {
        router_version: ROUTER_VERSION.to_string(),
        agent_id: agent_id.to_string(),
        requested_capabilities: capabilities,
        effective_budget_usd: effective_budget,
        ok,
        plan: plan_entries.clone(),
        rejected: rejected.clone(),
        alternatives: alternatives.clone(),
        warnings: warnings.clone(),
        totals,
        minimum_feasible_budget_usd,
    };

    ToolPlan {
        ok,
        plan: plan_entries,
        rejected,
        alternatives,
        warnings,
        totals,
        decision_record,
    }
}

/// Resolve the budget used for the whole plan when the caller didn't pass
/// one explicitly: the secondary default applies only when every candidate
/// for every requested capability is itself secondary-tier (there's no
/// primary option to prefer), otherwise the ordinary router default.
fn resolve_effective_budget(
    budget_usd: Option<f64>,
    capabilities: &[String],
    registry: &ToolRegistry,
    policies: &PolicyBundle,
) -> f64 {
    if let Some(budget) = budget_usd {
        return budget;
    }
    let all_secondary_only = !capabilities.is_empty()
        && capabilities.iter().all(|cap| {
            let candidates = policies.candidates_for(cap);
            !candidates.is_empty()
                && candidates
                    .iter()
                    .all(|id| registry.get(id).is_some_and(|t| t.tier == Tier::Secondary))
        });
    if all_secondary_only {
        policies.tier_defaults.secondary_default_budget_usd
    } else {
        policies.tier_defaults.default_budget_usd
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_candidate(
    tool_id: &str,
    capability: &str,
    registry: &ToolRegistry,
    policies: &PolicyBundle,
    agent_policy: Option<&crate::domain::models::policy::AgentPolicy>,
    env: &RouterEnv,
    secondary_consent: bool,
    allow_secondary_fallback: bool,
    plan_entries: &[PlanEntry],
    effective_budget: f64,
    fallback_budget: Option<f64>,
) -> Verdict {
    // (i) registry presence.
    let Some(tool) = registry.get(tool_id) else {
        return Verdict::Reject {
            reason: "tool not found in registry".into(),
        };
    };

    // (ii) agent allowlist, if defined.
    if let Some(policy) = agent_policy {
        if let Some(allowlist) = &policy.allowlist {
            if !allowlist.contains(tool_id) {
                return Verdict::Reject {
                    reason: "tool not in agent allowlist".into(),
                };
            }
        }
    }

    // (iii) secondary consent.
    if tool.requires_consent() && !secondary_consent && !allow_secondary_fallback {
        return Verdict::Reject {
            reason: "secondary tool requires consent".into(),
        };
    }

    // (iv) production-mutation safety.
    if env.is_production()
        && tool.has_mutating_side_effect()
        && !policies.safety.allow_production_mutations
        && !env.safety_allow_prod()
    {
        return Verdict::Reject {
            reason: "blocked by production mutation safety".into(),
        };
    }

    // (v) test-mode requirement.
    let touches_restricted_domain = policies
        .safety
        .require_test_mode_for
        .iter()
        .any(|domain| capability == domain || tool.capabilities.contains(domain));
    if touches_restricted_domain && !env.test_mode() {
        return Verdict::Reject {
            reason: "requires test mode".into(),
        };
    }

    // (vi) API key presence (bypassed in TEST_MODE).
    if let Some(api_key_env) = &tool.api_key_env {
        if !env.test_mode() && !env.has_key(api_key_env) {
            return Verdict::Reject {
                reason: format!("missing API key: {api_key_env}"),
            };
        }
    }

    // (vii) budget.
    let mut cost_usd = tool.cost_model.cost_usd();
    if let Some(over) = policies.secondary.budget_overrides.get(tool_id) {
        cost_usd = *over;
    }

    let already_in_plan = plan_entries.iter().any(|e| e.tool_id == tool_id);
    let marginal_cost = if already_in_plan { 0.0 } else { cost_usd };

    let mut budget_for_check = if allow_secondary_fallback {
        fallback_budget.unwrap_or(effective_budget)
    } else {
        effective_budget
    };
    if let Some(ceiling) = agent_policy.and_then(|p| p.per_capability_budget_ceiling_usd.get(capability)) {
        budget_for_check = budget_for_check.min(*ceiling);
    }

    let current_total: f64 = plan_entries.iter().map(|e| e.estimated_cost_usd).sum();
    if current_total + marginal_cost > budget_for_check + f64::EPSILON {
        return Verdict::Reject {
            reason: "cost exceeds budget".into(),
        };
    }

    Verdict::Pass { cost_usd: marginal_cost }
}

/// Order candidates by capability-serving fit. Two reordering rules apply,
/// in this order of precedence, both stable within the groups they create:
///
/// 1. If `hints.crawl` signals scale beyond `web.crawl`'s primary limits
///    (pages>100 or depth>2), secondary candidates are moved ahead of
///    primary ones for this capability.
/// 2. Otherwise, if `tier_defaults.prefer_tier` names a tier, candidates of
///    that tier are moved ahead of the other tier.
///
/// In both cases the policy map's relative order within each tier group is
/// preserved (a stable partition, not a resort).
fn order_candidates(
    capability: &str,
    registry: &ToolRegistry,
    policies: &PolicyBundle,
    hints: Option<&RouterHints>,
) -> Vec<String> {
    let candidates = policies.candidates_for(capability).to_vec();

    let crawl_beyond_limits = capability == "web.crawl"
        && hints
            .and_then(|h| h.crawl.as_ref())
            .is_some_and(super::env::CrawlHint::beyond_primary_limits);

    let preferred_tier = if crawl_beyond_limits {
        Some(Tier::Secondary)
    } else {
        policies.tier_defaults.prefer_tier
    };

    let Some(preferred_tier) = preferred_tier else {
        return candidates;
    };

    let (mut preferred, mut rest): (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());
    for id in candidates {
        match registry.get(&id).map(|t| t.tier) {
            Some(tier) if tier == preferred_tier => preferred.push(id),
            _ => rest.push(id),
        }
    }
    preferred.extend(rest);
    preferred
}

fn rationale(tool: Option<&Tool>, used_fallback: bool) -> String {
    let Some(tool) = tool else {
        return "selected".into();
    };
    let mut parts = vec![tool.tier.label().to_string()];
    if tool.requires_consent() {
        parts.push("with consent".into());
    }
    if used_fallback {
        parts.push("secondary fallback".into());
    }
    parts.push("within budget".into());
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::policy::{AgentPolicy, SecondaryOverrides, TenantCeiling};
    use crate::domain::models::tool::SideEffect;
    use std::collections::{BTreeMap, BTreeSet};

    fn tool(id: &str, tier: Tier, usd: f64, api_key_env: Option<&str>, side_effects: &[SideEffect]) -> Tool {
        Tool {
            id: id.to_string(),
            tier,
            capabilities: BTreeSet::new(),
            cost_model: CostModel::FlatPerRun { usd },
            api_key_env: api_key_env.map(str::to_string),
            side_effects: side_effects.iter().copied().collect(),
        }
    }

    fn bundle(capability_map: &[(&str, &[&str])]) -> PolicyBundle {
        let mut bundle = PolicyBundle::empty();
        bundle.tier_defaults.default_budget_usd = 1.0;
        for (cap, ids) in capability_map {
            bundle
                .capability_map
                .insert((*cap).to_string(), ids.iter().map(|s| (*s).to_string()).collect());
        }
        bundle
    }

    /// Primary-only plan: two capabilities served by one free tool, no
    /// consent needed, total cost 0.
    #[test]
    fn primary_only_plan_is_accepted_within_budget() {
        let mut registry = ToolRegistry::default();
        registry
            .tools
            .insert("playwright".into(), tool("playwright", Tier::Primary, 0.0, None, &[]));
        let policies = bundle(&[
            ("browser.automation", &["playwright"]),
            ("screenshot", &["playwright"]),
        ]);
        let env = RouterEnv::default();
        let requested = vec!["browser.automation".to_string(), "screenshot".to_string()];

        let plan = plan_tools("B7", &requested, Some(0.25), false, &env, &registry, &policies, None);

        assert!(plan.ok);
        assert_eq!(plan.plan.len(), 1);
        assert_eq!(plan.plan[0].tool_id, "playwright");
        assert_eq!(plan.plan[0].capabilities_served, vec!["browser.automation", "screenshot"]);
        assert_eq!(plan.totals.total_cost_usd, 0.0);
        assert!(plan.plan[0].rationale.contains("primary"));
        assert!(plan.plan[0].rationale.contains("within budget"));
    }

    /// A secondary tool is rejected for lack of consent, then accepted
    /// once consent is given.
    #[test]
    fn secondary_tool_requires_consent() {
        let mut registry = ToolRegistry::default();
        registry.tools.insert(
            "vercel".into(),
            tool("vercel", Tier::Secondary, 0.10, Some("VERCEL_API_KEY"), &[]),
        );
        let policies = bundle(&[("deploy.preview", &["vercel"])]);
        let mut env = RouterEnv::default();
        env.vars.insert("VERCEL_API_KEY".into(), "xxx".into());
        let requested = vec!["deploy.preview".to_string()];

        let without_consent = plan_tools("C16", &requested, Some(0.50), false, &env, &registry, &policies, None);
        assert!(!without_consent.ok);
        assert_eq!(without_consent.rejected.len(), 1);
        assert!(without_consent.rejected[0].reason.contains("requires consent"));

        let with_consent = plan_tools("C16", &requested, Some(0.50), true, &env, &registry, &policies, None);
        assert!(with_consent.ok);
        assert_eq!(with_consent.totals.total_cost_usd, 0.10);
    }

    /// Budget exactly equal to cost is accepted; one cent below is rejected
    /// with a minimum-feasible-budget hint.
    #[test]
    fn budget_exactly_at_cost_is_accepted_one_cent_below_is_rejected() {
        let mut registry = ToolRegistry::default();
        registry
            .tools
            .insert("tool-a".into(), tool("tool-a", Tier::Primary, 0.10, None, &[]));
        let policies = bundle(&[("cap.a", &["tool-a"])]);
        let env = RouterEnv::default();
        let requested = vec!["cap.a".to_string()];

        let at_cost = plan_tools("agent", &requested, Some(0.10), false, &env, &registry, &policies, None);
        assert!(at_cost.ok);

        let below_cost = plan_tools("agent", &requested, Some(0.09), false, &env, &registry, &policies, None);
        assert!(!below_cost.ok);
        assert_eq!(below_cost.decision_record.minimum_feasible_budget_usd, Some(0.10));
    }

    /// Empty requested-capabilities list: `ok=true`, empty plan, cost 0.
    #[test]
    fn empty_request_is_trivially_ok() {
        let registry = ToolRegistry::default();
        let policies = PolicyBundle::empty();
        let env = RouterEnv::default();
        let plan = plan_tools("agent", &[], None, false, &env, &registry, &policies, None);
        assert!(plan.ok);
        assert!(plan.plan.is_empty());
        assert_eq!(plan.totals.total_cost_usd, 0.0);
    }

    /// Determinism: identical inputs produce identical plans,
    /// `planTools(x) == planTools(x)`.
    #[test]
    fn identical_inputs_produce_identical_plans() {
        let mut registry = ToolRegistry::default();
        registry
            .tools
            .insert("playwright".into(), tool("playwright", Tier::Primary, 0.0, None, &[]));
        registry
            .tools
            .insert("puppeteer".into(), tool("puppeteer", Tier::Primary, 0.0, None, &[]));
        let policies = bundle(&[("browser.automation", &["playwright", "puppeteer"])]);
        let env = RouterEnv::default();
        let requested = vec!["browser.automation".to_string()];

        let a = plan_tools("B7", &requested, None, false, &env, &registry, &policies, None);
        let b = plan_tools("B7", &requested, None, false, &env, &registry, &policies, None);
        assert_eq!(serde_json::to_string(&a.decision_record).unwrap(), serde_json::to_string(&b.decision_record).unwrap());
    }

    /// Production-mutation safety: a secondary tool with a file-write side
    /// effect is blocked in `NODE_ENV=production` unless
    /// `SAFETY_ALLOW_PROD=true` or the policy allows production mutations.
    #[test]
    fn production_mutation_blocked_without_override() {
        let mut registry = ToolRegistry::default();
        registry.tools.insert(
            "db-migrator".into(),
            tool("db-migrator", Tier::Primary, 0.0, None, &[SideEffect::FileWrite, SideEffect::Database]),
        );
        let policies = bundle(&[("db.migration", &["db-migrator"])]);
        let mut env = RouterEnv::default();
        env.vars.insert("NODE_ENV".into(), "production".into());
        let requested = vec!["db.migration".to_string()];

        let blocked = plan_tools("agent", &requested, Some(1.0), false, &env, &registry, &policies, None);
        assert!(!blocked.ok);

        env.vars.insert("SAFETY_ALLOW_PROD".into(), "true".into());
        let allowed = plan_tools("agent", &requested, Some(1.0), false, &env, &registry, &policies, None);
        assert!(allowed.ok);
    }

    /// Per-agent allowlist filters out an otherwise-eligible candidate.
    #[test]
    fn agent_allowlist_restricts_candidates() {
        let mut registry = ToolRegistry::default();
        registry
            .tools
            .insert("tool-a".into(), tool("tool-a", Tier::Primary, 0.0, None, &[]));
        let mut policies = bundle(&[("cap.a", &["tool-a"])]);
        policies.agents.insert(
            "restricted-agent".into(),
            AgentPolicy {
                allowlist: Some(BTreeSet::new()),
                ..Default::default()
            },
        );
        let env = RouterEnv::default();
        let requested = vec!["cap.a".to_string()];

        let plan = plan_tools("restricted-agent", &requested, Some(1.0), false, &env, &registry, &policies, None);
        assert!(!plan.ok);
        assert!(plan.rejected[0].reason.contains("allowlist"));
    }

    #[allow(dead_code)]
    fn unused(_: SecondaryOverrides, _: TenantCeiling, _: BTreeMap<String, f64>) {}

    proptest::proptest! {
        /// For any flat cost and budget, `plan_tools` is deterministic and
        /// its accept/reject split follows the budget boundary exactly.
        #[test]
        fn plan_tools_is_deterministic_and_budget_exact(usd in 0.0f64..5.0, budget in 0.0f64..5.0) {
            let mut registry = ToolRegistry::default();
            registry.tools.insert("tool-a".into(), tool("tool-a", Tier::Primary, usd, None, &[]));
            let policies = bundle(&[("cap.a", &["tool-a"])]);
            let env = RouterEnv::default();
            let requested = vec!["cap.a".to_string()];

            let a = plan_tools("agent", &requested, Some(budget), false, &env, &registry, &policies, None);
            let b = plan_tools("agent", &requested, Some(budget), false, &env, &registry, &policies, None);
            proptest::prop_assert_eq!(
                serde_json::to_string(&a.decision_record).unwrap(),
                serde_json::to_string(&b.decision_record).unwrap()
            );

            if usd <= budget {
                proptest::prop_assert!(a.ok);
            } else {
                proptest::prop_assert!(!a.ok);
                proptest::prop_assert_eq!(a.decision_record.minimum_feasible_budget_usd, Some(usd));
            }
        }
    }

    #[test_strategy::proptest]
    fn plan_tools_accepts_any_well_formed_agent_id(#[strategy("[a-zA-Z][a-zA-Z0-9_-]{0,15}")] agent_id: String) {
        let mut registry = ToolRegistry::default();
        registry
            .tools
            .insert("tool-a".into(), tool("tool-a", Tier::Primary, 0.0, None, &[]));
        let policies = bundle(&[("cap.a", &["tool-a"])]);
        let env = RouterEnv::default();
        let requested = vec!["cap.a".to_string()];

        let plan = plan_tools(&agent_id, &requested, Some(1.0), false, &env, &registry, &policies, None);
        proptest::prop_assert!(plan.ok);
        proptest::prop_assert_eq!(plan.decision_record.agent_id.as_str(), agent_id.as_str());
    }
}

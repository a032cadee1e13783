//! The bounded-concurrency graph scheduler.
//!
//! The runner is a `ready -> running -> terminal` state machine driven by a
//! `tokio::task::JoinSet` under a fixed-size worker pool. It never inspects
//! an executor's internals; it only calls `Executor::execute` with a
//! timeout, classifies the result, and persists the run state file
//! atomically after every transition.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, FailureClass};
use crate::domain::models::graph::{GraphSpec, NodeParams, NodeSpec};
use crate::domain::models::observability::{CorrelationIds, ObservabilityEvent};
use crate::domain::models::policy::PolicyBundle;
use crate::domain::models::run_state::{NodeState, NodeStatus, RunState};
use crate::domain::models::tenant::TenantId;
use crate::domain::models::tool::ToolRegistry;
use crate::domain::ports::{EventSink, Executor, ExecutorContext, ExecutorOutcome, RunStateStore};
use crate::router::{self, RouterEnv};

use super::circuit_breaker::{CircuitBreakerRegistry, CircuitScope};
use super::dag::topological_order;
use super::state_store::new_run_id;

/// Dispatch table from node type tag to executor implementation.
pub type ExecutorRegistry = HashMap<&'static str, Arc<dyn Executor>>;

/// Options accepted by [`GraphRunner::run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: usize,
    pub run_id: Option<String>,
    pub resume: bool,
    pub auv_id: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            run_id: None,
            resume: false,
            auv_id: None,
            env: BTreeMap::new(),
        }
    }
}

/// Result of one full `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub success: bool,
    pub completed: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    pub duration_ms: u64,
    pub state_path: PathBuf,
}

/// Orchestrates one graph run to completion, checkpointing after every
/// node transition so a crash mid-run can be resumed.
pub struct GraphRunner {
    executors: Arc<ExecutorRegistry>,
    state_store: Arc<dyn RunStateStore>,
    events: Arc<dyn EventSink>,
    circuits: Arc<CircuitBreakerRegistry>,
    registry: Arc<ToolRegistry>,
    policies: Arc<PolicyBundle>,
}

struct NodeOutcome {
    node_id: Uuid,
    result: DomainResult<ExecutorOutcome>,
    started_at: chrono::DateTime<Utc>,
}

impl GraphRunner {
    pub fn new(
        executors: Arc<ExecutorRegistry>,
        state_store: Arc<dyn RunStateStore>,
        events: Arc<dyn EventSink>,
        circuits: Arc<CircuitBreakerRegistry>,
        registry: Arc<ToolRegistry>,
        policies: Arc<PolicyBundle>,
    ) -> Self {
        Self {
            executors,
            state_store,
            events,
            circuits,
            registry,
            policies,
        }
    }

    #[instrument(skip(self, graph), fields(project_id = %graph.project_id))]
    pub async fn run(
        &self,
        graph: &GraphSpec,
        tenant: &TenantId,
        opts: RunOptions,
    ) -> DomainResult<RunOutcome> {
        graph.validate_structure()?;
        // Fail fast on cycles before any node is scheduled.
        topological_order(graph)?;

        let wall_clock_start = Instant::now();
        let node_ids: Vec<Uuid> = graph.nodes.iter().map(|n| n.id).collect();
        let nodes_by_id: HashMap<Uuid, &NodeSpec> = graph.nodes.iter().map(|n| (n.id, n)).collect();

        let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for node in &graph.nodes {
            for dep in &node.dependencies {
                dependents.entry(*dep).or_default().push(node.id);
            }
        }

        let (run_id, mut state) = self.load_or_init_state(tenant, graph, &node_ids, &opts).await?;
        let state_path = self.state_store.state_path(tenant, &run_id);

        if graph.nodes.is_empty() {
            // A graph with zero nodes succeeds immediately.
            self.state_store.save(tenant, &state).await?;
            return Ok(RunOutcome {
                run_id,
                success: true,
                completed: vec![],
                failed: vec![],
                duration_ms: 0,
                state_path,
            });
        }

        let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
        let mut held_tags: HashSet<String> = HashSet::new();
        let mut join_set: JoinSet<NodeOutcome> = JoinSet::new();
        let mut running: HashSet<Uuid> = HashSet::new();
        let mut retry_delays: HashMap<Uuid, u32> = HashMap::new();

        loop {
            if state.is_complete() {
                break;
            }

            let ready = self.select_ready(graph, &nodes_by_id, &state, &held_tags, &running);
            for node_id in ready {
                if semaphore.available_permits() == 0 {
                    break;
                }
                let node = nodes_by_id[&node_id];
                let scope = CircuitScope::node_type(node.params.node_type());
                if !self.circuits.check(scope.clone()).await.is_allowed() {
                    continue;
                }

                for tag in &node.resource_tags {
                    held_tags.insert(tag.clone());
                }
                running.insert(node_id);

                let node_state = state.nodes.entry(node_id).or_default();
                node_state.status = NodeStatus::Running;
                node_state.started_at = Some(Utc::now());
                node_state.attempts += 1;
                self.state_store.save(tenant, &state).await?;
                self.emit(
                    "node.started",
                    CorrelationIds {
                        run_id: Some(run_id.clone()),
                        auv_id: opts.auv_id.clone(),
                        ..Default::default()
                    },
                    serde_json::json!({ "node_id": node_id, "node_type": node.params.node_type() }),
                )
                .await;

                let executor = self
                    .executors
                    .get(node.params.node_type())
                    .cloned()
                    .ok_or_else(|| DomainError::UsageError(format!(
                        "no executor registered for node type {}",
                        node.params.node_type()
                    )))?;
                let timeout = node.effective_timeout(graph.default_timeout_ms);
                let tool_plan = self.plan_tools_for_node(&node.params, &opts.env);
                let ctx = ExecutorContext {
                    tenant: tenant.clone(),
                    run_id: run_id.clone(),
                    auv_id: opts.auv_id.clone(),
                    run_root: self.state_store.state_path(tenant, &run_id).parent().unwrap().to_path_buf(),
                    tool_plan,
                    env: opts.env.clone(),
                };
                let params = node.params.clone();
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let started_at = Utc::now();

                join_set.spawn(async move {
                    let _permit = permit;
                    let result = match tokio::time::timeout(timeout, executor.execute(&ctx, &params)).await {
                        Ok(inner) => inner,
                        Err(_) => Err(DomainError::JobTimeout(node_id.to_string())),
                    };
                    NodeOutcome {
                        node_id,
                        result,
                        started_at,
                    }
                });
            }

            if join_set.is_empty() {
                // Nothing running and nothing became ready: either done, or
                // the remaining nodes are unreachable because an ancestor
                // failed. Cascade-skip them and stop.
                self.cascade_unreachable(&mut state, &nodes_by_id, &run_id, &mut held_tags);
                self.state_store.save(tenant, &state).await?;
                break;
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            let outcome = joined.map_err(|e| DomainError::UsageError(format!("node task panicked: {e}")))?;
            running.remove(&outcome.node_id);
            let node = nodes_by_id[&outcome.node_id];
            for tag in &node.resource_tags {
                held_tags.remove(tag);
            }

            self.apply_outcome(
                tenant,
                &run_id,
                graph,
                node,
                outcome,
                &mut state,
                &dependents,
                &mut retry_delays,
            )
            .await?;
        }

        self.state_store.save(tenant, &state).await?;
        let duration_ms = u64::try_from(wall_clock_start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let success = state.failed.is_empty();
        self.emit(
            if success { "run.succeeded" } else { "run.failed" },
            CorrelationIds {
                run_id: Some(run_id.clone()),
                auv_id: opts.auv_id.clone(),
                ..Default::default()
            },
            serde_json::json!({ "duration_ms": duration_ms }),
        )
        .await;

        Ok(RunOutcome {
            run_id,
            success,
            completed: state.succeeded_ids().into_iter().collect(),
            failed: state.failed.iter().copied().collect(),
            duration_ms,
            state_path,
        })
    }

    async fn load_or_init_state(
        &self,
        tenant: &TenantId,
        graph: &GraphSpec,
        node_ids: &[Uuid],
        opts: &RunOptions,
    ) -> DomainResult<(String, RunState)> {
        if let Some(run_id) = &opts.run_id {
            let existing = self.state_store.load(tenant, run_id).await?;
            match existing {
                Some(mut state) => {
                    state.reset_running_to_ready();
                    Ok((run_id.clone(), state))
                }
                None if opts.resume => Err(DomainError::ResumeStateMissing(run_id.clone())),
                None => Ok((run_id.clone(), RunState::new(run_id.clone(), graph.project_id.clone(), node_ids))),
            }
        } else if opts.resume {
            Err(DomainError::UsageError(
                "resume requested but no run_id was provided".into(),
            ))
        } else {
            let run_id = new_run_id();
            Ok((run_id.clone(), RunState::new(run_id, graph.project_id.clone(), node_ids)))
        }
    }

    /// Route a subagent-gateway node's requested capabilities through the
    /// capability router; every other node type dispatches without a tool
    /// plan.
    fn plan_tools_for_node(&self, params: &NodeParams, node_env: &BTreeMap<String, String>) -> Option<crate::domain::models::decision::ToolPlan> {
        let NodeParams::SubagentGateway { agent_id, requested_capabilities } = params else {
            return None;
        };
        let mut env = RouterEnv::from_process();
        env.vars.extend(node_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(router::plan_tools(
            agent_id,
            requested_capabilities,
            None,
            false,
            &env,
            &self.registry,
            &self.policies,
            None,
        ))
    }

    /// Nodes whose predecessors have all succeeded, that are not already
    /// terminal or running, and whose resource tags are free.
    fn select_ready(
        &self,
        graph: &GraphSpec,
        nodes_by_id: &HashMap<Uuid, &NodeSpec>,
        state: &RunState,
        held_tags: &HashSet<String>,
        running: &HashSet<Uuid>,
    ) -> Vec<Uuid> {
        let mut ready: Vec<Uuid> = graph
            .nodes
            .iter()
            .filter(|node| {
                if running.contains(&node.id) {
                    return false;
                }
                let status = state.nodes.get(&node.id).map(|s| s.status).unwrap_or(NodeStatus::Pending);
                if status.is_terminal() || status == NodeStatus::Running {
                    return false;
                }
                let deps_satisfied = node.dependencies.iter().all(|dep| {
                    nodes_by_id
                        .get(dep)
                        .and_then(|_| state.nodes.get(dep))
                        .is_some_and(|s| s.status == NodeStatus::Succeeded)
                });
                let tags_free = node.resource_tags.iter().all(|t| !held_tags.contains(t));
                deps_satisfied && tags_free
            })
            .map(|n| n.id)
            .collect();
        ready.sort();
        ready
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_outcome(
        &self,
        tenant: &TenantId,
        run_id: &str,
        graph: &GraphSpec,
        node: &NodeSpec,
        outcome: NodeOutcome,
        state: &mut RunState,
        dependents: &HashMap<Uuid, Vec<Uuid>>,
        retry_delays: &mut HashMap<Uuid, u32>,
    ) -> DomainResult<()> {
        let node_state = state.nodes.entry(node.id).or_default();
        node_state.finished_at = Some(Utc::now());
        let scope = CircuitScope::node_type(node.params.node_type());

        match outcome.result {
            Ok(_artifacts) => {
                node_state.status = NodeStatus::Succeeded;
                node_state.last_error = None;
                state.completed.insert(node.id);
                retry_delays.remove(&node.id);
                self.circuits.record_success(scope).await;
                self.emit(
                    "node.succeeded",
                    CorrelationIds {
                        run_id: Some(run_id.to_string()),
                        ..Default::default()
                    },
                    serde_json::json!({ "node_id": node.id }),
                )
                .await;
            }
            Err(err) => {
                let class = err.failure_class();
                node_state.last_error = Some(err.to_string());
                self.circuits.record_failure(scope, err.to_string()).await;

                let max_retries = node.effective_max_retries(graph.default_max_retries);
                let can_retry = !matches!(class, FailureClass::Permanent | FailureClass::Cancelled)
                    && node_state.attempts <= max_retries;

                if can_retry {
                    node_state.status = NodeStatus::Ready;
                    node_state.started_at = None;
                    let attempt = retry_delays.entry(node.id).or_insert(0);
                    let delay = backoff_delay_ms(*attempt, class);
                    *attempt += 1;
                    self.emit(
                        "node.retrying",
                        CorrelationIds {
                            run_id: Some(run_id.to_string()),
                            ..Default::default()
                        },
                        serde_json::json!({ "node_id": node.id, "delay_ms": delay, "error": node_state.last_error }),
                    )
                    .await;
                    if delay > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    }
                } else {
                    node_state.status = NodeStatus::Failed;
                    state.failed.insert(node.id);
                    self.emit(
                        "node.failed",
                        CorrelationIds {
                            run_id: Some(run_id.to_string()),
                            ..Default::default()
                        },
                        serde_json::json!({ "node_id": node.id, "error": node_state.last_error }),
                    )
                    .await;
                    self.cancel_descendants(state, dependents, node.id);
                }
            }
        }
        self.state_store.save(tenant, state).await?;
        Ok(())
    }

    /// Mark every not-yet-terminal descendant of a failed node as
    /// `cancelled`.
    fn cancel_descendants(&self, state: &mut RunState, dependents: &HashMap<Uuid, Vec<Uuid>>, from: Uuid) {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            let Some(children) = dependents.get(&id) else { continue };
            for &child in children {
                if !seen.insert(child) {
                    continue;
                }
                let child_state = state.nodes.entry(child).or_default();
                if !child_state.status.is_terminal() {
                    child_state.status = NodeStatus::Cancelled;
                    child_state.finished_at = Some(Utc::now());
                    state.failed.insert(child);
                }
                stack.push(child);
            }
        }
    }

    /// After the scheduling loop runs dry with incomplete nodes remaining
    /// (no ready node, nothing running), those nodes are unreachable -
    /// typically because a predecessor permanently failed without being
    /// walked by `cancel_descendants` (e.g. the predecessor itself was
    /// cancelled rather than failed). Mark them `skipped`.
    fn cascade_unreachable(
        &self,
        state: &mut RunState,
        nodes_by_id: &HashMap<Uuid, &NodeSpec>,
        _run_id: &str,
        _held_tags: &mut HashSet<String>,
    ) {
        for id in nodes_by_id.keys() {
            let node_state = state.nodes.entry(*id).or_default();
            if !node_state.status.is_terminal() {
                node_state.status = NodeStatus::Skipped;
                node_state.finished_at = Some(Utc::now());
                warn!(node_id = %id, "node skipped: unreachable after ancestor failure");
            }
        }
    }

    async fn emit(&self, event: &str, correlation: CorrelationIds, payload: serde_json::Value) {
        let record = ObservabilityEvent::new(event, correlation, payload);
        if let Err(err) = self.events.emit(record).await {
            info!(error = %err, event, "failed to emit observability event");
        }
    }
}

fn backoff_delay_ms(attempt: u32, class: FailureClass) -> u64 {
    let initial = if class == FailureClass::Timeout { 200 } else { 500 };
    let max = if class == FailureClass::Timeout { 5_000 } else { 30_000 };
    let mut policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(std::time::Duration::from_millis(initial))
        .with_max_interval(std::time::Duration::from_millis(max))
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .build();
    for _ in 0..attempt {
        policy.next_backoff();
    }
    policy
        .next_backoff()
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(max))
        .unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::graph::NodeParams;
    use crate::graph::state_store::FsRunStateStore;
    use crate::observability::hooks::JsonlEventSink;
    use crate::tenant::store::FsTenantStore;
    use async_trait::async_trait;
    use std::collections::BTreeSet as BSet;

    struct AlwaysOk;
    #[async_trait]
    impl Executor for AlwaysOk {
        async fn execute(&self, _ctx: &ExecutorContext, params: &crate::domain::models::graph::NodeParams) -> DomainResult<ExecutorOutcome> {
            if let NodeParams::WorkSimulation { duration_ms } = params {
                tokio::time::sleep(std::time::Duration::from_millis(*duration_ms)).await;
            }
            Ok(ExecutorOutcome::default())
        }
    }

    struct AlwaysPermanentFail;
    #[async_trait]
    impl Executor for AlwaysPermanentFail {
        async fn execute(&self, _ctx: &ExecutorContext, _params: &crate::domain::models::graph::NodeParams) -> DomainResult<ExecutorOutcome> {
            Err(DomainError::ExecutorPermanent {
                node_id: Uuid::nil(),
                message: "boom".into(),
            })
        }
    }

    fn node(id: Uuid, deps: &[Uuid], duration_ms: u64) -> NodeSpec {
        NodeSpec {
            id,
            label: None,
            params: NodeParams::WorkSimulation { duration_ms },
            dependencies: deps.iter().copied().collect(),
            resource_tags: BSet::new(),
            timeout_ms: None,
            max_retries: None,
        }
    }

    async fn new_runner(dir: &std::path::Path) -> (GraphRunner, Arc<FsTenantStore>) {
        let tenants = Arc::new(FsTenantStore::new(dir.to_path_buf()));
        let state_store = Arc::new(FsRunStateStore::new(tenants.clone()));
        let events = Arc::new(JsonlEventSink::new(dir.join("observability/hooks.jsonl")));
        let circuits = Arc::new(CircuitBreakerRegistry::new(Default::default()));
        let mut registry: ExecutorRegistry = HashMap::new();
        registry.insert("work_simulation", Arc::new(AlwaysOk) as Arc<dyn Executor>);
        let tool_registry = Arc::new(ToolRegistry::default());
        let policies = Arc::new(PolicyBundle::empty());
        (
            GraphRunner::new(Arc::new(registry), state_store, events, circuits, tool_registry, policies),
            tenants,
        )
    }

    #[tokio::test]
    async fn empty_graph_succeeds_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _tenants) = new_runner(dir.path()).await;
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![],
        };
        let outcome = runner.run(&graph, &TenantId::default_tenant(), RunOptions::default()).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.completed.is_empty());
    }

    #[tokio::test]
    async fn linear_chain_runs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _tenants) = new_runner(dir.path()).await;
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 5000,
            default_max_retries: 0,
            nodes: vec![node(a, &[], 5), node(b, &[a], 5), node(c, &[b], 5)],
        };
        let outcome = runner
            .run(&graph, &TenantId::default_tenant(), RunOptions { concurrency: 2, ..Default::default() })
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.completed.len(), 3);
    }

    #[tokio::test]
    async fn failed_node_cancels_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let (mut runner, _tenants) = new_runner(dir.path()).await;
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        if let Some(registry) = Arc::get_mut(&mut runner.executors) {
            registry.insert("browser-test", Arc::new(AlwaysPermanentFail));
        }
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![
                NodeSpec {
                    id: a,
                    label: None,
                    params: NodeParams::BrowserTest { spec_path: "x".into() },
                    dependencies: BSet::new(),
                    resource_tags: BSet::new(),
                    timeout_ms: None,
                    max_retries: None,
                },
                node(b, &[a], 5),
            ],
        };
        let outcome = runner.run(&graph, &TenantId::default_tenant(), RunOptions::default()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.failed.contains(&a));
        assert!(outcome.failed.contains(&b));
    }

    #[tokio::test]
    async fn parallel_chains_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _tenants) = new_runner(dir.path()).await;
        let ids: Vec<Uuid> = (1..=6).map(Uuid::from_u128).collect();
        let nodes = vec![
            node(ids[0], &[], 400),
            node(ids[1], &[ids[0]], 400),
            node(ids[2], &[], 400),
            node(ids[3], &[ids[2]], 400),
            node(ids[4], &[], 400),
            node(ids[5], &[ids[4]], 400),
        ];
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 5000,
            default_max_retries: 0,
            nodes,
        };
        let start = std::time::Instant::now();
        let outcome = runner
            .run(&graph, &TenantId::default_tenant(), RunOptions { concurrency: 3, ..Default::default() })
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(outcome.success);
        assert!(elapsed.as_millis() < 1400, "expected parallel speedup, took {elapsed:?}");
    }

    /// Crash-resume: a run whose state file already records one node
    /// succeeded resumes without re-executing that node.
    #[tokio::test]
    async fn resume_skips_already_succeeded_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, tenants) = new_runner(dir.path()).await;
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 5000,
            default_max_retries: 0,
            nodes: vec![node(a, &[], 5), node(b, &[a], 5)],
        };

        let run_id = "RUN-crash-resume".to_string();
        let mut state = RunState::new(run_id.clone(), graph.project_id.clone(), &[a, b]);
        let node_a = state.nodes.get_mut(&a).unwrap();
        node_a.status = NodeStatus::Succeeded;
        node_a.finished_at = Some(Utc::now());
        let state_store = FsRunStateStore::new(tenants.clone());
        state_store.save(&TenantId::default_tenant(), &state).await.unwrap();

        let outcome = runner
            .run(
                &graph,
                &TenantId::default_tenant(),
                RunOptions {
                    run_id: Some(run_id.clone()),
                    resume: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.completed.len(), 2);
    }

    /// A subagent-gateway node's executor context carries a populated tool
    /// plan built from the runner's registry/policies.
    #[tokio::test]
    async fn subagent_gateway_node_receives_a_tool_plan() {
        struct CapturingExecutor {
            captured: std::sync::Mutex<Option<bool>>,
        }
        #[async_trait]
        impl Executor for CapturingExecutor {
            async fn execute(&self, ctx: &ExecutorContext, _params: &NodeParams) -> DomainResult<ExecutorOutcome> {
                *self.captured.lock().unwrap() = Some(ctx.tool_plan.is_some());
                Ok(ExecutorOutcome::default())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let tenants = Arc::new(FsTenantStore::new(dir.path().to_path_buf()));
        let state_store = Arc::new(FsRunStateStore::new(tenants.clone()));
        let events = Arc::new(JsonlEventSink::new(dir.path().join("observability/hooks.jsonl")));
        let circuits = Arc::new(CircuitBreakerRegistry::new(Default::default()));

        let mut tool_registry = ToolRegistry::default();
        tool_registry.tools.insert(
            "playwright".into(),
            crate::domain::models::tool::Tool {
                id: "playwright".into(),
                tier: crate::domain::models::tool::Tier::Primary,
                capabilities: BSet::from(["browser.automation".to_string()]),
                cost_model: crate::domain::models::tool::CostModel::FlatPerRun { usd: 0.0 },
                api_key_env: None,
                side_effects: BSet::new(),
            },
        );
        let mut policies = PolicyBundle::empty();
        policies.capability_map.insert("browser.automation".into(), vec!["playwright".into()]);

        let executor = Arc::new(CapturingExecutor { captured: std::sync::Mutex::new(None) });
        let mut registry: ExecutorRegistry = HashMap::new();
        registry.insert("subagent-gateway", executor.clone() as Arc<dyn Executor>);
        let runner = GraphRunner::new(Arc::new(registry), state_store, events, circuits, Arc::new(tool_registry), Arc::new(policies));

        let node_id = Uuid::from_u128(1);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![NodeSpec {
                id: node_id,
                label: None,
                params: NodeParams::SubagentGateway {
                    agent_id: "B7".into(),
                    requested_capabilities: vec!["browser.automation".into()],
                },
                dependencies: BSet::new(),
                resource_tags: BSet::new(),
                timeout_ms: None,
                max_retries: None,
            }],
        };
        let outcome = runner.run(&graph, &TenantId::default_tenant(), RunOptions::default()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(*executor.captured.lock().unwrap(), Some(true));
    }

    /// Resuming a run_id with no persisted state is rejected rather than
    /// silently starting a fresh run.
    #[tokio::test]
    async fn resume_without_existing_state_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _tenants) = new_runner(dir.path()).await;
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![node(Uuid::from_u128(1), &[], 5)],
        };
        let err = runner
            .run(
                &graph,
                &TenantId::default_tenant(),
                RunOptions {
                    run_id: Some("RUN-missing".into()),
                    resume: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ResumeStateMissing(id) if id == "RUN-missing"));
    }
}

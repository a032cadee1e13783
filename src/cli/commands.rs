//! Command handlers. Each builds the runtime it needs (tenant store, run
//! state store, event/ledger sinks, executor registry) from an
//! [`EngineConfig`] and dispatches to the relevant module, assembling
//! repositories/services inline rather than behind a DI container.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::resolve_identity;
use crate::config::EngineConfig;
use crate::cvf::{self, AuvManifest, CheckOptions, Domain};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::graph::GraphSpec;
use crate::domain::models::job::{Constraints, Job, JobPayload, JobStatus};
use crate::domain::models::policy::PolicyBundle;
use crate::domain::models::tenant::TenantId;
use crate::domain::models::tool::ToolRegistry;
use crate::domain::ports::{EventSink, JobRepository, LedgerSink, RunStateStore};
use crate::graph::{CircuitBreakerRegistry, FsRunStateStore, GraphRunner, RunOptions};
use crate::infrastructure::schema::{status_schema, validate_against_schema};
use crate::observability::{JsonlEventSink, JsonlLedgerSink};
use crate::queue::{QueueAdmin, QueueMetrics, SqliteJobRepository, Worker, WorkerConfig};
use crate::tenant::policy::TenantAuthorizer;
use crate::tenant::{archive_tenant, authorize_enqueue, BackupReport, BackupScope, FsTenantStore};

use super::exit_code;
use super::types::{BackupScopeArg, EngineCommands};

/// Everything a command needs, built once from [`EngineConfig`].
pub struct Runtime {
    pub config: EngineConfig,
    pub project_root: PathBuf,
    pub tenants: Arc<FsTenantStore>,
    pub state_store: Arc<dyn RunStateStore>,
    pub events: Arc<dyn EventSink>,
    pub ledger: Arc<dyn LedgerSink>,
    pub registry: Arc<ToolRegistry>,
    pub policies: Arc<PolicyBundle>,
}

impl Runtime {
    /// Builds the runtime, loading `registry.yaml`/`policies.yaml` from
    /// `project_root` and cross-validating them before any command runs.
    /// Orphan-tool warnings are logged, not fatal; a malformed file is.
    pub fn new(config: EngineConfig, project_root: PathBuf) -> DomainResult<Self> {
        let tenants = Arc::new(FsTenantStore::new(project_root.clone()));
        let state_store = Arc::new(FsRunStateStore::new(tenants.clone()));
        let events = Arc::new(JsonlEventSink::new(project_root.join("observability/hooks.jsonl")));
        let ledger = Arc::new(JsonlLedgerSink::new(project_root.join("observability/ledgers")));

        let (registry, policies, warnings) = crate::router::load(&project_root)?;
        for warning in &warnings {
            warn!(warning, "router policy bundle");
        }

        Ok(Self {
            config,
            project_root,
            tenants,
            state_store,
            events,
            ledger,
            registry: Arc::new(registry),
            policies: Arc::new(policies),
        })
    }

    fn tenant_id(&self, raw: Option<&str>) -> DomainResult<TenantId> {
        TenantId::parse(raw.unwrap_or(&self.config.tenant_id))
    }

    fn graph_runner(&self) -> GraphRunner {
        let executors = Arc::new(crate::executors::build_registry());
        let circuits = Arc::new(CircuitBreakerRegistry::new(Default::default()));
        GraphRunner::new(
            executors,
            self.state_store.clone(),
            self.events.clone(),
            circuits,
            self.registry.clone(),
            self.policies.clone(),
        )
    }
}

/// `run-graph <graph> [--run-id <id>] [--resume] [--concurrency N]`.
pub async fn run_graph(
    rt: &Runtime,
    graph_path: &str,
    run_id: Option<String>,
    resume: bool,
    concurrency: usize,
    tenant: Option<&str>,
    json: bool,
) -> i32 {
    let tenant_id = match rt.tenant_id(tenant) {
        Ok(t) => t,
        Err(e) => return report_error(&e),
    };
    let graph = match load_graph(graph_path) {
        Ok(g) => g,
        Err(e) => return report_error(&e),
    };

    if resume && run_id.is_none() {
        return report_error(&DomainError::UsageError("--resume requires --run-id".into()));
    }

    let runner = rt.graph_runner();
    let opts = RunOptions {
        concurrency,
        run_id,
        resume,
        auv_id: None,
        env: std::env::vars().collect(),
    };

    match runner.run(&graph, &tenant_id, opts).await {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "run_id": outcome.run_id,
                    "success": outcome.success,
                    "completed": outcome.completed,
                    "failed": outcome.failed,
                    "duration_ms": outcome.duration_ms,
                })).unwrap_or_default());
            } else {
                println!("run {} {}", outcome.run_id, if outcome.success { "succeeded" } else { "failed" });
            }
            if outcome.success {
                exit_code::SUCCESS
            } else {
                exit_code::GENERIC_FAILURE
            }
        }
        Err(e) => report_error(&e),
    }
}

/// `<AUV-ID>` shortcut: run a small built-in single-node graph, then gate
/// it through `check`.
pub async fn run_auv(rt: &Runtime, auv_id: &str, concurrency: usize, tenant: Option<&str>) -> i32 {
    let tenant_id = match rt.tenant_id(tenant) {
        Ok(t) => t,
        Err(e) => return report_error(&e),
    };
    let graph = GraphSpec {
        project_id: auv_id.to_string(),
        default_timeout_ms: 60_000,
        default_max_retries: 1,
        nodes: vec![],
    };
    let runner = rt.graph_runner();
    let opts = RunOptions {
        concurrency,
        run_id: None,
        resume: false,
        auv_id: Some(auv_id.to_string()),
        env: Default::default(),
    };
    if let Err(e) = runner.run(&graph, &tenant_id, opts).await {
        return report_error(&e);
    }

    let auv_root = rt.tenants.runs_root(&tenant_id).join(auv_id);
    let manifest = cvf::default_manifest();
    let check_opts = CheckOptions { strict: true, domains: None, perf_budget: Default::default() };
    match cvf::check(auv_id, &auv_root, &manifest, &check_opts) {
        Ok(result) if result.passed => exit_code::SUCCESS,
        Ok(result) => exit_code::for_check_details(&result.details),
        Err(e) => report_error(&e),
    }
}

/// `check <AUV-ID> [--strict] [--domains ...]` CVF evidence gate.
pub async fn check(rt: &Runtime, auv_id: &str, strict: bool, domains: &[String], tenant: Option<&str>, json: bool) -> i32 {
    let tenant_id = match rt.tenant_id(tenant) {
        Ok(t) => t,
        Err(e) => return report_error(&e),
    };
    let auv_root = rt.tenants.runs_root(&tenant_id).join(auv_id);
    let manifest = AuvManifest::load_overrides(&rt.project_root.join("cvf-manifest.yaml"))
        .map(|overrides| cvf::default_manifest().merged_with(overrides))
        .unwrap_or_else(|_| cvf::default_manifest());

    let parsed_domains = if domains.is_empty() {
        None
    } else {
        Some(domains.iter().filter_map(|d| parse_domain(d)).collect())
    };

    let opts = CheckOptions {
        strict,
        domains: parsed_domains,
        perf_budget: Default::default(),
    };

    match cvf::check(auv_id, &auv_root, &manifest, &opts) {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
            } else {
                println!("{} {}", auv_id, if result.passed { "PASSED" } else { "FAILED" });
                for detail in &result.details {
                    println!("  [{}] {} - {}", if detail.passed { "ok" } else { "FAIL" }, detail.check, detail.message);
                }
            }
            if result.passed {
                exit_code::SUCCESS
            } else {
                exit_code::for_check_details(&result.details)
            }
        }
        Err(e) => report_error(&e),
    }
}

fn parse_domain(s: &str) -> Option<Domain> {
    match s {
        "data" => Some(Domain::Data),
        "charts" => Some(Domain::Charts),
        "seo" => Some(Domain::Seo),
        "media" => Some(Domain::Media),
        "db" => Some(Domain::Db),
        _ => None,
    }
}

pub async fn engine(rt: &Runtime, cmd: EngineCommands, json: bool) -> i32 {
    let pool = match crate::queue::connect(&rt.config.database_url).await {
        Ok(pool) => pool,
        Err(e) => return report_error(&e),
    };
    if let Err(e) = crate::queue::migrate(&pool).await {
        return report_error(&e);
    }
    let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool.clone()));

    match cmd {
        EngineCommands::Start { tenant, concurrency, auth_token } => engine_start(rt, jobs, pool, tenant, concurrency, auth_token).await,
        EngineCommands::Enqueue { graph, tenant, priority, auth_token, budget_usd, required_capabilities } => {
            engine_enqueue(rt, jobs, graph, tenant, priority, auth_token, budget_usd, required_capabilities).await
        }
        EngineCommands::Status { job } => engine_status(jobs, job).await,
        EngineCommands::List { state } => engine_list(jobs, state, json).await,
        EngineCommands::Metrics => engine_metrics(jobs, json).await,
        EngineCommands::Monitor { interval_ms } => engine_monitor(jobs, interval_ms, json).await,
        EngineCommands::Pause { auth_token } => {
            if let Err(e) = authorize_admin(rt, auth_token.as_deref()) {
                return report_error(&e);
            }
            engine_admin_call(jobs, |admin| Box::pin(async move { admin.pause().await })).await
        }
        EngineCommands::Resume { auth_token } => {
            if let Err(e) = authorize_admin(rt, auth_token.as_deref()) {
                return report_error(&e);
            }
            engine_admin_call(jobs, |admin| Box::pin(async move { admin.resume().await })).await
        }
        EngineCommands::Cancel { job, auth_token } => {
            if let Err(e) = authorize_admin(rt, auth_token.as_deref()) {
                return report_error(&e);
            }
            engine_admin_call(jobs, move |admin| {
                let job = job.clone();
                Box::pin(async move { admin.cancel(&job).await })
            })
            .await
        }
        EngineCommands::EmitStatus { tenant } => engine_emit_status(rt, jobs, tenant).await,
        EngineCommands::Backup { scope, tenant } => engine_backup(rt, scope, tenant).await,
    }
}

/// `queue_admin` gate for pause/resume/cancel.
fn authorize_admin(rt: &Runtime, auth_token: Option<&str>) -> DomainResult<()> {
    let claims = resolve_identity(&rt.config.auth, auth_token)?;
    TenantAuthorizer::authorize_admin(&claims)
}

async fn engine_start(
    rt: &Runtime,
    jobs: Arc<dyn JobRepository>,
    pool: sqlx::SqlitePool,
    tenant: Option<String>,
    concurrency: usize,
    auth_token: Option<String>,
) -> i32 {
    let _ = tenant;
    if let Err(e) = authorize_admin(rt, auth_token.as_deref()) {
        return report_error(&e);
    }
    let worker_config = WorkerConfig {
        concurrency,
        ..WorkerConfig::default()
    };
    let worker = Worker::new(worker_config, jobs, pool);
    let (_tx, rx) = tokio::sync::watch::channel(false);
    info!("worker starting");
    match worker.run_forever(rx).await {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => report_error(&e),
    }
}

#[allow(clippy::too_many_arguments)]
async fn engine_enqueue(
    rt: &Runtime,
    jobs: Arc<dyn JobRepository>,
    graph_file: String,
    tenant: Option<String>,
    priority: i32,
    auth_token: Option<String>,
    budget_usd: Option<f64>,
    required_capabilities: Vec<String>,
) -> i32 {
    if !rt.project_root.join(&graph_file).exists() && !std::path::Path::new(&graph_file).exists() {
        return report_error(&DomainError::UsageError(format!("graph file not found: {graph_file}")));
    }

    let tenant_name = tenant.unwrap_or_else(|| rt.config.tenant_id.clone());
    if let Err(e) = TenantId::parse(tenant_name.clone()) {
        return report_error(&e);
    }

    let claims = match resolve_identity(&rt.config.auth, auth_token.as_deref()) {
        Ok(claims) => claims,
        Err(e) => return report_error(&e),
    };
    if let Err(e) = TenantAuthorizer::authorize_submission(&claims, &tenant_name) {
        return report_error(&e);
    }

    let constraints = if budget_usd.is_some() || !required_capabilities.is_empty() {
        Some(Constraints { budget_usd, required_capabilities })
    } else {
        None
    };

    let job_id = format!("graph.run-{tenant_name}-{}-{:06x}", chrono::Utc::now().timestamp_millis(), rand_suffix());
    let payload = JobPayload {
        job_type: "graph.run".into(),
        graph_file,
        tenant: tenant_name,
        run_id: None,
        priority,
        constraints,
        env: Default::default(),
        metadata: Default::default(),
    };

    if let Err(e) = authorize_enqueue(&payload, rt.policies.as_ref()) {
        return report_error(&e);
    }

    let job = Job {
        id: job_id,
        payload,
        status: JobStatus::Waiting,
        attempts: 0,
        max_attempts: rt.config.max_job_retries,
        stalled_count: 0,
        backoff_delay_ms: rt.config.backoff_delay_ms,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        lock_owner: None,
        lock_expires_at: None,
        last_error: None,
        logs: None,
    };

    match jobs.enqueue(job).await {
        Ok(job) => {
            println!("enqueued {}", job.id);
            exit_code::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn rand_suffix() -> u32 {
    // Deterministic-enough discriminator derived from the process's
    // monotonic clock rather than a random source, since job ids only
    // need to avoid same-millisecond collisions within one process.
    (std::time::Instant::now().elapsed().subsec_nanos()) & 0xFF_FFFF
}

async fn engine_status(jobs: Arc<dyn JobRepository>, job: Option<String>) -> i32 {
    let Some(job_id) = job else {
        return report_error(&DomainError::UsageError("--job is required for engine status".into()));
    };
    match jobs.get(&job_id).await {
        Ok(Some(job)) => {
            println!("{}", serde_json::to_string_pretty(&job).unwrap_or_default());
            exit_code::SUCCESS
        }
        Ok(None) => report_error(&DomainError::UsageError(format!("job not found: {job_id}"))),
        Err(e) => report_error(&e),
    }
}

async fn engine_list(jobs: Arc<dyn JobRepository>, state: Option<String>, json: bool) -> i32 {
    let status = state.and_then(|s| parse_job_status(&s));
    match jobs.list(status).await {
        Ok(jobs) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs).unwrap_or_default());
            } else {
                println!("{}", super::display::format_job_table(&jobs));
            }
            exit_code::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn parse_job_status(s: &str) -> Option<JobStatus> {
    match s {
        "waiting" => Some(JobStatus::Waiting),
        "active" => Some(JobStatus::Active),
        "completed" => Some(JobStatus::Completed),
        "failed" => Some(JobStatus::Failed),
        "cancelled" => Some(JobStatus::Cancelled),
        "paused" => Some(JobStatus::Paused),
        _ => None,
    }
}

async fn engine_metrics(jobs: Arc<dyn JobRepository>, json: bool) -> i32 {
    let admin = QueueAdmin::new(jobs);
    match admin.metrics().await {
        Ok(metrics) => {
            print_metrics(&metrics, json);
            exit_code::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn print_metrics(metrics: &QueueMetrics, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(metrics).unwrap_or_default());
    } else {
        println!("{}", super::display::format_metrics_table(metrics));
    }
}

async fn engine_monitor(jobs: Arc<dyn JobRepository>, interval_ms: u64, json: bool) -> i32 {
    let admin = QueueAdmin::new(jobs);
    let spinner = (!json).then(super::display::monitor_spinner);
    loop {
        match admin.metrics().await {
            Ok(metrics) => {
                if let Some(pb) = &spinner {
                    pb.set_message(format!(
                        "waiting={} active={} completed={} failed={}",
                        metrics.waiting, metrics.active, metrics.completed, metrics.failed
                    ));
                } else {
                    print_metrics(&metrics, json);
                }
            }
            Err(e) => return report_error(&e),
        }
        tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
    }
}

async fn engine_admin_call<F>(jobs: Arc<dyn JobRepository>, op: F) -> i32
where
    F: FnOnce(&QueueAdmin) -> std::pin::Pin<Box<dyn std::future::Future<Output = DomainResult<()>> + Send + '_>>,
{
    let admin = QueueAdmin::new(jobs);
    match op(&admin).await {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => report_error(&e),
    }
}

async fn engine_emit_status(rt: &Runtime, jobs: Arc<dyn JobRepository>, tenant: Option<String>) -> i32 {
    let tenant_id = match rt.tenant_id(tenant.as_deref()) {
        Ok(t) => t,
        Err(e) => return report_error(&e),
    };
    let admin = QueueAdmin::new(jobs);
    let metrics = match admin.metrics().await {
        Ok(m) => m,
        Err(e) => return report_error(&e),
    };

    let status = serde_json::json!({
        "tenant": tenant_id.as_str(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "queue": metrics,
    });

    if let Err(errors) = validate_against_schema(&status_schema(), &status) {
        return report_error(&DomainError::SchemaError {
            subject: "status.json".into(),
            detail: errors.join("; "),
        });
    }

    let dest = rt.tenants.runs_root(&tenant_id).join("../reports/status.json");
    if let Some(parent) = dest.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return report_error(&DomainError::from(e));
        }
    }
    match std::fs::write(&dest, serde_json::to_vec_pretty(&status).unwrap_or_default()) {
        Ok(()) => {
            println!("wrote {}", dest.display());
            exit_code::SUCCESS
        }
        Err(e) => report_error(&DomainError::from(e)),
    }
}

async fn engine_backup(rt: &Runtime, scope: BackupScopeArg, tenant: Option<String>) -> i32 {
    let tenant_id = match rt.tenant_id(tenant.as_deref()) {
        Ok(t) => t,
        Err(e) => return report_error(&e),
    };
    let dest_dir = rt.project_root.join("backups");
    let scope: BackupScope = scope.into();
    match archive_tenant(rt.tenants.as_ref(), &tenant_id, scope, &dest_dir) {
        Ok(report) => {
            print_backup_report(&report);
            exit_code::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn print_backup_report(report: &BackupReport) {
    println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
}

fn load_graph(path: &str) -> DomainResult<GraphSpec> {
    let bytes = std::fs::read(path)?;
    serde_yaml::from_slice(&bytes).map_err(|e| DomainError::SchemaError {
        subject: "graph file".into(),
        detail: e.to_string(),
    })
}

fn report_error(err: &DomainError) -> i32 {
    eprintln!("error: {err}");
    exit_code::for_domain_error(err)
}

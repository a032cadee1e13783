//! CLI argument definitions.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "swarmctl")]
#[command(about = "Swarm1 durable orchestration engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single AUV end-to-end (shortcut for a small built-in graph)
    Auv {
        auv_id: String,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Execute a graph spec
    RunGraph {
        graph: String,
        /// Reuse this run id instead of generating one.
        #[arg(long)]
        run_id: Option<String>,
        /// Resume `run_id` from its last recorded state instead of
        /// starting fresh (requires `--run-id`).
        #[arg(long)]
        resume: bool,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Evaluate the evidence gate for an AUV
    Check {
        auv_id: String,
        #[arg(long)]
        strict: bool,
        #[arg(long, value_delimiter = ',')]
        domains: Vec<String>,
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Queue/worker administration
    #[command(subcommand)]
    Engine(EngineCommands),
}

#[derive(Subcommand)]
pub enum EngineCommands {
    /// Start a queue worker
    Start {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long)]
        auth_token: Option<String>,
    },
    /// Submit a job
    Enqueue {
        graph: String,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        #[arg(long)]
        auth_token: Option<String>,
        #[arg(long)]
        budget_usd: Option<f64>,
        #[arg(long, value_delimiter = ',')]
        required_capabilities: Vec<String>,
    },
    /// Show one job's status
    Status {
        #[arg(long)]
        job: Option<String>,
    },
    /// List jobs, optionally filtered by state
    List {
        #[arg(long)]
        state: Option<String>,
    },
    /// Queue-wide counters
    Metrics,
    /// Continuously print queue metrics until interrupted
    Monitor {
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
    /// Pause the queue (no new claims)
    Pause {
        #[arg(long)]
        auth_token: Option<String>,
    },
    /// Resume a paused queue
    Resume {
        #[arg(long)]
        auth_token: Option<String>,
    },
    /// Cancel one job
    Cancel {
        #[arg(long)]
        job: String,
        #[arg(long)]
        auth_token: Option<String>,
    },
    /// Write a tenant-aware status JSON for dashboards
    EmitStatus {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Produce a tenant-scoped archive
    Backup {
        #[arg(value_enum, default_value_t = BackupScopeArg::Both)]
        scope: BackupScopeArg,
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum BackupScopeArg {
    Runs,
    Dist,
    Both,
}

impl From<BackupScopeArg> for crate::tenant::BackupScope {
    fn from(value: BackupScopeArg) -> Self {
        match value {
            BackupScopeArg::Runs => crate::tenant::BackupScope::Runs,
            BackupScopeArg::Dist => crate::tenant::BackupScope::Dist,
            BackupScopeArg::Both => crate::tenant::BackupScope::Both,
        }
    }
}

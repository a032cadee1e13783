//! `swarmctl`: CLI entry point for the durable orchestration engine.

use anyhow::{Context, Result};
use clap::Parser;

use swarm1_engine::cli::{commands, Cli, Commands, Runtime};
use swarm1_engine::config::ConfigLoader;
use swarm1_engine::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = LoggerImpl::init(&LogConfig::default()).context("failed to initialize logging")?;

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let project_root = std::env::current_dir().context("failed to resolve project root")?;
    let rt = Runtime::new(config, project_root).context("failed to initialize runtime")?;

    let code = dispatch(&rt, cli).await;
    std::process::exit(code);
}

async fn dispatch(rt: &Runtime, cli: Cli) -> i32 {
    let json = cli.json;
    match cli.command {
        Commands::Auv { auv_id, concurrency, tenant } => commands::run_auv(rt, &auv_id, concurrency, tenant.as_deref()).await,
        Commands::RunGraph { graph, run_id, resume, concurrency, tenant } => {
            commands::run_graph(rt, &graph, run_id, resume, concurrency, tenant.as_deref(), json).await
        }
        Commands::Check { auv_id, strict, domains, tenant } => {
            commands::check(rt, &auv_id, strict, &domains, tenant.as_deref(), json).await
        }
        Commands::Engine(engine_cmd) => commands::engine(rt, engine_cmd, json).await,
    }
}

//! Shared CLI test harness: spins up a scratch project directory with its
//! own registry/policies fixtures and database, then drives `swarmctl`
//! against it.

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;

/// Build an `assert_cmd::Command` pointing at the `swarmctl` binary, with
/// its working directory set to `dir` so config/db/observability paths
/// resolve relative to the scratch project.
pub fn swarmctl_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("swarmctl").expect("swarmctl binary");
    cmd.current_dir(dir);
    cmd
}

/// Write a minimal but well-formed registry/policies pair into `dir`, plus
/// the `.swarm1/` directory the sqlite pool expects to already exist.
pub fn write_fixtures(dir: &Path) {
    std::fs::create_dir_all(dir.join(".swarm1")).unwrap();

    std::fs::write(
        dir.join("registry.yaml"),
        r#"
tools:
  playwright:
    id: playwright
    tier: primary
    capabilities: [browser.automation, screenshot]
    cost_model:
      kind: flat_per_run
      usd: 0.0
    api_key_env: null
    side_effects: []
"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("policies.yaml"),
        r#"
capability_map:
  browser.automation: [playwright]
  screenshot: [playwright]

tier_defaults:
  prefer_tier: primary
  default_budget_usd: 1.0
  secondary_default_budget_usd: 0.25
  require_secondary_consent: true

agents: {}

tenants:
  default:
    budget_ceiling_usd: 5.0
    allowed_capabilities: [browser.automation, screenshot]
  beta-inc:
    budget_ceiling_usd: 5.0
    allowed_capabilities: [browser.automation]

safety:
  allow_production_mutations: false
  require_test_mode_for: []

secondary:
  budget_overrides: {}

on_missing_primary:
  strategy: reject_capability
"#,
    )
    .unwrap();
}

/// Write a single work-simulation node graph spec under `dir/<name>`.
pub fn write_work_simulation_graph(dir: &Path, name: &str, duration_ms: u64) {
    std::fs::write(
        dir.join(name),
        format!(
            r#"
project_id: "itest"
default_timeout_ms: 5000
default_max_retries: 0
nodes:
  - id: "00000000-0000-0000-0000-000000000001"
    params:
      type: work-simulation
      duration_ms: {duration_ms}
    dependencies: []
"#
        ),
    )
    .unwrap();
}

pub fn parse_json_line(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).unwrap_or_else(|e| panic!("expected JSON stdout, got {:?}: {e}", String::from_utf8_lossy(stdout)))
}

//! End-to-end CLI coverage for the scenarios that only show up once the
//! binary, config loader, and sqlite queue are wired together (unit tests
//! elsewhere already cover the router and graph runner in isolation).

mod common;

use predicates::prelude::*;

use common::{parse_json_line, swarmctl_cmd, write_fixtures, write_work_simulation_graph};

#[test]
fn enqueue_accepts_a_job_within_tenant_policy() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    write_work_simulation_graph(dir.path(), "graph.yaml", 5);

    swarmctl_cmd(dir.path())
        .args(["engine", "enqueue", "graph.yaml", "--tenant", "default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enqueued"));
}

/// Scenario: enqueue with a required capability outside the tenant's
/// allowed set is rejected before any job is recorded, exit code 405.
#[test]
fn enqueue_rejects_a_capability_outside_the_tenant_allowlist() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    write_work_simulation_graph(dir.path(), "graph.yaml", 5);

    swarmctl_cmd(dir.path())
        .args([
            "engine",
            "enqueue",
            "graph.yaml",
            "--tenant",
            "beta-inc",
            "--required-capabilities",
            "deploy.k8s",
        ])
        .assert()
        .failure()
        .code(405);

    swarmctl_cmd(dir.path())
        .args(["engine", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy.k8s").not());
}

#[test]
fn enqueue_rejects_a_budget_above_the_tenant_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    write_work_simulation_graph(dir.path(), "graph.yaml", 5);

    swarmctl_cmd(dir.path())
        .args(["engine", "enqueue", "graph.yaml", "--tenant", "default", "--budget-usd", "99.0"])
        .assert()
        .failure()
        .code(405);
}

#[test]
fn run_graph_executes_a_single_node_graph_and_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    write_work_simulation_graph(dir.path(), "graph.yaml", 5);

    let output = swarmctl_cmd(dir.path())
        .args(["--json", "run-graph", "graph.yaml", "--tenant", "default"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = parse_json_line(&output);
    assert_eq!(value["success"], true);
    assert_eq!(value["completed"].as_array().unwrap().len(), 1);
}

#[test]
fn run_graph_resume_without_prior_state_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    write_work_simulation_graph(dir.path(), "graph.yaml", 5);

    swarmctl_cmd(dir.path())
        .args(["run-graph", "graph.yaml", "--run-id", "RUN-missing", "--resume"])
        .assert()
        .failure()
        .code(406);
}

#[test]
fn engine_metrics_reports_zero_counters_on_a_fresh_queue() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    swarmctl_cmd(dir.path())
        .args(["engine", "metrics"])
        .assert()
        .success();
}

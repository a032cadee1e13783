//! Human-facing table/spinner formatting for the job list and metrics
//! commands. JSON output bypasses this module entirely.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::job::{Job, JobStatus};
use crate::queue::QueueMetrics;

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Completed => Color::Green,
        JobStatus::Active => Color::Cyan,
        JobStatus::Waiting => Color::Yellow,
        JobStatus::Failed => Color::Red,
        JobStatus::Cancelled => Color::DarkGrey,
        JobStatus::Paused => Color::Magenta,
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render a job list as a table: id, status (color-coded when the
/// terminal supports it), tenant, attempts.
pub fn format_job_table(jobs: &[Job]) -> String {
    let colors = supports_color();
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("STATUS").add_attribute(Attribute::Bold),
        Cell::new("TENANT").add_attribute(Attribute::Bold),
        Cell::new("ATTEMPTS").add_attribute(Attribute::Bold),
    ]);
    for job in jobs {
        let status_cell = if colors {
            Cell::new(format!("{:?}", job.status)).fg(status_color(job.status))
        } else {
            Cell::new(format!("{:?}", job.status))
        };
        table.add_row(vec![
            Cell::new(&job.id),
            status_cell,
            Cell::new(&job.payload.tenant),
            Cell::new(format!("{}/{}", job.attempts, job.max_attempts)),
        ]);
    }
    table.to_string()
}

/// Render queue-wide counters as a two-column table.
pub fn format_metrics_table(metrics: &QueueMetrics) -> String {
    let mut table = base_table();
    table.set_header(vec![Cell::new("STATE").add_attribute(Attribute::Bold), Cell::new("COUNT").add_attribute(Attribute::Bold)]);
    table.add_row(vec![Cell::new("waiting"), Cell::new(metrics.waiting)]);
    table.add_row(vec![Cell::new("active"), Cell::new(metrics.active)]);
    table.add_row(vec![Cell::new("completed"), Cell::new(metrics.completed)]);
    table.add_row(vec![Cell::new("failed"), Cell::new(metrics.failed)]);
    table.add_row(vec![Cell::new("cancelled"), Cell::new(metrics.cancelled)]);
    table.add_row(vec![Cell::new("paused"), Cell::new(metrics.paused)]);
    table.add_row(vec![
        Cell::new("queue"),
        Cell::new(if metrics.is_paused { "paused" } else { "running" }),
    ]);
    table.to_string()
}

/// A spinner for `engine monitor`'s polling loop, styled the way the
/// rest of the CLI's long-running operations are.
pub fn monitor_spinner() -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

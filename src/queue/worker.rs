//! The worker loop: claim-with-lock, periodic lock renewal, graph-run
//! invocation via an isolated child process, stalled-job recovery on
//! each poll tick.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::job::JobStatus;
use crate::domain::ports::JobRepository;

use super::repository::recover_stalled;

/// Bounded capture of a child process's interleaved stdout/stderr,
/// oldest lines dropped first.
#[derive(Debug, Default)]
struct LogRingBuffer {
    max_lines: usize,
    lines: VecDeque<String>,
}

impl LogRingBuffer {
    fn new(max_lines: usize) -> Self {
        Self { max_lines, lines: VecDeque::new() }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    fn tail(&self, last_n: usize) -> String {
        let start = self.lines.len().saturating_sub(last_n);
        self.lines.iter().skip(start).cloned().collect::<Vec<_>>().join("\n")
    }

    fn join(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: Duration,
    pub lock_duration_ms: u64,
    pub lock_renew_interval: Duration,
    pub max_stalls: u32,
    pub concurrency: usize,
    /// How many trailing log lines to keep from the child `run-graph`
    /// process's combined stdout/stderr.
    pub log_tail_lines: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            poll_interval: Duration::from_millis(500),
            lock_duration_ms: 30_000,
            lock_renew_interval: Duration::from_secs(10),
            max_stalls: 3,
            concurrency: 4,
            log_tail_lines: 200,
        }
    }
}

pub struct Worker {
    config: WorkerConfig,
    jobs: Arc<dyn JobRepository>,
    pool: sqlx::SqlitePool,
}

impl Worker {
    pub fn new(config: WorkerConfig, jobs: Arc<dyn JobRepository>, pool: sqlx::SqlitePool) -> Self {
        Self { config, jobs, pool }
    }

    /// Poll forever until `shutdown` resolves. Each tick recovers stalled
    /// jobs, then attempts to claim and run one job.
    pub async fn run_forever(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> DomainResult<()> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match recover_stalled(&self.pool, self.config.max_stalls).await {
                Ok(ids) if !ids.is_empty() => info!(count = ids.len(), "recovered stalled jobs"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "stalled-job recovery failed"),
            }

            match self.jobs.claim_next(&self.config.worker_id, self.config.lock_duration_ms).await {
                Ok(Some(job)) => {
                    let job_id = job.id.clone();
                    if let Err(e) = self.process(job).await {
                        error!(job_id, error = %e, "job processing failed");
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "claim_next failed");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn process(&self, job: crate::domain::models::job::Job) -> DomainResult<()> {
        let job_id = job.id.clone();
        let lock_owner = self.config.worker_id.clone();
        let lock_duration = self.config.lock_duration_ms;
        let renew_interval = self.config.lock_renew_interval;
        let jobs_for_renewal = self.jobs.clone();
        let job_id_for_renewal = job_id.clone();
        let renewal_handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(renew_interval).await;
                if jobs_for_renewal.renew_lock(&job_id_for_renewal, &lock_owner, lock_duration).await.is_err() {
                    break;
                }
            }
        });

        let (result, logs) = self.run_job(&job).await;
        renewal_handle.abort();

        if let Err(e) = self.jobs.set_logs(&job_id, &logs).await {
            warn!(job_id, error = %e, "failed to persist job logs");
        }

        match result {
            Ok(()) => {
                self.jobs.complete(&job_id).await?;
                info!(job_id, "job completed");
            }
            Err(e) => {
                let class = e.failure_class();
                let retry_at_ms = match class {
                    crate::domain::errors::FailureClass::Permanent | crate::domain::errors::FailureClass::Cancelled => None,
                    _ => Some(job.next_backoff_ms(60_000)),
                };
                self.jobs.fail(&job_id, &e.to_string(), retry_at_ms).await?;
                warn!(job_id, error = %e, "job failed");
            }
        }
        Ok(())
    }

    /// Runs one job's graph in an isolated child process (the binary
    /// re-invoked with its own `run-graph` subcommand), streaming the
    /// child's stdout/stderr into a bounded ring buffer. Returns the
    /// run's outcome alongside the captured log tail, which is persisted
    /// regardless of outcome.
    async fn run_job(&self, job: &crate::domain::models::job::Job) -> (DomainResult<()>, String) {
        let exe = match std::env::current_exe() {
            Ok(p) => p,
            Err(e) => return (Err(DomainError::from(e)), String::new()),
        };

        let run_id = job.payload.run_id.clone().unwrap_or_else(|| job.id.clone());
        let mut cmd = Command::new(exe);
        cmd.arg("run-graph")
            .arg(&job.payload.graph_file)
            .arg("--run-id")
            .arg(&run_id)
            .arg("--concurrency")
            .arg(self.config.concurrency.to_string())
            .arg("--tenant")
            .arg(&job.payload.tenant)
            .envs(&job.payload.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if job.attempts > 0 {
            cmd.arg("--resume");
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return (Err(DomainError::from(e)), String::new()),
        };

        let mut ring = LogRingBuffer::new(self.config.log_tail_lines);
        let mut stderr_tail = LogRingBuffer::new(32);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_lines = stdout.map(|s| BufReader::new(s).lines());
        let mut stderr_lines = stderr.map(|s| BufReader::new(s).lines());

        while stdout_lines.is_some() || stderr_lines.is_some() {
            tokio::select! {
                line = async { stdout_lines.as_mut().unwrap().next_line().await }, if stdout_lines.is_some() => {
                    match line {
                        Ok(Some(line)) => ring.push(line),
                        _ => stdout_lines = None,
                    }
                }
                line = async { stderr_lines.as_mut().unwrap().next_line().await }, if stderr_lines.is_some() => {
                    match line {
                        Ok(Some(line)) => {
                            ring.push(line.clone());
                            stderr_tail.push(line);
                        }
                        _ => stderr_lines = None,
                    }
                }
            }
        }

        let status = match child.wait().await {
            Ok(s) => s,
            Err(e) => return (Err(DomainError::from(e)), ring.join()),
        };

        let logs = ring.join();
        if status.success() {
            (Ok(()), logs)
        } else {
            let message = format!(
                "run-graph exited with {status}; stderr tail:\n{}",
                stderr_tail.tail(32)
            );
            (
                Err(DomainError::JobExecutionFailed { job_id: job.id.clone(), message }),
                logs,
            )
        }
    }
}

/// Admin surface over the queue: `engine pause/resume/cancel/clean`.
pub struct QueueAdmin {
    jobs: Arc<dyn JobRepository>,
}

impl QueueAdmin {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self { jobs }
    }

    pub async fn pause(&self) -> DomainResult<()> {
        self.jobs.pause_queue().await
    }

    pub async fn resume(&self) -> DomainResult<()> {
        self.jobs.resume_queue().await
    }

    pub async fn cancel(&self, job_id: &str) -> DomainResult<()> {
        self.jobs.cancel(job_id).await
    }

    pub async fn clean(&self, older_than_ms: u64, status: JobStatus) -> DomainResult<u64> {
        self.jobs.clean(older_than_ms, status).await
    }

    pub async fn metrics(&self) -> DomainResult<QueueMetrics> {
        let all = self.jobs.list(None).await?;
        let mut metrics = QueueMetrics::default();
        for job in &all {
            match job.status {
                JobStatus::Waiting => metrics.waiting += 1,
                JobStatus::Active => metrics.active += 1,
                JobStatus::Completed => metrics.completed += 1,
                JobStatus::Failed => metrics.failed += 1,
                JobStatus::Cancelled => metrics.cancelled += 1,
                JobStatus::Paused => metrics.paused += 1,
            }
        }
        metrics.is_paused = self.jobs.is_paused().await?;
        Ok(metrics)
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueMetrics {
    pub waiting: u32,
    pub active: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub paused: u32,
    pub is_paused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_once_over_capacity() {
        let mut ring = LogRingBuffer::new(3);
        for line in ["a", "b", "c", "d"] {
            ring.push(line.to_string());
        }
        assert_eq!(ring.join(), "b\nc\nd");
    }

    #[test]
    fn ring_buffer_tail_returns_last_n_lines() {
        let mut ring = LogRingBuffer::new(10);
        for line in ["a", "b", "c"] {
            ring.push(line.to_string());
        }
        assert_eq!(ring.tail(2), "b\nc");
        assert_eq!(ring.tail(100), "a\nb\nc");
    }

    #[test]
    fn empty_ring_buffer_joins_to_empty_string() {
        let ring = LogRingBuffer::new(5);
        assert_eq!(ring.join(), "");
        assert_eq!(ring.tail(3), "");
    }
}

//! SQLite-backed [`JobRepository`].
//!
//! Row-to-struct conversion uses explicit `row.get::<T, _>` calls rather
//! than `sqlx::FromRow` derive, since the payload column needs a JSON
//! decode step the derive can't express. Claim is a single atomic
//! `UPDATE ... WHERE id = (SELECT ...) RETURNING *` statement rather than a
//! separate SELECT-then-UPDATE, since SQLite serializes writers under WAL
//! anyway and this avoids a TOCTOU window between the two.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::job::{Job, JobPayload, JobStatus};
use crate::domain::ports::JobRepository;

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> DomainResult<Job> {
        let payload_json: String = row.get("payload");
        let payload: JobPayload = serde_json::from_str(&payload_json)?;
        let status: String = row.get("status");
        Ok(Job {
            id: row.get("id"),
            payload,
            status: parse_status(&status)?,
            attempts: row.get::<i64, _>("attempts") as u32,
            max_attempts: row.get::<i64, _>("max_attempts") as u32,
            stalled_count: row.get::<i64, _>("stalled_count") as u32,
            backoff_delay_ms: row.get::<i64, _>("backoff_delay_ms") as u64,
            created_at: parse_dt(row.get("created_at"))?,
            updated_at: parse_dt(row.get("updated_at"))?,
            lock_owner: row.get("lock_owner"),
            lock_expires_at: row
                .get::<Option<String>, _>("lock_expires_at")
                .map(|s| parse_dt(s))
                .transpose()?,
            last_error: row.get("last_error"),
            logs: row.get("logs"),
        })
    }
}

fn parse_status(s: &str) -> DomainResult<JobStatus> {
    match s {
        "waiting" => Ok(JobStatus::Waiting),
        "active" => Ok(JobStatus::Active),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        "paused" => Ok(JobStatus::Paused),
        other => Err(DomainError::DatabaseError(format!("unknown job status: {other}"))),
    }
}

fn status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Waiting => "waiting",
        JobStatus::Active => "active",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
        JobStatus::Paused => "paused",
    }
}

fn parse_dt(s: String) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::DatabaseError(format!("bad timestamp {s}: {e}")))
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn enqueue(&self, mut job: Job) -> DomainResult<Job> {
        let now = Utc::now();
        job.created_at = now;
        job.updated_at = now;
        let payload_json = serde_json::to_string(&job.payload)?;
        sqlx::query(
            "INSERT INTO jobs (id, tenant, job_type, payload, status, priority, attempts, max_attempts, \
             stalled_count, backoff_delay_ms, created_at, updated_at, run_at, lock_owner, lock_expires_at, last_error, logs) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.payload.tenant)
        .bind(&job.payload.job_type)
        .bind(&payload_json)
        .bind(status_str(job.status))
        .bind(job.payload.priority)
        .bind(job.attempts as i64)
        .bind(job.max_attempts as i64)
        .bind(job.stalled_count as i64)
        .bind(job.backoff_delay_ms as i64)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .bind(job.created_at.to_rfc3339())
        .bind(&job.lock_owner)
        .bind(job.lock_expires_at.map(|dt| dt.to_rfc3339()))
        .bind(&job.last_error)
        .bind(&job.logs)
        .execute(&self.pool)
        .await?;
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> DomainResult<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?").bind(job_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn list(&self, status: Option<JobStatus>) -> DomainResult<Vec<Job>> {
        let rows = match status {
            Some(s) => {
                sqlx::query("SELECT * FROM jobs WHERE status = ? ORDER BY created_at DESC")
                    .bind(status_str(s))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC").fetch_all(&self.pool).await?,
        };
        rows.iter().map(Self::row_to_job).collect()
    }

    async fn claim_next(&self, worker_id: &str, lock_duration_ms: u64) -> DomainResult<Option<Job>> {
        let paused: (i64,) = sqlx::query_as("SELECT paused FROM queue_state WHERE id = 1").fetch_one(&self.pool).await?;
        if paused.0 != 0 {
            return Ok(None);
        }

        let now = Utc::now();
        let lock_expires = now + chrono::Duration::milliseconds(lock_duration_ms as i64);
        let row = sqlx::query(
            "UPDATE jobs SET status = 'active', lock_owner = ?, lock_expires_at = ?, updated_at = ? \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE status = 'waiting' AND run_at <= ? \
                ORDER BY priority DESC, created_at ASC \
                LIMIT 1 \
             ) \
             RETURNING *",
        )
        .bind(worker_id)
        .bind(lock_expires.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn renew_lock(&self, job_id: &str, worker_id: &str, lock_duration_ms: u64) -> DomainResult<()> {
        let lock_expires = Utc::now() + chrono::Duration::milliseconds(lock_duration_ms as i64);
        let result = sqlx::query("UPDATE jobs SET lock_expires_at = ? WHERE id = ? AND lock_owner = ?")
            .bind(lock_expires.to_rfc3339())
            .bind(job_id)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::DatabaseError(format!("lock renewal failed: job {job_id} not owned by {worker_id}")));
        }
        Ok(())
    }

    async fn complete(&self, job_id: &str) -> DomainResult<()> {
        sqlx::query("UPDATE jobs SET status = 'completed', lock_owner = NULL, lock_expires_at = NULL, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str, retry_at_ms: Option<u64>) -> DomainResult<()> {
        let job = self.get(job_id).await?.ok_or_else(|| DomainError::DatabaseError(format!("job {job_id} not found")))?;
        let now = Utc::now();
        if let Some(delay_ms) = retry_at_ms.filter(|_| job.can_retry()) {
            let run_at = now + chrono::Duration::milliseconds(delay_ms as i64);
            sqlx::query(
                "UPDATE jobs SET status = 'waiting', attempts = attempts + 1, last_error = ?, \
                 lock_owner = NULL, lock_expires_at = NULL, run_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(error)
            .bind(run_at.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                "UPDATE jobs SET status = 'failed', attempts = attempts + 1, last_error = ?, \
                 lock_owner = NULL, lock_expires_at = NULL, updated_at = ? WHERE id = ?",
            )
            .bind(error)
            .bind(now.to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn cancel(&self, job_id: &str) -> DomainResult<()> {
        sqlx::query("UPDATE jobs SET status = 'cancelled', lock_owner = NULL, lock_expires_at = NULL, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_logs(&self, job_id: &str, logs: &str) -> DomainResult<()> {
        sqlx::query("UPDATE jobs SET logs = ? WHERE id = ?")
            .bind(logs)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pause_queue(&self) -> DomainResult<()> {
        sqlx::query("UPDATE queue_state SET paused = 1 WHERE id = 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn resume_queue(&self) -> DomainResult<()> {
        sqlx::query("UPDATE queue_state SET paused = 0 WHERE id = 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn is_paused(&self) -> DomainResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT paused FROM queue_state WHERE id = 1").fetch_one(&self.pool).await?;
        Ok(row.0 != 0)
    }

    async fn clean(&self, older_than_ms: u64, status: JobStatus) -> DomainResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::milliseconds(older_than_ms as i64);
        let result = sqlx::query("DELETE FROM jobs WHERE status = ? AND updated_at < ?")
            .bind(status_str(status))
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Requeue jobs whose lock expired without a terminal transition (spec
/// §4.3 "stalled jobs"). Returns the ids that were requeued or
/// permanently failed once `stalled_count` exceeds `max_stalls`.
pub async fn recover_stalled(pool: &SqlitePool, max_stalls: u32) -> DomainResult<Vec<String>> {
    let now = Utc::now().to_rfc3339();
    let stalled_rows = sqlx::query("SELECT id, stalled_count, max_attempts FROM jobs WHERE status = 'active' AND lock_expires_at < ?")
        .bind(&now)
        .fetch_all(pool)
        .await?;

    let mut recovered = Vec::new();
    for row in stalled_rows {
        let id: String = row.get("id");
        let stalled_count: i64 = row.get("stalled_count");
        if (stalled_count as u32) >= max_stalls {
            sqlx::query("UPDATE jobs SET status = 'failed', last_error = 'stalled too many times', updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(&id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query(
                "UPDATE jobs SET status = 'waiting', stalled_count = stalled_count + 1, \
                 lock_owner = NULL, lock_expires_at = NULL, run_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&now)
            .bind(&now)
            .bind(&id)
            .execute(pool)
            .await?;
        }
        recovered.push(id);
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::JobPayload;
    use std::collections::BTreeMap;

    async fn memory_pool() -> SqlitePool {
        let pool = crate::queue::connection::connect("sqlite::memory:").await.unwrap();
        crate::queue::connection::migrate(&pool).await.unwrap();
        pool
    }

    fn sample_job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            payload: JobPayload {
                job_type: "graph.run".into(),
                graph_file: "graph.yaml".into(),
                tenant: "acme".into(),
                run_id: None,
                priority: 0,
                constraints: None,
                env: BTreeMap::new(),
                metadata: BTreeMap::new(),
            },
            status: JobStatus::Waiting,
            attempts: 0,
            max_attempts: 3,
            stalled_count: 0,
            backoff_delay_ms: 1000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            lock_owner: None,
            lock_expires_at: None,
            last_error: None,
            logs: None,
        }
    }

    #[tokio::test]
    async fn enqueue_then_claim_round_trips() {
        let pool = memory_pool().await;
        let repo = SqliteJobRepository::new(pool);
        repo.enqueue(sample_job("job-1")).await.unwrap();

        let claimed = repo.claim_next("worker-a", 30_000).await.unwrap().unwrap();
        assert_eq!(claimed.id, "job-1");
        assert_eq!(claimed.status, JobStatus::Active);
        assert_eq!(claimed.lock_owner.as_deref(), Some("worker-a"));

        let second_claim = repo.claim_next("worker-b", 30_000).await.unwrap();
        assert!(second_claim.is_none());
    }

    #[tokio::test]
    async fn higher_priority_claims_first() {
        let pool = memory_pool().await;
        let repo = SqliteJobRepository::new(pool);
        let mut low = sample_job("job-low");
        low.payload.priority = 0;
        let mut high = sample_job("job-high");
        high.payload.priority = 10;
        repo.enqueue(low).await.unwrap();
        repo.enqueue(high).await.unwrap();

        let claimed = repo.claim_next("worker-a", 30_000).await.unwrap().unwrap();
        assert_eq!(claimed.id, "job-high");
    }

    #[tokio::test]
    async fn pause_blocks_claims() {
        let pool = memory_pool().await;
        let repo = SqliteJobRepository::new(pool);
        repo.enqueue(sample_job("job-1")).await.unwrap();
        repo.pause_queue().await.unwrap();
        assert!(repo.claim_next("worker-a", 30_000).await.unwrap().is_none());
        repo.resume_queue().await.unwrap();
        assert!(repo.claim_next("worker-a", 30_000).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fail_with_retry_reschedules_as_waiting() {
        let pool = memory_pool().await;
        let repo = SqliteJobRepository::new(pool);
        repo.enqueue(sample_job("job-1")).await.unwrap();
        repo.claim_next("worker-a", 30_000).await.unwrap();
        repo.fail("job-1", "transient failure", Some(0)).await.unwrap();

        let job = repo.get("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn fail_without_retry_marks_failed() {
        let pool = memory_pool().await;
        let repo = SqliteJobRepository::new(pool);
        let mut job = sample_job("job-1");
        job.max_attempts = 0;
        repo.enqueue(job).await.unwrap();
        repo.claim_next("worker-a", 30_000).await.unwrap();
        repo.fail("job-1", "permanent failure", None).await.unwrap();

        let job = repo.get("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }
}

//! PostgreSQL-backed job queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

use insight_core::defaults::{JOB_MAX_ATTEMPTS, JOB_STALE_AFTER_SECS};
use insight_core::{Error, Job, JobHandle, JobPayload, JobQueue, JobStatus, Result};

const JOB_COLUMNS: &str = "id, job_type, payload, status, attempts, max_attempts, error_message,
     created_at, started_at, completed_at";

/// [`JobQueue`] on the `job_queue` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so any number of workers in any
/// number of processes can share one queue. The notifier only wakes workers
/// in this process; others fall back to polling.
///
/// A job left `running` for longer than the stale window (its worker died
/// mid-execution) is claimed again as if it were pending, or marked failed
/// when it has no attempts left.
pub struct PgJobQueue {
    pool: Pool<Postgres>,
    queue: String,
    max_attempts: i32,
    stale_after: Duration,
    notify: Arc<Notify>,
}

impl PgJobQueue {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_queue(pool, "default")
    }

    /// Queue scoped to `queue`; jobs in other queues are never claimed.
    pub fn with_queue(pool: Pool<Postgres>, queue: impl Into<String>) -> Self {
        Self {
            pool,
            queue: queue.into(),
            max_attempts: JOB_MAX_ATTEMPTS,
            stale_after: Duration::from_secs(JOB_STALE_AFTER_SECS),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// How long a job may stay `running` before it is considered abandoned.
    /// Keep this above the worker's job timeout.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn stale_cutoff(&self) -> Result<DateTime<Utc>> {
        let window = chrono::Duration::from_std(self.stale_after)
            .map_err(|e| Error::Config(format!("Invalid stale window: {}", e)))?;
        Ok(Utc::now() - window)
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let payload: serde_json::Value = row.get("payload");
        let status: String = row.get("status");
        Ok(Job {
            id: row.get("id"),
            job_type: row.get("job_type"),
            payload: serde_json::from_value::<JobPayload>(payload)?,
            status: status.parse()?,
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job_type: &str, payload: JobPayload) -> Result<JobHandle> {
        let job = Job::new(job_type, payload, self.max_attempts);

        sqlx::query(
            "INSERT INTO job_queue (id, queue, job_type, payload, status, attempts, max_attempts, created_at)
             VALUES ($1, $2, $3, $4, 'pending', 0, $5, $6)",
        )
        .bind(job.id)
        .bind(&self.queue)
        .bind(&job.job_type)
        .bind(serde_json::to_value(&job.payload)?)
        .bind(job.max_attempts)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "queue",
            component = "postgres",
            op = "enqueue",
            job_id = %job.id,
            job_type = %job.job_type,
            "Job queued"
        );
        self.notify.notify_one();
        Ok(job.handle())
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let cutoff = self.stale_cutoff()?;

        let abandoned = sqlx::query(
            "UPDATE job_queue
             SET status = 'failed', completed_at = $1,
                 error_message = 'Job abandoned while running on its final attempt'
             WHERE queue = $2 AND status = 'running' AND started_at < $3
               AND attempts >= max_attempts",
        )
        .bind(Utc::now())
        .bind(&self.queue)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if abandoned.rows_affected() > 0 {
            warn!(
                subsystem = "queue",
                component = "postgres",
                count = abandoned.rows_affected(),
                "Failed abandoned jobs with no attempts left"
            );
        }

        let row = sqlx::query(&format!(
            "UPDATE job_queue
             SET status = 'running', attempts = attempts + 1, started_at = $1
             WHERE id = (
                 SELECT id FROM job_queue
                 WHERE queue = $2
                   AND (status = 'pending' OR (status = 'running' AND started_at < $3))
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(Utc::now())
        .bind(&self.queue)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE job_queue SET status = 'completed', completed_at = $1 WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Job {}", job_id)));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, retryable: bool) -> Result<JobStatus> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let counts: Option<(i32, i32)> = sqlx::query_as(
            "SELECT attempts, max_attempts FROM job_queue WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let (attempts, max_attempts) =
            counts.ok_or_else(|| Error::NotFound(format!("Job {}", job_id)))?;

        let status = if retryable && attempts < max_attempts {
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'pending', error_message = $1, started_at = NULL
                 WHERE id = $2",
            )
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            JobStatus::Pending
        } else {
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'failed', error_message = $1, completed_at = $2
                 WHERE id = $3",
            )
            .bind(error)
            .bind(Utc::now())
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            JobStatus::Failed
        };

        tx.commit().await.map_err(Error::Database)?;

        if status == JobStatus::Pending {
            self.notify.notify_one();
        }
        Ok(status)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {} FROM job_queue WHERE id = $1", JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_queue WHERE queue = $1 AND status = 'pending'",
        )
        .bind(&self.queue)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

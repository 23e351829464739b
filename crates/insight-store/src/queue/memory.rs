//! Process-local job queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

use insight_core::defaults::{JOB_MAX_ATTEMPTS, JOB_RETAINED_FINISHED};
use insight_core::{Error, Job, JobHandle, JobPayload, JobQueue, JobStatus, Result};

#[derive(Default)]
struct QueueState {
    jobs: HashMap<Uuid, Job>,
    pending: VecDeque<Uuid>,
    /// Completed or failed jobs, oldest first.
    finished: VecDeque<Uuid>,
}

impl QueueState {
    /// Record a terminal job, dropping the oldest finished records past `retain`.
    fn finish(&mut self, job_id: Uuid, retain: usize) {
        self.finished.push_back(job_id);
        while self.finished.len() > retain {
            if let Some(old) = self.finished.pop_front() {
                self.jobs.remove(&old);
            }
        }
    }
}

/// In-memory [`JobQueue`]. Jobs are lost on restart.
///
/// Only the most recent finished jobs are kept for [`JobQueue::get`]; older
/// ones are forgotten so payloads do not accumulate.
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
    notify: Arc<Notify>,
    max_attempts: i32,
    retain_finished: usize,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::with_max_attempts(JOB_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: i32) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Arc::new(Notify::new()),
            max_attempts,
            retain_finished: JOB_RETAINED_FINISHED,
        }
    }

    /// Number of finished jobs kept before the oldest are dropped.
    pub fn with_retained_finished(mut self, retain: usize) -> Self {
        self.retain_finished = retain;
        self
    }

    /// Pending, running and retained finished jobs, oldest first.
    pub async fn jobs(&self) -> Vec<Job> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job_type: &str, payload: JobPayload) -> Result<JobHandle> {
        let job = Job::new(job_type, payload, self.max_attempts);
        let handle = job.handle();
        {
            let mut state = self.state.lock().await;
            state.pending.push_back(job.id);
            state.jobs.insert(job.id, job);
        }
        debug!(
            subsystem = "queue",
            component = "memory",
            op = "enqueue",
            job_id = %handle.id,
            job_type = %handle.job_type,
            "Job queued"
        );
        self.notify.notify_one();
        Ok(handle)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let mut state = self.state.lock().await;
        let Some(id) = state.pending.pop_front() else {
            return Ok(None);
        };
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| Error::Internal(format!("Pending job {} has no record", id)))?;
        job.status = JobStatus::Running;
        job.attempts += 1;
        job.started_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::NotFound(format!("Job {}", job_id)))?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        state.finish(job_id, self.retain_finished);
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, retryable: bool) -> Result<JobStatus> {
        let status = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let job = state
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| Error::NotFound(format!("Job {}", job_id)))?;
            job.error_message = Some(error.to_string());

            if retryable && job.has_attempts_remaining() {
                job.status = JobStatus::Pending;
                job.started_at = None;
                state.pending.push_back(job_id);
                JobStatus::Pending
            } else {
                job.status = JobStatus::Failed;
                job.completed_at = Some(Utc::now());
                state.finish(job_id, self.retain_finished);
                JobStatus::Failed
            }
        };

        if status == JobStatus::Pending {
            self.notify.notify_one();
        }
        Ok(status)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn pending_count(&self) -> Result<i64> {
        Ok(self.state.lock().await.pending.len() as i64)
    }

    fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

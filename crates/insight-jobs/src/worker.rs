//! Job worker that drains the queue through registered handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use insight_core::defaults::{
    EVENT_BUS_CAPACITY, JOB_MAX_CONCURRENT, JOB_POLL_INTERVAL_MS, JOB_TIMEOUT_SECS,
};
use insight_core::{Job, JobQueue, JobStatus, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Per-job execution limit in seconds. Exceeding it is a retryable failure.
    pub job_timeout_secs: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: JOB_MAX_CONCURRENT,
            job_timeout_secs: JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `1000` | Polling interval when queue is empty |
    /// | `JOB_TIMEOUT_SECS` | `300` | Per-job execution limit |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_POLL_INTERVAL_MS);

        let job_timeout_secs = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_TIMEOUT_SECS)
            .max(1);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            job_timeout_secs,
            enabled,
        }
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs.max(1);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A job was claimed and handed to its handler.
    JobStarted { job_id: Uuid, job_type: String },
    /// Job progress was updated.
    JobProgress {
        job_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    /// A job completed and its result was stored.
    JobCompleted { job_id: Uuid, job_type: String },
    /// A job was completed without doing anything (e.g. unknown tag).
    JobIgnored {
        job_id: Uuid,
        job_type: String,
        reason: String,
    },
    /// A job failed transiently and was put back on the queue.
    JobRetrying {
        job_id: Uuid,
        job_type: String,
        error: String,
    },
    /// A job failed for good.
    JobFailed {
        job_id: Uuid,
        job_type: String,
        error: String,
    },
    WorkerStarted,
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop claiming jobs. In-flight jobs still finish.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Job worker already stopped");
        }
        Ok(())
    }

    /// Signal shutdown and wait for the worker loop to exit.
    pub async fn shutdown_and_wait(self) -> Result<()> {
        self.shutdown().await?;
        self.task
            .await
            .map_err(|e| insight_core::Error::Internal(format!("Job worker task failed: {}", e)))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

type HandlerMap = Arc<RwLock<HashMap<String, Arc<dyn JobHandler>>>>;

/// Job worker that processes jobs from a [`JobQueue`].
pub struct JobWorker {
    queue: Arc<dyn JobQueue>,
    config: WorkerConfig,
    handlers: HandlerMap,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn new(queue: Arc<dyn JobQueue>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            queue,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register a handler for every tag it declares.
    pub async fn register_handler(&self, handler: Arc<dyn JobHandler>) {
        let mut handlers = self.handlers.write().await;
        for job_type in handler.job_types() {
            handlers.insert(job_type.to_string(), handler.clone());
            debug!(job_type, "Registered job handler");
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
            task,
        }
    }

    /// Keep up to `max_concurrent_jobs` running, claiming a new job as soon as
    /// a slot frees up. Waits on the queue notifier or the poll interval only
    /// while a slot is free and the queue is empty.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            job_timeout_secs = self.config.job_timeout_secs,
            "Job worker started"
        );

        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let max_concurrent = self.config.max_concurrent_jobs;
        let notify = self.queue.job_notify();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < max_concurrent {
                let Some(job) = self.claim_job().await else {
                    break;
                };
                let worker = self.clone_refs();
                tasks.spawn(worker.execute_job(job));
            }

            let has_free_slot = tasks.len() < max_concurrent;
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Job worker received shutdown signal");
                    break;
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_exit(result);
                }
                _ = notify.notified(), if has_free_slot => {}
                _ = sleep(poll_interval), if has_free_slot => {}
            }
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Waiting for in-flight jobs");
        }
        while let Some(result) = tasks.join_next().await {
            log_task_exit(result);
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    async fn claim_job(&self) -> Option<Job> {
        match self.queue.claim_next().await {
            Ok(job) => job,
            Err(e) => {
                error!(error = ?e, "Failed to claim job");
                None
            }
        }
    }

    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            queue: self.queue.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
            job_timeout: Duration::from_secs(self.config.job_timeout_secs),
        }
    }

    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn pending_count(&self) -> Result<i64> {
        self.queue.pending_count().await
    }
}

/// Handler panics are caught inside the job task, so an error here means the
/// queue bookkeeping itself panicked.
fn log_task_exit(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = ?e, "Job task panicked");
    }
}

/// Clone bundle for executing a single job in a spawned task.
struct JobWorkerRef {
    queue: Arc<dyn JobQueue>,
    handlers: HandlerMap,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_timeout: Duration,
}

impl JobWorkerRef {
    async fn execute_job(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type.clone();
        let attempt = job.attempts;

        info!(%job_id, job_type = %job_type, attempt, "Processing job");

        let _ = self.event_tx.send(WorkerEvent::JobStarted {
            job_id,
            job_type: job_type.clone(),
        });

        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&job_type).cloned()
        };

        let result = match handler {
            Some(handler) => {
                let event_tx = self.event_tx.clone();
                let ctx = JobContext::new(job).with_progress_callback(move |percent, message| {
                    let _ = event_tx.send(WorkerEvent::JobProgress {
                        job_id,
                        percent,
                        message: message.map(String::from),
                    });
                });

                let mut task = tokio::spawn(async move { handler.execute(ctx).await });
                match tokio::time::timeout(self.job_timeout, &mut task).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        error!(%job_id, job_type = %job_type, error = %e, "Job handler panicked");
                        JobResult::Retry(format!("Job handler panicked: {}", e))
                    }
                    Err(_) => {
                        task.abort();
                        warn!(
                            %job_id,
                            job_type = %job_type,
                            "Job exceeded timeout of {}s",
                            self.job_timeout.as_secs()
                        );
                        JobResult::Retry(format!(
                            "Job exceeded timeout of {}s",
                            self.job_timeout.as_secs()
                        ))
                    }
                }
            }
            None => JobResult::Ignored(format!("No handler for job type: {}", job_type)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            JobResult::Success(_) => {
                if let Err(e) = self.queue.complete(job_id).await {
                    error!(error = ?e, %job_id, "Failed to mark job as completed");
                } else {
                    info!(%job_id, job_type = %job_type, duration_ms, "Job completed successfully");
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCompleted { job_id, job_type });
                }
            }
            JobResult::Ignored(reason) => {
                if let Err(e) = self.queue.complete(job_id).await {
                    error!(error = ?e, %job_id, "Failed to mark ignored job as completed");
                } else {
                    debug!(%job_id, job_type = %job_type, %reason, "Job ignored");
                    let _ = self.event_tx.send(WorkerEvent::JobIgnored {
                        job_id,
                        job_type,
                        reason,
                    });
                }
            }
            JobResult::Retry(error) => self.record_failure(job_id, job_type, error, true, duration_ms).await,
            JobResult::Failed(error) => self.record_failure(job_id, job_type, error, false, duration_ms).await,
        }
    }

    async fn record_failure(
        &self,
        job_id: Uuid,
        job_type: String,
        error: String,
        retryable: bool,
        duration_ms: u64,
    ) {
        match self.queue.fail(job_id, &error, retryable).await {
            Err(e) => error!(error = ?e, %job_id, "Failed to record job failure"),
            Ok(JobStatus::Pending) => {
                warn!(%job_id, job_type = %job_type, %error, duration_ms, "Job failed, will retry");
                let _ = self.event_tx.send(WorkerEvent::JobRetrying {
                    job_id,
                    job_type,
                    error,
                });
            }
            Ok(_) => {
                warn!(%job_id, job_type = %job_type, %error, duration_ms, "Job failed");
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error,
                });
            }
        }
    }
}

/// Builder for creating a job worker with handlers.
pub struct WorkerBuilder {
    queue: Arc<dyn JobQueue>,
    config: WorkerConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            queue,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub async fn build(self) -> JobWorker {
        let worker = JobWorker::new(self.queue, self.config);
        for handler in self.handlers {
            worker.register_handler(handler).await;
        }
        worker
    }
}

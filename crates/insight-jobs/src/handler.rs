//! Job handler contract.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use insight_core::{Job, JobPayload};

/// Progress callback type for job handlers.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
    progress_callback: Option<ProgressCallback>,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, percent: i32, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }

    pub fn job_type(&self) -> &str {
        &self.job.job_type
    }

    pub fn payload(&self) -> &JobPayload {
        &self.job.payload
    }
}

/// Result of job execution.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    /// Job completed with optional result data.
    Success(Option<JsonValue>),
    /// Job was accepted but had nothing to do. Completed without a write.
    Ignored(String),
    /// Job failed permanently.
    Failed(String),
    /// Job failed transiently and should be delivered again.
    Retry(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Job tags this handler processes.
    fn job_types(&self) -> Vec<&'static str>;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;

    fn can_handle(&self, job_type: &str) -> bool {
        self.job_types().iter().any(|t| *t == job_type)
    }
}

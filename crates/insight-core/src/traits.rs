//! Core traits for the insight pipeline.
//!
//! These are the seams between the producer, the queue, the consumer and
//! their external dependencies. Each has an in-process implementation used
//! by tests and single-node deployments, and a networked one.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::models::*;

// =============================================================================
// KEY-VALUE STORE
// =============================================================================

/// Generic persisted key-value store holding JSON values.
///
/// Offers no transactions or compare-and-set: callers that need to update
/// part of a value must read, modify and write it back themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `None` if the key was never written or was deleted.
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: JsonValue) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Durable work queue with at-least-once delivery.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue a job. Returns without waiting for it to run.
    async fn enqueue(&self, job_type: &str, payload: JobPayload) -> Result<JobHandle>;

    /// Claim the next pending job, marking it running and counting the attempt.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a claimed job as completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Record a failure. A retryable failure with attempts remaining puts the
    /// job back to pending; otherwise it is marked failed. Returns the
    /// resulting status.
    async fn fail(&self, job_id: Uuid, error: &str, retryable: bool) -> Result<JobStatus>;

    /// Get a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Number of jobs waiting to be claimed.
    async fn pending_count(&self) -> Result<i64>;

    /// Notifier signalled whenever a job becomes pending.
    fn job_notify(&self) -> Arc<Notify>;
}

// =============================================================================
// LLM GATEWAY
// =============================================================================

/// Chat-completion endpoint.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send `prompt` as a single user message and return the first choice.
    ///
    /// `api_key` is forwarded as-is; a missing key is left for the endpoint
    /// to reject.
    async fn chat(
        &self,
        api_key: Option<&str>,
        prompt: &str,
    ) -> std::result::Result<String, GatewayError>;

    /// Model name sent with each request.
    fn model_name(&self) -> &str;
}

// =============================================================================
// ISSUE SOURCE
// =============================================================================

/// Issue tracker the prompt context is built from.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// All issues of a project.
    async fn project_issues(&self, project: &str) -> Result<Vec<RawIssue>>;

    /// All users visible to the integration, unfiltered.
    async fn users(&self) -> Result<Vec<RawUser>>;
}

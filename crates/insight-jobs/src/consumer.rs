//! Job consumer: turns a delivered job into a stored insight.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use insight_core::{resolve_job_tag, JobTarget, LlmGateway, JOB_CATALOG};
use insight_store::Storage;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler for every `callOpenAI-*` tag.
///
/// Gateway failures that carry a response (an HTTP error body, or an empty
/// choice list) are persisted as the insight text. Failures without one are
/// reported as [`JobResult::Retry`] and never touch storage.
pub struct InsightJobHandler {
    storage: Storage,
    gateway: Arc<dyn LlmGateway>,
}

impl InsightJobHandler {
    pub fn new(storage: Storage, gateway: Arc<dyn LlmGateway>) -> Self {
        Self { storage, gateway }
    }
}

#[async_trait]
impl JobHandler for InsightJobHandler {
    fn job_types(&self) -> Vec<&'static str> {
        JOB_CATALOG.iter().map(|(tag, _)| *tag).collect()
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let start = Instant::now();
        let tag = ctx.job_type().to_string();

        let Some(target) = resolve_job_tag(&tag) else {
            debug!(
                subsystem = "jobs",
                component = "consumer",
                job_id = %ctx.job.id,
                job_type = %tag,
                "Unknown job tag, dropping"
            );
            return JobResult::Ignored(format!("Unknown job tag: {}", tag));
        };

        // The key is passed through unchecked; the endpoint decides.
        let settings = match self.storage.settings.get().await {
            Ok(settings) => settings,
            Err(e) => return JobResult::Retry(format!("Failed to read settings: {}", e)),
        };

        let prompt = &ctx.payload().prompt;
        ctx.report_progress(10, Some("Calling gateway"));

        let text = match self.gateway.chat(settings.api_key(), prompt).await {
            Ok(text) => text,
            Err(err) => {
                let reason = err.to_string();
                match err.into_stored_text() {
                    Some(text) => {
                        warn!(
                            subsystem = "jobs",
                            component = "consumer",
                            job_id = %ctx.job.id,
                            job_type = %tag,
                            error = %reason,
                            "Gateway returned an error, storing response text"
                        );
                        text
                    }
                    None => return JobResult::Retry(reason),
                }
            }
        };

        ctx.report_progress(80, Some("Storing result"));
        let response_len = text.len();

        let stored = match target {
            JobTarget::Insight(insight) => self.storage.insights.upsert(insight, text).await,
            JobTarget::AskResponse => self.storage.ask.set(text).await,
        };
        if let Err(e) = stored {
            return JobResult::Retry(format!("Failed to store result: {}", e));
        }

        ctx.report_progress(100, None);
        info!(
            subsystem = "jobs",
            component = "consumer",
            job_id = %ctx.job.id,
            job_type = %tag,
            model = self.gateway.model_name(),
            prompt_len = prompt.len(),
            response_len,
            duration_ms = start.elapsed().as_millis() as u64,
            "Insight stored"
        );

        JobResult::Success(Some(json!({ "response_len": response_len })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::defaults::NO_CHOICES_MESSAGE;
    use insight_core::{AppSettings, GatewayError, InsightType, Job, JobPayload, KeyValueStore};
    use insight_inference::mock::MockGateway;

    fn ctx(tag: &str, prompt: &str) -> JobContext {
        JobContext::new(Job::new(tag, JobPayload::new(prompt), 3))
    }

    fn handler(gateway: MockGateway) -> (InsightJobHandler, Storage) {
        let storage = Storage::memory();
        (
            InsightJobHandler::new(storage.clone(), Arc::new(gateway)),
            storage,
        )
    }

    #[test]
    fn test_handles_every_catalog_tag() {
        let (handler, _) = handler(MockGateway::new());
        assert_eq!(handler.job_types().len(), 19);
        assert!(handler.can_handle("callOpenAI-AskGPT"));
        assert!(handler.can_handle("callOpenAI-ReviewTeamPerformanceLags"));
        assert!(!handler.can_handle("callOpenAI-ReviewLaggards"));
    }

    #[tokio::test]
    async fn test_success_stores_first_choice() {
        let (handler, storage) = handler(MockGateway::new().with_default_response("Ana leads"));
        let result = handler.execute(ctx("callOpenAI-SprintLeads", "p")).await;

        assert!(matches!(result, JobResult::Success(_)));
        let dataset = storage.insights.get().await.unwrap();
        assert_eq!(dataset.get(InsightType::SprintLeads), "Ana leads");
        assert_eq!(dataset.generated_count(), 1);
    }

    #[tokio::test]
    async fn test_api_key_comes_from_settings() {
        let gateway = MockGateway::new();
        let (handler, storage) = handler(gateway.clone());
        storage
            .settings
            .save(&AppSettings {
                api_key: Some("sk-team".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        handler.execute(ctx("callOpenAI-DailySummary", "summarize")).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key.as_deref(), Some("sk-team"));
        assert_eq!(calls[0].prompt, "summarize");
    }

    #[tokio::test]
    async fn test_missing_key_still_calls_gateway() {
        let gateway = MockGateway::new().with_default_error(GatewayError::Status {
            status: 401,
            body: "missing key".to_string(),
        });
        let (handler, storage) = handler(gateway.clone());

        let result = handler.execute(ctx("callOpenAI-DailyBottlenecks", "p")).await;

        assert!(matches!(result, JobResult::Success(_)));
        assert_eq!(gateway.calls()[0].api_key, None);
        let dataset = storage.insights.get().await.unwrap();
        assert_eq!(dataset.get(InsightType::DailyBottlenecks), "missing key");
    }

    #[tokio::test]
    async fn test_no_choices_stores_placeholder() {
        let (handler, storage) =
            handler(MockGateway::new().with_default_error(GatewayError::NoChoices));
        handler.execute(ctx("callOpenAI-ReviewFailures", "p")).await;

        let dataset = storage.insights.get().await.unwrap();
        assert_eq!(dataset.get(InsightType::ReviewKeyFailures), NO_CHOICES_MESSAGE);
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_without_write() {
        let (handler, storage) = handler(
            MockGateway::new()
                .with_default_error(GatewayError::Transport("connection refused".to_string())),
        );
        let result = handler.execute(ctx("callOpenAI-SprintPlanSteps", "p")).await;

        assert!(matches!(result, JobResult::Retry(_)));
        assert_eq!(storage.insights.get().await.unwrap().generated_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_ignored() {
        let gateway = MockGateway::new();
        let (handler, storage) = handler(gateway.clone());

        let result = handler.execute(ctx("callOpenAI-Horoscope", "p")).await;

        assert!(matches!(result, JobResult::Ignored(_)));
        assert_eq!(gateway.call_count(), 0);
        assert!(storage.kv.get("AIDataset").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ask_job_writes_ask_slot() {
        let (handler, storage) = handler(MockGateway::new().with_default_response("Ben"));
        handler.execute(ctx("callOpenAI-AskGPT", "who?")).await;

        assert_eq!(storage.ask.get().await.unwrap().as_deref(), Some("Ben"));
        assert_eq!(storage.insights.get().await.unwrap().generated_count(), 0);
    }
}

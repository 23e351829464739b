//! Scripted mock gateway for deterministic testing.
//!
//! Replies are chosen in this order: a queued one-shot outcome, the first
//! rule whose needle appears in the prompt, then the default reply.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use insight_core::{GatewayError, LlmGateway};
//! use insight_inference::mock::MockGateway;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let gateway = MockGateway::new()
//!     .with_default_response("ok")
//!     .with_rule("priority order", Ok("1. PRJ-2".to_string()))
//!     .with_rule("lead", Err(GatewayError::NoChoices));
//!
//! assert_eq!(gateway.chat(None, "anything").await.unwrap(), "ok");
//! assert_eq!(gateway.call_count(), 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use insight_core::{GatewayError, LlmGateway};

type Outcome = Result<String, GatewayError>;

/// A call received by [`MockGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub api_key: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_response: Outcome,
    rules: Vec<(String, Outcome)>,
    latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_response: Ok("Mock response".to_string()),
            rules: Vec::new(),
            latency_ms: 0,
        }
    }
}

/// Mock [`LlmGateway`] with scripted outcomes and a call log.
#[derive(Clone, Default)]
pub struct MockGateway {
    config: Arc<MockConfig>,
    queued: Arc<Mutex<VecDeque<Outcome>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply returned when nothing else matches.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = Ok(response.into());
        self
    }

    /// Failure returned when nothing else matches.
    pub fn with_default_error(mut self, error: GatewayError) -> Self {
        Arc::make_mut(&mut self.config).default_response = Err(error);
        self
    }

    /// Outcome for any prompt containing `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, outcome: Outcome) -> Self {
        Arc::make_mut(&mut self.config)
            .rules
            .push((needle.into(), outcome));
        self
    }

    /// Simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Queue a one-shot outcome consumed by the next call.
    pub fn push_outcome(&self, outcome: Outcome) {
        lock(&self.queued).push_back(outcome);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.call_log).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_log).len()
    }

    pub fn clear_calls(&self) {
        lock(&self.call_log).clear()
    }

    fn pick(&self, prompt: &str) -> Outcome {
        if let Some(outcome) = lock(&self.queued).pop_front() {
            return outcome;
        }
        self.config
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| self.config.default_response.clone())
    }
}

#[async_trait]
impl LlmGateway for MockGateway {
    async fn chat(&self, api_key: Option<&str>, prompt: &str) -> Outcome {
        lock(&self.call_log).push(MockCall {
            api_key: api_key.map(str::to_string),
            prompt: prompt.to_string(),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        self.pick(prompt)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

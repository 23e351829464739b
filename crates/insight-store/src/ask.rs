//! Ad-hoc question response slot.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use insight_core::defaults::KEY_ASK_RESPONSE;
use insight_core::{KeyValueStore, Result};

/// Holds the latest answer to an ad-hoc question.
#[derive(Clone)]
pub struct AskResponseRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl AskResponseRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// `None` while no answer has arrived since the last [`clear`](Self::clear).
    pub async fn get(&self) -> Result<Option<String>> {
        Ok(match self.kv.get(KEY_ASK_RESPONSE).await? {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        })
    }

    pub async fn set(&self, text: impl Into<String> + Send) -> Result<()> {
        self.kv
            .set(KEY_ASK_RESPONSE, JsonValue::String(text.into()))
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.delete(KEY_ASK_RESPONSE).await
    }
}

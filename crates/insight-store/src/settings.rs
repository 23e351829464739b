//! Application settings repository.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use insight_core::defaults::KEY_APP_SETTINGS;
use insight_core::{AppSettings, KeyValueStore, Result};

#[derive(Clone)]
pub struct SettingsRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored settings, or all-absent when none were saved.
    pub async fn get(&self) -> Result<AppSettings> {
        match self.kv.get(KEY_APP_SETTINGS).await? {
            None | Some(JsonValue::Null) => Ok(AppSettings::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        self.kv
            .set(KEY_APP_SETTINGS, serde_json::to_value(settings)?)
            .await
    }
}

//! Insight dataset repository.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use insight_core::defaults::KEY_AI_DATASET;
use insight_core::{InsightDataset, InsightType, KeyValueStore, Result};

/// Reads and updates the single shared [`InsightDataset`] record.
#[derive(Clone)]
pub struct InsightDatasetRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl InsightDatasetRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Current dataset. Every field is `""` when nothing was stored yet.
    pub async fn get(&self) -> Result<InsightDataset> {
        match self.kv.get(KEY_AI_DATASET).await? {
            None | Some(JsonValue::Null) => Ok(InsightDataset::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Replace one field and write the whole record back.
    ///
    /// This is a plain read-modify-write with no lock or version check. Two
    /// upserts whose reads overlap both start from the same snapshot, so the
    /// later write drops the earlier one's field.
    pub async fn upsert(&self, insight: InsightType, value: impl Into<String> + Send) -> Result<()> {
        let mut dataset = self.get().await?;
        let value = value.into();
        debug!(
            subsystem = "store",
            component = "insights",
            op = "upsert",
            insight = %insight,
            response_len = value.len(),
            "Updating insight field"
        );
        dataset.set(insight, value);
        self.kv
            .set(KEY_AI_DATASET, serde_json::to_value(&dataset)?)
            .await
    }

    /// Drop all generated insights.
    pub async fn reset(&self) -> Result<()> {
        self.kv.delete(KEY_AI_DATASET).await
    }
}

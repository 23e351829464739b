//! Repository behavior over the in-memory key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Barrier;

use insight_core::defaults::{KEY_AI_DATASET, KEY_APP_SETTINGS, KEY_ASK_RESPONSE, KEY_TEAM_SKILLS};
use insight_core::{AppSettings, Error, InsightType, KeyValueStore, Result, SkillEntry};
use insight_store::{InsightDatasetRepository, MemoryKvStore, Storage};

#[tokio::test]
async fn test_empty_store_returns_all_fields_empty() {
    let storage = Storage::memory();
    let dataset = storage.insights.get().await.unwrap();
    for insight in InsightType::ALL {
        assert_eq!(dataset.get(insight), "", "{} should be empty", insight);
    }
    assert_eq!(dataset.generated_count(), 0);
}

#[tokio::test]
async fn test_upsert_touches_only_its_field() {
    for target in InsightType::ALL {
        let storage = Storage::memory();
        for other in InsightType::ALL {
            storage
                .insights
                .upsert(other, format!("before-{}", other))
                .await
                .unwrap();
        }

        storage.insights.upsert(target, "after").await.unwrap();

        let dataset = storage.insights.get().await.unwrap();
        for insight in InsightType::ALL {
            let expected = if insight == target {
                "after".to_string()
            } else {
                format!("before-{}", insight)
            };
            assert_eq!(dataset.get(insight), expected);
        }
    }
}

#[tokio::test]
async fn test_dataset_persists_under_fixed_key() {
    let kv = Arc::new(MemoryKvStore::new());
    let storage = Storage::new(kv.clone());
    storage
        .insights
        .upsert(InsightType::SprintLeads, "Ana leads")
        .await
        .unwrap();

    let raw = kv.get(KEY_AI_DATASET).await.unwrap().unwrap();
    assert_eq!(raw["SprintLeads"], "Ana leads");
    assert_eq!(raw.as_object().unwrap().len(), 18);
}

#[tokio::test]
async fn test_partial_stored_dataset_is_filled() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.set(KEY_AI_DATASET, json!({"DailySummary": "quiet day"}))
        .await
        .unwrap();

    let storage = Storage::new(kv);
    let dataset = storage.insights.get().await.unwrap();
    assert_eq!(dataset.get(InsightType::DailySummary), "quiet day");
    assert_eq!(dataset.get(InsightType::SprintPlanSteps), "");
}

#[tokio::test]
async fn test_reset_clears_dataset() {
    let storage = Storage::memory();
    storage
        .insights
        .upsert(InsightType::ReviewLaggards, "x")
        .await
        .unwrap();
    storage.insights.reset().await.unwrap();
    assert_eq!(storage.insights.get().await.unwrap().generated_count(), 0);
}

/// Key-value store that holds every dataset read at a barrier, so two
/// concurrent upserts are guaranteed to read the same snapshot before either
/// writes.
struct GatedKv {
    inner: Arc<MemoryKvStore>,
    barrier: Barrier,
}

#[async_trait]
impl KeyValueStore for GatedKv {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let value = self.inner.get(key).await?;
        if key == KEY_AI_DATASET {
            self.barrier.wait().await;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn test_overlapping_upserts_lose_one_write() {
    let inner = Arc::new(MemoryKvStore::new());
    let gated = Arc::new(GatedKv {
        inner: inner.clone(),
        barrier: Barrier::new(2),
    });
    let racing = InsightDatasetRepository::new(gated);

    let (a, b) = tokio::join!(
        racing.upsert(InsightType::DailySummary, "summary"),
        racing.upsert(InsightType::DailyBottlenecks, "bottlenecks"),
    );
    a.unwrap();
    b.unwrap();

    let dataset = InsightDatasetRepository::new(inner).get().await.unwrap();
    let summary_kept = dataset.get(InsightType::DailySummary) == "summary";
    let bottlenecks_kept = dataset.get(InsightType::DailyBottlenecks) == "bottlenecks";

    // Both writers started from the same empty snapshot, so exactly one
    // field survives.
    assert!(
        summary_kept ^ bottlenecks_kept,
        "expected exactly one write to survive, got summary={} bottlenecks={}",
        summary_kept,
        bottlenecks_kept
    );
    assert_eq!(dataset.generated_count(), 1);
}

#[tokio::test]
async fn test_sequential_upserts_keep_both_writes() {
    let storage = Storage::memory();
    storage
        .insights
        .upsert(InsightType::DailySummary, "summary")
        .await
        .unwrap();
    storage
        .insights
        .upsert(InsightType::DailyBottlenecks, "bottlenecks")
        .await
        .unwrap();

    let dataset = storage.insights.get().await.unwrap();
    assert_eq!(dataset.generated_count(), 2);
}

#[tokio::test]
async fn test_ask_response_lifecycle() {
    let kv = Arc::new(MemoryKvStore::new());
    let storage = Storage::new(kv.clone());
    assert!(storage.ask.get().await.unwrap().is_none());

    storage.ask.set("Ana should review").await.unwrap();
    assert_eq!(
        storage.ask.get().await.unwrap().as_deref(),
        Some("Ana should review")
    );
    assert_eq!(
        kv.get(KEY_ASK_RESPONSE).await.unwrap(),
        Some(json!("Ana should review"))
    );

    storage.ask.clear().await.unwrap();
    assert!(storage.ask.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_settings_default_and_save() {
    let kv = Arc::new(MemoryKvStore::new());
    let storage = Storage::new(kv.clone());

    let settings = storage.settings.get().await.unwrap();
    assert!(!settings.is_configured());

    let saved = AppSettings {
        api_key: Some("sk-live".to_string()),
        ai_model: Some("ChatGPT".to_string()),
        ai_anonymize: Some("No".to_string()),
    };
    storage.settings.save(&saved).await.unwrap();

    assert_eq!(storage.settings.get().await.unwrap(), saved);
    let raw = kv.get(KEY_APP_SETTINGS).await.unwrap().unwrap();
    assert_eq!(raw["APIKey"], "sk-live");
}

#[tokio::test]
async fn test_skills_append_and_remove() {
    let kv = Arc::new(MemoryKvStore::new());
    let storage = Storage::new(kv.clone());
    assert!(storage.skills.list().await.unwrap().is_empty());

    assert_eq!(
        storage
            .skills
            .append(SkillEntry::new("Ana", "Rust", 9))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        storage
            .skills
            .append(SkillEntry::new("Ben", "SQL", 4))
            .await
            .unwrap(),
        2
    );

    let raw = kv.get(KEY_TEAM_SKILLS).await.unwrap().unwrap();
    assert_eq!(raw[1]["member_name"], "Ben");

    let removed = storage.skills.remove(0).await.unwrap();
    assert_eq!(removed.member_name, "Ana");
    let remaining = storage.skills.list().await.unwrap();
    assert_eq!(remaining, vec![SkillEntry::new("Ben", "SQL", 4)]);
}

#[tokio::test]
async fn test_skills_reject_out_of_range_level() {
    let storage = Storage::memory();
    let err = storage
        .skills
        .append(SkillEntry::new("Ana", "Rust", 11))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(storage.skills.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_skills_remove_out_of_range_is_not_found() {
    let storage = Storage::memory();
    storage
        .skills
        .append(SkillEntry::new("Ana", "Rust", 5))
        .await
        .unwrap();
    let err = storage.skills.remove(3).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(storage.skills.list().await.unwrap().len(), 1);
}

//! # insight-store
//!
//! Persistence for the sprint insight pipeline.
//!
//! This crate provides:
//! - [`KeyValueStore`](insight_core::KeyValueStore) backends (in-memory and PostgreSQL)
//! - Typed repositories over the fixed storage keys
//! - [`JobQueue`](insight_core::JobQueue) backends (in-memory and PostgreSQL)
//! - Connection pool management

pub mod ask;
pub mod insights;
pub mod kv;
pub mod pool;
pub mod queue;
pub mod settings;
pub mod skills;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use insight_core::KeyValueStore;
#[cfg(feature = "migrations")]
use insight_core::{Error, Result};

pub use ask::AskResponseRepository;
pub use insights::InsightDatasetRepository;
pub use kv::{MemoryKvStore, PgKvStore};
pub use pool::{create_pool_with_config, log_pool_metrics, PoolConfig};
pub use queue::{MemoryJobQueue, PgJobQueue};
pub use settings::SettingsRepository;
pub use skills::TeamSkillRepository;

/// One process-wide set of repositories sharing a key-value store.
#[derive(Clone)]
pub struct Storage {
    /// The underlying key-value store.
    pub kv: Arc<dyn KeyValueStore>,
    /// Generated insight dataset.
    pub insights: InsightDatasetRepository,
    /// Ad-hoc question response.
    pub ask: AskResponseRepository,
    /// Application settings.
    pub settings: SettingsRepository,
    /// Team skill list.
    pub skills: TeamSkillRepository,
}

impl Storage {
    /// Build repositories over any key-value store.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            insights: InsightDatasetRepository::new(kv.clone()),
            ask: AskResponseRepository::new(kv.clone()),
            settings: SettingsRepository::new(kv.clone()),
            skills: TeamSkillRepository::new(kv.clone()),
            kv,
        }
    }

    /// Storage backed by a fresh in-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// Storage backed by the `app_storage` table.
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(Arc::new(PgKvStore::new(pool)))
    }
}

/// Run pending migrations.
#[cfg(feature = "migrations")]
pub async fn migrate(pool: &Pool<Postgres>) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(())
}

//! PostgreSQL-backed key-value store.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres};
use tracing::trace;

use insight_core::{Error, KeyValueStore, Result};

/// [`KeyValueStore`] on the `app_storage` table.
///
/// Keys are scoped by a namespace so several installations (or test runs) can
/// share one database.
#[derive(Clone)]
pub struct PgKvStore {
    pool: Pool<Postgres>,
    namespace: String,
}

impl PgKvStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_namespace(pool, "")
    }

    pub fn with_namespace(pool: Pool<Postgres>, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Remove every key in this namespace.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM app_storage WHERE namespace = $1")
            .bind(&self.namespace)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl KeyValueStore for PgKvStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        trace!(subsystem = "store", component = "kv", op = "get", store_key = key);
        let value: Option<JsonValue> = sqlx::query_scalar(
            "SELECT value FROM app_storage WHERE namespace = $1 AND key = $2",
        )
        .bind(&self.namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        trace!(subsystem = "store", component = "kv", op = "set", store_key = key);
        sqlx::query(
            "INSERT INTO app_storage (namespace, key, value, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (namespace, key)
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        trace!(subsystem = "store", component = "kv", op = "delete", store_key = key);
        sqlx::query("DELETE FROM app_storage WHERE namespace = $1 AND key = $2")
            .bind(&self.namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::{query, query_as, sqlite::SqlitePool};

/// The two persistence scopes the extension uses: settings live in
/// `Synced`, verdicts and counters in `Local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Synced,
    Local,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Synced => "synced",
            Scope::Local => "local",
        }
    }
}

/// JSON values keyed by string, one row per `(scope, key)`. Each call is
/// atomic on its own; nothing here spans calls.
#[derive(Clone)]
pub struct KeyValueStore {
    pool: SqlitePool,
}

impl KeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get<T: DeserializeOwned>(&self, scope: Scope, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> =
            query_as(r#"SELECT value FROM kv_store WHERE scope = ?1 AND key = ?2"#)
                .bind(scope.as_str())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((raw,)) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("stored value for {key} is not valid"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, scope: Scope, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        query(
            r#"INSERT OR REPLACE INTO kv_store (scope, key, value, updated_at)
                VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)"#,
        )
        .bind(scope.as_str())
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every entry in `scope`. Rows whose value is not JSON are skipped.
    pub async fn get_all(&self, scope: Scope) -> Result<Map<String, Value>> {
        let rows: Vec<(String, String)> =
            query_as(r#"SELECT key, value FROM kv_store WHERE scope = ?1"#)
                .bind(scope.as_str())
                .fetch_all(&self.pool)
                .await?;
        let mut entries = Map::new();
        for (key, raw) in rows {
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    entries.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "storage",
                        key = %key,
                        error = %err,
                        "skipping unreadable entry"
                    );
                }
            }
        }
        Ok(entries)
    }

    pub async fn remove_prefix(&self, scope: Scope, prefix: &str) -> Result<u64> {
        let affected = query(
            r#"DELETE FROM kv_store WHERE scope = ?1 AND substr(key, 1, length(?2)) = ?2"#,
        )
        .bind(scope.as_str())
        .bind(prefix)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_store;

    #[tokio::test]
    async fn scopes_are_independent() {
        let (_dir, store) = temp_store().await;
        store.set(Scope::Synced, "showWarnings", &false).await.unwrap();
        store.set(Scope::Local, "showWarnings", &true).await.unwrap();

        assert_eq!(store.get::<bool>(Scope::Synced, "showWarnings").await.unwrap(), Some(false));
        assert_eq!(store.get::<bool>(Scope::Local, "showWarnings").await.unwrap(), Some(true));
        assert_eq!(store.get::<bool>(Scope::Local, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let (_dir, store) = temp_store().await;
        store.set(Scope::Local, "k", &1_u32).await.unwrap();
        store.set(Scope::Local, "k", &2_u32).await.unwrap();
        assert_eq!(store.get::<u32>(Scope::Local, "k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn prefix_removal_treats_underscore_literally() {
        let (_dir, store) = temp_store().await;
        store.set(Scope::Local, "site_example.gov", &1).await.unwrap();
        store.set(Scope::Local, "site_shop.example", &2).await.unwrap();
        store.set(Scope::Local, "siteXother", &3).await.unwrap();
        store.set(Scope::Local, "dailyStats", &4).await.unwrap();
        store.set(Scope::Synced, "site_synced", &5).await.unwrap();

        let removed = store.remove_prefix(Scope::Local, "site_").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get::<i32>(Scope::Local, "siteXother").await.unwrap(), Some(3));
        assert_eq!(store.get::<i32>(Scope::Local, "dailyStats").await.unwrap(), Some(4));
        assert_eq!(store.get::<i32>(Scope::Synced, "site_synced").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn closed_pool_surfaces_errors() {
        let (_dir, store) = temp_store().await;
        store.close().await;
        assert!(store.get::<u32>(Scope::Local, "k").await.is_err());
        assert!(store.set(Scope::Local, "k", &1).await.is_err());
    }
}

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use crate::config::SessionBackend;
use crate::error::ApiResult;

/// The two persisted session entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Token,
    Username,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::Token, StoreKey::Username];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Token => "token",
            StoreKey::Username => "username",
        }
    }
}

/// Durable key-value storage for the bearer token and username.
///
/// Only the session manager writes to it; the HTTP client only reads the token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: StoreKey) -> ApiResult<Option<String>>;
    async fn set(&self, key: StoreKey, value: &str) -> ApiResult<()>;
    async fn remove(&self, key: StoreKey) -> ApiResult<()>;

    async fn clear(&self) -> ApiResult<()> {
        for key in StoreKey::ALL {
            self.remove(key).await?;
        }
        Ok(())
    }
}

pub async fn open_store(backend: &SessionBackend) -> ApiResult<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::default()),
        SessionBackend::Sqlite(url) => Arc::new(SqliteSessionStore::connect(url).await?),
    };
    Ok(store)
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<StoreKey, String>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: StoreKey) -> ApiResult<Option<String>> {
        Ok(self.entries.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: &str) -> ApiResult<()> {
        self.entries.lock().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> ApiResult<()> {
        self.entries.lock().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> ApiResult<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

pub struct SqliteSessionStore {
    db: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn connect(database_url: &str) -> ApiResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One connection: `sqlite::memory:` databases are per connection.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(db).await
    }

    pub async fn with_pool(db: SqlitePool) -> ApiResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: StoreKey) -> ApiResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM session_entries WHERE key = ?1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: StoreKey, value: &str) -> ApiResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO session_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> ApiResult<()> {
        sqlx::query("DELETE FROM session_entries WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> ApiResult<()> {
        sqlx::query("DELETE FROM session_entries WHERE key IN (?1, ?2)")
            .bind(StoreKey::Token.as_str())
            .bind(StoreKey::Username.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(store: &dyn SessionStore) {
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);

        store.set(StoreKey::Token, "abc").await.unwrap();
        store.set(StoreKey::Username, "ada").await.unwrap();
        store.set(StoreKey::Token, "def").await.unwrap();
        assert_eq!(store.get(StoreKey::Token).await.unwrap().as_deref(), Some("def"));

        store.remove(StoreKey::Token).await.unwrap();
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
        assert_eq!(store.get(StoreKey::Username).await.unwrap().as_deref(), Some("ada"));

        store.set(StoreKey::Token, "ghi").await.unwrap();
        store.clear().await.unwrap();
        for key in StoreKey::ALL {
            assert_eq!(store.get(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn memory_store_behaves() {
        exercise(&MemorySessionStore::default()).await;
    }

    #[tokio::test]
    async fn sqlite_store_behaves() {
        let store = SqliteSessionStore::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory session store");
        exercise(&store).await;
    }
}

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use storage::Storage;

use crate::{SessionStore, TokenVault};

/// Sqlite-backed session medium: snapshots survive a client restart as long
/// as the session's data directory does.
pub struct DurableSessionStore {
    store: Storage,
}

impl DurableSessionStore {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize session storage at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }

    pub fn from_storage(store: Storage) -> Arc<Self> {
        Arc::new(Self { store })
    }

    pub fn sqlite_url_for_data_dir(base_dir: &Path) -> String {
        format!(
            "sqlite://{}",
            base_dir.join("client_state.sqlite3").display()
        )
    }
}

#[async_trait]
impl SessionStore for DurableSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.session_get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.store.session_put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.store.session_remove(key).await
    }
}

/// Token location backed by the same sqlite file, in its own table, so
/// snapshot eviction never disturbs it.
pub struct DurableTokenVault {
    store: Storage,
}

impl DurableTokenVault {
    pub fn from_storage(store: Storage) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

#[async_trait]
impl TokenVault for DurableTokenVault {
    async fn save(&self, token: &str) -> Result<()> {
        self.store.token_save(token).await
    }

    async fn load(&self) -> Result<Option<String>> {
        self.store.token_load().await
    }

    async fn clear(&self) -> Result<()> {
        self.store.token_clear().await
    }
}

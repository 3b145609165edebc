//! Wiring of the shared client state.
//!
//! One `AppContext` is built per process and handed to whoever needs the
//! sync manager or the list service. Tests build their own.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::ApiClient;
use crate::config::Config;
use crate::data::ListService;
use crate::offline::{SyncManager, SyncSettings};
use crate::storage::FileStore;

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub manager: Arc<SyncManager>,
    pub lists: ListService,
}

impl AppContext {
    /// Build the HTTP client, the file store and the sync manager from `config`
    pub fn new(config: Config) -> Result<Self> {
        Self::with_settings(config.clone(), config.sync_settings())
    }

    pub fn with_settings(config: Config, settings: SyncSettings) -> Result<Self> {
        let mut api = ApiClient::with_timeout(config.api_url.clone(), config.request_timeout())
            .context("Failed to create API client")?;
        if let Some(ref token) = config.token {
            api = api.with_token(token.as_str());
        }

        let data_dir = config.data_dir()?;
        debug!(?data_dir, api_url = %config.api_url, "Offline storage configured");
        let store = FileStore::new(&data_dir)
            .with_context(|| format!("Failed to open offline storage at {}", data_dir.display()))?;

        let manager = Arc::new(SyncManager::new(
            Arc::new(store),
            Arc::new(api.clone()),
            settings,
        ));
        let lists = ListService::new(Arc::clone(&manager), config.shop_id.clone());

        Ok(Self {
            config,
            api,
            manager,
            lists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_context_persists_to_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Config::default()
        };

        {
            let ctx = AppContext::new(config.clone()).unwrap();
            ctx.manager.enqueue_mutation("/list_complete/abc123", json!({}));
            ctx.manager.record_snapshot(vec![json!({"id": "abc123"})]);
        }

        // A second process start sees the same state
        let ctx = AppContext::new(config).unwrap();
        assert_eq!(ctx.manager.pending_count(), 1);
        assert_eq!(ctx.manager.read_snapshot(), vec![json!({"id": "abc123"})]);
        assert_eq!(ctx.lists.shop_id(), "NO-TR-001");
    }
}

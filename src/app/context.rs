use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::api;
use crate::app::error::{PodcacheError, Result};
use crate::config::Config;
use crate::domain::Settings;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::RemoteFetcher;
use crate::query::{QueryService, StatusReport};
use crate::scheduler::Scheduler;
use crate::settings::{self, resolve_urls, EffectiveUrls};
use crate::store::{SqliteStore, Store};
use crate::sync::{SyncEngine, SyncReport, Trigger};

/// Operator view: cache status plus the URLs the next run will use.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub status: StatusReport,
    pub urls: EffectiveUrls,
    pub sync_running: bool,
}

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store + Send + Sync>,
    pub engine: Arc<SyncEngine>,
    pub query: QueryService,
}

impl AppContext {
    /// Open the configured database and fetch over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config
            .database_path()
            .map_err(|e| PodcacheError::Config(e.to_string()))?;
        tracing::debug!("Opening database at {}", db_path.display());

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::with_parts(config, store, fetcher))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::with_parts(config, store, fetcher))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn RemoteFetcher + Send + Sync>,
    ) -> Self {
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            fetcher,
            config.sync.clone(),
        ));
        let query = QueryService::new(store.clone());

        Self {
            config,
            store,
            engine,
            query,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::from_engine(self.engine.clone())
    }

    /// Public API routes under the configured mount.
    pub fn router(&self) -> Router {
        api::router(self.query.clone(), &self.config.server.mount)
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard {
            status: self.query.get_status(),
            urls: resolve_urls(self.store.as_ref(), &self.config.sync),
            sync_running: self.engine.is_running(),
        }
    }

    pub fn save_settings(
        &self,
        episodes_url: Option<&str>,
        opml_url: Option<&str>,
    ) -> Result<Settings> {
        settings::save_settings(self.store.as_ref(), episodes_url, opml_url)
    }

    pub async fn trigger_sync(&self) -> SyncReport {
        self.engine.run(Trigger::Manual).await
    }

    /// Drop cached episodes, sources and sync records, then run a manual sync.
    pub async fn clear_and_resync(&self) -> Result<SyncReport> {
        self.engine.clear_and_run(Trigger::Manual).await
    }
}

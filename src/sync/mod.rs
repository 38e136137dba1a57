//! The sync run procedure shared by scheduled ticks and manual triggers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::app::error::Stage;
use crate::app::{PodcacheError, Result};
use crate::config::SyncConfig;
use crate::fetcher::RemoteFetcher;
use crate::normalizer::Normalizer;
use crate::reconciler::{EpisodeCounts, Reconciler, SourceCounts};
use crate::settings::{resolve_urls, EffectiveUrls};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Initial => "initial",
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        })
    }
}

#[derive(Debug)]
pub enum PipelineOutcome<T> {
    Completed(T),
    /// No URL configured for this pipeline
    Skipped,
    Failed {
        stage: Stage,
        error: PodcacheError,
    },
}

impl<T> PipelineOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub trigger: Trigger,
    pub urls: EffectiveUrls,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub episodes: PipelineOutcome<EpisodeCounts>,
    pub sources: PipelineOutcome<SourceCounts>,
}

impl RunSummary {
    /// True when no pipeline failed.
    pub fn success(&self) -> bool {
        !self.episodes.is_failed() && !self.sources.is_failed()
    }
}

#[derive(Debug)]
pub enum SyncReport {
    Completed(RunSummary),
    /// Another run held the single-flight guard; nothing was fetched.
    AlreadyRunning,
}

/// Fetch -> normalize -> reconcile, at most one run at a time.
pub struct SyncEngine {
    store: Arc<dyn Store + Send + Sync>,
    fetcher: Arc<dyn RemoteFetcher + Send + Sync>,
    normalizer: Normalizer,
    reconciler: Reconciler,
    config: SyncConfig,
    run_guard: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn RemoteFetcher + Send + Sync>,
        config: SyncConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            store,
            fetcher,
            normalizer: Normalizer::new(),
            config,
            run_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Run once unless a run is already in flight.
    pub async fn run(&self, trigger: Trigger) -> SyncReport {
        match self.run_guard.try_lock() {
            Ok(guard) => SyncReport::Completed(self.run_guarded(&guard, trigger).await),
            Err(_) => {
                tracing::info!("Skipping {} sync: a run is already in progress", trigger);
                SyncReport::AlreadyRunning
            }
        }
    }

    /// Clear the cache (keeping settings) and run, under the same guard so a
    /// concurrent run never sees a half-cleared store.
    pub async fn clear_and_run(&self, trigger: Trigger) -> Result<SyncReport> {
        let Ok(guard) = self.run_guard.try_lock() else {
            tracing::info!("Not clearing cache: a run is already in progress");
            return Ok(SyncReport::AlreadyRunning);
        };

        self.store.clear_cache()?;
        tracing::info!("Cleared cached episodes, sources and sync records");

        Ok(SyncReport::Completed(self.run_guarded(&guard, trigger).await))
    }

    async fn run_guarded(&self, _guard: &MutexGuard<'_, ()>, trigger: Trigger) -> RunSummary {
        let started_at = Utc::now();
        let urls = resolve_urls(self.store.as_ref(), &self.config);
        tracing::info!("Starting {} sync", trigger);

        let (episodes, sources) = tokio::join!(
            self.sync_episodes(urls.episodes_url.as_deref()),
            self.sync_sources(urls.opml_url.as_deref()),
        );

        let summary = RunSummary {
            trigger,
            urls,
            started_at,
            finished_at: Utc::now(),
            episodes,
            sources,
        };
        log_summary(&summary);
        summary
    }

    async fn sync_episodes(&self, url: Option<&str>) -> PipelineOutcome<EpisodeCounts> {
        let Some(url) = url else {
            tracing::warn!("No episodes URL configured; skipping episodes sync");
            return PipelineOutcome::Skipped;
        };

        let result = async {
            let raws = self
                .fetcher
                .fetch_episodes(url, self.config.fetch_timeout(), self.config.fetch_count)
                .await?;
            let episodes = self.normalizer.normalize_episodes(raws, Utc::now());
            self.reconciler
                .reconcile_episodes(episodes, self.config.max_episodes)
        }
        .await;

        match result {
            Ok(counts) => {
                self.reconciler.record_episodes_run(Ok(&counts));
                PipelineOutcome::Completed(counts)
            }
            Err(error) => {
                self.reconciler.record_episodes_run(Err(error.to_string()));
                PipelineOutcome::Failed {
                    stage: Stage::Episodes,
                    error,
                }
            }
        }
    }

    async fn sync_sources(&self, url: Option<&str>) -> PipelineOutcome<SourceCounts> {
        let Some(url) = url else {
            tracing::debug!("No OPML URL configured; skipping sources sync");
            return PipelineOutcome::Skipped;
        };

        let result = async {
            let xml = self
                .fetcher
                .fetch_sources(url, self.config.fetch_timeout())
                .await?;
            let sources = self.normalizer.normalize_sources(&xml, Utc::now())?;
            self.reconciler.reconcile_sources(&sources)
        }
        .await;

        match result {
            Ok(counts) => {
                self.reconciler.record_sources_run(Ok(&counts));
                PipelineOutcome::Completed(counts)
            }
            Err(error) => {
                self.reconciler.record_sources_run(Err(error.to_string()));
                PipelineOutcome::Failed {
                    stage: Stage::Sources,
                    error,
                }
            }
        }
    }
}

fn log_summary(summary: &RunSummary) {
    let elapsed = summary
        .finished_at
        .signed_duration_since(summary.started_at)
        .num_milliseconds() as f64
        / 1000.0;

    match &summary.episodes {
        PipelineOutcome::Completed(c) => tracing::info!(
            "Episodes synced: {} received, {} inserted, {} updated, {} unchanged",
            c.received,
            c.inserted,
            c.updated,
            c.unchanged
        ),
        PipelineOutcome::Failed { stage, error } => {
            tracing::warn!("{} sync failed: {}", stage, error)
        }
        PipelineOutcome::Skipped => {}
    }

    match &summary.sources {
        PipelineOutcome::Completed(c) => tracing::info!("Sources synced: {} stored", c.replaced),
        PipelineOutcome::Failed { stage, error } => {
            tracing::warn!("{} sync failed: {}", stage, error)
        }
        PipelineOutcome::Skipped => {}
    }

    tracing::info!(
        "{} sync finished in {:.1}s (success: {})",
        summary.trigger,
        elapsed,
        summary.success()
    );
}

//! Applies normalized batches to the store.
//!
//! Episodes accumulate through per-record upserts; sources are replaced
//! wholesale so the stored set always mirrors the latest OPML document.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::app::Result;
use crate::domain::{Episode, MetaKey, Source, SyncRecord};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Insert,
    Update,
    Unchanged,
}

/// Decide what writing `incoming` over `existing` amounts to.
pub fn decide(existing: Option<&Episode>, incoming: &Episode) -> Decision {
    match existing {
        None => Decision::Insert,
        Some(current) if current.same_content(incoming) => Decision::Unchanged,
        Some(_) => Decision::Update,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeCounts {
    /// Records in the upstream batch before truncation
    pub received: usize,
    /// Records diffed against the store after truncation
    pub reconciled: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub replaced: usize,
}

pub struct Reconciler {
    store: Arc<dyn Store + Send + Sync>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self { store }
    }

    /// Upsert the first `max_episodes` records of `episodes`. Each write is
    /// independent; a failure leaves earlier records applied.
    pub fn reconcile_episodes(
        &self,
        mut episodes: Vec<Episode>,
        max_episodes: usize,
    ) -> Result<EpisodeCounts> {
        let mut counts = EpisodeCounts {
            received: episodes.len(),
            ..Default::default()
        };

        episodes.truncate(max_episodes);
        counts.reconciled = episodes.len();

        for episode in &episodes {
            let existing = self.store.get_episode(&episode.id)?;
            match decide(existing.as_ref(), episode) {
                Decision::Insert => {
                    self.store.put_episode(episode)?;
                    counts.inserted += 1;
                }
                Decision::Update => {
                    self.store.put_episode(episode)?;
                    counts.updated += 1;
                }
                Decision::Unchanged => counts.unchanged += 1,
            }
        }

        Ok(counts)
    }

    pub fn reconcile_sources(&self, sources: &[Source]) -> Result<SourceCounts> {
        let replaced = self.store.replace_sources(sources)?;
        Ok(SourceCounts { replaced })
    }

    /// Write the `lastEpisodesSync` record for a finished run, successful or not.
    pub fn record_episodes_run(&self, outcome: std::result::Result<&EpisodeCounts, String>) {
        let record = match outcome {
            Ok(counts) => SyncRecord {
                timestamp: Utc::now(),
                success: true,
                count: counts.reconciled,
                inserted: Some(counts.inserted),
                updated: Some(counts.updated),
                error: None,
            },
            Err(error) => SyncRecord::failed(error),
        };
        self.record(MetaKey::LastEpisodesSync, &record);
    }

    /// Write the `lastSourcesSync` record for a finished run, successful or not.
    pub fn record_sources_run(&self, outcome: std::result::Result<&SourceCounts, String>) {
        let record = match outcome {
            Ok(counts) => SyncRecord {
                timestamp: Utc::now(),
                success: true,
                count: counts.replaced,
                inserted: None,
                updated: None,
                error: None,
            },
            Err(error) => SyncRecord::failed(error),
        };
        self.record(MetaKey::LastSourcesSync, &record);
    }

    fn record(&self, key: MetaKey, record: &SyncRecord) {
        if let Err(e) = self.store.put_sync_record(key, record) {
            tracing::warn!("Failed to write {} record: {}", key, e);
        }
    }
}

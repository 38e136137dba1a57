//! Read-only views over the cache, safe to call while a sync is running.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::app::{PodcacheError, Result};
use crate::domain::{Episode, MetaKey, Source, SyncRecord};
use crate::store::{EpisodeQuery, Store};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

/// Paging parameters as they arrive from callers. Unparsable numbers fall
/// back to the defaults rather than rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeParams {
    #[serde(default, deserialize_with = "lenient_usize")]
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "lenient_usize")]
    pub offset: Option<usize>,
    pub source: Option<String>,
}

fn lenient_usize<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

impl EpisodeParams {
    /// Zero or missing limit means the default; larger values are capped.
    pub fn to_query(&self) -> EpisodeQuery {
        let limit = match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(n) => n.min(MAX_LIMIT),
        };

        EpisodeQuery {
            limit,
            // SQLite OFFSET is a signed 64-bit integer
            offset: self.offset.unwrap_or(0).min(i64::MAX as usize),
            source: self
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePage {
    pub items: Vec<Episode>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceList {
    pub items: Vec<Source>,
    pub total: usize,
    /// Distinct non-empty categories, `None` when there are none
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub available: bool,
    pub episode_count: usize,
    pub source_count: usize,
    pub last_episodes_sync: Option<SyncRecord>,
    pub last_sources_sync: Option<SyncRecord>,
}

impl StatusReport {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            episode_count: 0,
            source_count: 0,
            last_episodes_sync: None,
            last_sources_sync: None,
        }
    }
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn Store + Send + Sync>,
}

impl QueryService {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self { store }
    }

    pub fn list_episodes(&self, params: &EpisodeParams) -> Result<EpisodePage> {
        let query = params.to_query();

        let total = self
            .store
            .count_episodes(query.source.as_deref())
            .map_err(unavailable)?;
        let items = self.store.list_episodes(&query).map_err(unavailable)?;

        Ok(EpisodePage {
            has_more: query.offset.saturating_add(items.len()) < total,
            total,
            limit: query.limit,
            offset: query.offset,
            items,
        })
    }

    pub fn get_episode(&self, id: &str) -> Result<Episode> {
        self.store
            .get_episode(id)
            .map_err(unavailable)?
            .ok_or_else(|| PodcacheError::NotFound(format!("episode {}", id)))
    }

    pub fn list_sources(&self, category: Option<&str>) -> Result<SourceList> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let items = self.store.list_sources(category).map_err(unavailable)?;
        let categories = self.store.source_categories().map_err(unavailable)?;

        Ok(SourceList {
            total: items.len(),
            items,
            categories: (!categories.is_empty()).then_some(categories),
        })
    }

    /// Never fails; an unreachable store yields [`StatusReport::unavailable`].
    pub fn get_status(&self) -> StatusReport {
        match self.try_status() {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Status unavailable: {}", e);
                StatusReport::unavailable()
            }
        }
    }

    fn try_status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            available: true,
            episode_count: self.store.count_episodes(None)?,
            source_count: self.store.count_sources()?,
            last_episodes_sync: self.store.sync_record(MetaKey::LastEpisodesSync)?,
            last_sources_sync: self.store.sync_record(MetaKey::LastSourcesSync)?,
        })
    }
}

/// Reads have no partial results: any storage failure means unavailable.
fn unavailable(err: PodcacheError) -> PodcacheError {
    match err {
        PodcacheError::StoreUnavailable(_) => err,
        other if other.is_unavailable() => PodcacheError::StoreUnavailable(other.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::normalizer::{parse_episode_list, Normalizer};
    use crate::reconciler::Reconciler;
    use crate::store::SqliteStore;
    use crate::testing::{episodes_json, UnavailableStore, OPML_TECH};

    fn seeded(episodes: usize) -> QueryService {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let reconciler = Reconciler::new(store.clone());
        let normalizer = Normalizer::new();

        let raws = parse_episode_list(episodes_json(episodes).as_bytes()).unwrap();
        reconciler
            .reconcile_episodes(normalizer.normalize_episodes(raws, Utc::now()), 1000)
            .unwrap();
        let sources = normalizer.normalize_sources(OPML_TECH, Utc::now()).unwrap();
        reconciler.reconcile_sources(&sources).unwrap();

        QueryService::new(store)
    }

    fn page(limit: usize, offset: usize) -> EpisodeParams {
        EpisodeParams {
            limit: Some(limit),
            offset: Some(offset),
            source: None,
        }
    }

    fn ids(page: &EpisodePage) -> Vec<String> {
        page.items.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_params_defaults_and_cap() {
        let q = EpisodeParams::default().to_query();
        assert_eq!((q.limit, q.offset, q.source), (DEFAULT_LIMIT, 0, None));

        assert_eq!(page(0, 0).to_query().limit, DEFAULT_LIMIT);
        assert_eq!(page(1000, 0).to_query().limit, MAX_LIMIT);

        let blank = EpisodeParams {
            source: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(blank.to_query().source, None);
    }

    #[test]
    fn test_pagination_pages_are_disjoint_and_consistent() {
        let service = seeded(5);

        let first = service.list_episodes(&page(2, 0)).unwrap();
        let second = service.list_episodes(&page(2, 2)).unwrap();
        let combined = service.list_episodes(&page(4, 0)).unwrap();
        let last = service.list_episodes(&page(2, 4)).unwrap();

        assert_eq!(ids(&first), vec!["ep-0", "ep-1"]);
        assert_eq!(ids(&second), vec!["ep-2", "ep-3"]);

        let mut concatenated = ids(&first);
        concatenated.extend(ids(&second));
        assert_eq!(concatenated, ids(&combined));

        assert!(first.has_more);
        assert!(second.has_more);
        assert_eq!(ids(&last), vec!["ep-4"]);
        assert!(!last.has_more);
        assert_eq!(first.total, 5);
    }

    #[test]
    fn test_huge_offset_is_empty_past_the_end() {
        let service = seeded(3);

        for offset in [1usize << 63, usize::MAX] {
            let result = service.list_episodes(&page(2, offset)).unwrap();
            assert!(result.items.is_empty());
            assert!(!result.has_more);
            assert_eq!(result.total, 3);
        }
    }

    #[test]
    fn test_params_parse_leniently() {
        let params: EpisodeParams =
            serde_json::from_str(r#"{"limit": "abc", "offset": "-1", "source": "x"}"#).unwrap();
        let q = params.to_query();
        assert_eq!((q.limit, q.offset), (DEFAULT_LIMIT, 0));
        assert_eq!(q.source.as_deref(), Some("x"));

        let params: EpisodeParams =
            serde_json::from_str(r#"{"limit": " 20 ", "offset": "4"}"#).unwrap();
        let q = params.to_query();
        assert_eq!((q.limit, q.offset), (20, 4));
    }

    #[test]
    fn test_episodes_sorted_newest_first() {
        let service = seeded(3);
        let page = service.list_episodes(&EpisodeParams::default()).unwrap();
        assert!(page.items.windows(2).all(|w| w[0].published >= w[1].published));
    }

    #[test]
    fn test_source_filter_case_insensitive() {
        let service = seeded(3);
        let params = EpisodeParams {
            source: Some("RUST radio".into()),
            ..Default::default()
        };
        assert_eq!(service.list_episodes(&params).unwrap().total, 3);

        let params = EpisodeParams {
            source: Some("no such show".into()),
            ..Default::default()
        };
        let empty = service.list_episodes(&params).unwrap();
        assert_eq!(empty.total, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn test_get_episode_found_and_missing() {
        let service = seeded(2);
        assert_eq!(service.get_episode("ep-1").unwrap().id, "ep-1");
        assert!(matches!(
            service.get_episode("nope"),
            Err(PodcacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_sources_with_categories() {
        let service = seeded(0);

        let all = service.list_sources(None).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.categories, Some(vec!["Tech".to_string()]));

        let tech = service.list_sources(Some("tech")).unwrap();
        assert_eq!(tech.total, 2);
        assert!(tech.items.iter().all(|s| s.category == "Tech"));
        assert!(tech.items[0].order < tech.items[1].order);
    }

    #[test]
    fn test_categories_null_when_none() {
        let service = QueryService::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let list = service.list_sources(None).unwrap();
        assert_eq!(list.total, 0);
        assert!(list.categories.is_none());
    }

    #[test]
    fn test_status_counts() {
        let service = seeded(4);
        let status = service.get_status();
        assert!(status.available);
        assert_eq!(status.episode_count, 4);
        assert_eq!(status.source_count, 3);
        assert!(status.last_episodes_sync.is_none());
    }

    #[test]
    fn test_unavailable_store() {
        let service = QueryService::new(Arc::new(UnavailableStore));

        assert!(matches!(
            service.list_episodes(&EpisodeParams::default()),
            Err(PodcacheError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.get_episode("x"),
            Err(PodcacheError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.list_sources(None),
            Err(PodcacheError::StoreUnavailable(_))
        ));
        assert!(!service.get_status().available);
    }
}

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;

use crate::app::{PodcacheError, Result};
use crate::domain::{Episode, MetaKey, Source};
use crate::store::{EpisodeQuery, Store};

const EPISODE_COLUMNS: &str = "id, guid, title, url, published, content, author, enclosure, origin, categories, fetched_at";

const SOURCE_COLUMNS: &str = "title, xml_url, html_url, source_type, category, sort_order, fetched_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| PodcacheError::StoreUnavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| PodcacheError::StoreUnavailable(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PodcacheError::StoreUnavailable(e.to_string()))
    }

    /// Fixed-width UTC timestamps so lexical order matches time order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn epoch_millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let millis: i64 = row.get(idx)?;
        DateTime::from_timestamp_millis(millis)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
    }

    fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
        let raw: Option<String> = row.get(idx)?;
        raw.map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
    }

    fn episode_from_row(row: &Row<'_>) -> rusqlite::Result<Episode> {
        Ok(Episode {
            id: row.get(0)?,
            guid: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            published: Self::epoch_millis_column(row, 4)?,
            content: row.get(5)?,
            author: row.get(6)?,
            enclosure: Self::json_column(row, 7)?,
            origin: Self::json_column(row, 8)?,
            categories: Self::json_column(row, 9)?.unwrap_or_default(),
            fetched_at: Self::datetime_column(row, 10)?,
        })
    }

    fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
        Ok(Source {
            title: row.get(0)?,
            xml_url: row.get(1)?,
            html_url: row.get(2)?,
            source_type: row.get(3)?,
            category: row.get(4)?,
            order: row.get(5)?,
            fetched_at: Self::datetime_column(row, 6)?,
        })
    }
}

/// SQLite integers are signed; larger paging values saturate.
fn sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Store for SqliteStore {
    fn get_episode(&self, id: &str) -> Result<Option<Episode>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {} FROM episodes WHERE id = ?1", EPISODE_COLUMNS),
                params![id],
                Self::episode_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn put_episode(&self, episode: &Episode) -> Result<()> {
        let enclosure = episode
            .enclosure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let origin = episode
            .origin
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let categories = serde_json::to_string(&episode.categories)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO episodes (id, guid, title, url, published, content, author, enclosure, origin, origin_title, origin_title_lc, categories, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                guid = excluded.guid,
                title = excluded.title,
                url = excluded.url,
                published = excluded.published,
                content = excluded.content,
                author = excluded.author,
                enclosure = excluded.enclosure,
                origin = excluded.origin,
                origin_title = excluded.origin_title,
                origin_title_lc = excluded.origin_title_lc,
                categories = excluded.categories,
                fetched_at = excluded.fetched_at",
            params![
                episode.id,
                episode.guid,
                episode.title,
                episode.url,
                episode.published.timestamp_millis(),
                episode.content,
                episode.author,
                enclosure,
                origin,
                episode.origin_title(),
                episode.origin_title().map(str::to_lowercase),
                categories,
                Self::format_datetime(&episode.fetched_at)
            ],
        )?;

        Ok(())
    }

    fn list_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>> {
        let source = query.source.as_deref().map(str::to_lowercase);
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM episodes
             WHERE ?1 IS NULL OR instr(origin_title_lc, ?1) > 0
             ORDER BY published DESC, id ASC
             LIMIT ?2 OFFSET ?3",
            EPISODE_COLUMNS
        ))?;

        let episodes = stmt
            .query_map(
                params![source, sql_bound(query.limit), sql_bound(query.offset)],
                Self::episode_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(episodes)
    }

    fn count_episodes(&self, source: Option<&str>) -> Result<usize> {
        let source = source.map(str::to_lowercase);
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM episodes
             WHERE ?1 IS NULL OR instr(origin_title_lc, ?1) > 0",
            params![source],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn replace_sources(&self, sources: &[Source]) -> Result<usize> {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sources", [])?;

        let mut count = 0;
        for source in sources {
            count += tx.execute(
                &format!(
                    "INSERT INTO sources ({}, category_lc) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    SOURCE_COLUMNS
                ),
                params![
                    source.title,
                    source.xml_url,
                    source.html_url,
                    source.source_type,
                    source.category,
                    source.order,
                    Self::format_datetime(&source.fetched_at),
                    source.category.to_lowercase()
                ],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn list_sources(&self, category: Option<&str>) -> Result<Vec<Source>> {
        let category = category.map(str::to_lowercase);
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sources
             WHERE ?1 IS NULL OR instr(category_lc, ?1) > 0
             ORDER BY category ASC, sort_order ASC",
            SOURCE_COLUMNS
        ))?;

        let sources = stmt
            .query_map(params![category], Self::source_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    fn count_sources(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn source_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM sources WHERE category <> '' ORDER BY category ASC",
        )?;

        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(categories)
    }

    fn get_meta(&self, key: MetaKey) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn put_meta(&self, key: MetaKey, value: &serde_json::Value) -> Result<()> {
        let value = serde_json::to_string(value)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key.as_str(), value, Self::format_datetime(&Utc::now())],
        )?;

        Ok(())
    }

    fn clear_cache(&self) -> Result<()> {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM episodes", [])?;
        tx.execute("DELETE FROM sources", [])?;
        tx.execute(
            "DELETE FROM meta WHERE key <> ?1",
            params![MetaKey::Settings.as_str()],
        )?;
        tx.commit()?;

        Ok(())
    }
}

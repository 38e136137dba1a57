//! # podcache
//!
//! A podcast episode cache kept in sync with a feed aggregator.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Reconciler → Store → Query → API
//! ```
//!
//! A [`scheduler::Scheduler`] drives [`sync::SyncEngine`] runs on a timer.
//! Each run pulls a greader-style JSON episode list and an OPML source
//! listing, normalizes both, and writes them to SQLite. Reads go through
//! [`query::QueryService`], which the [`api`] routes expose as JSON.
//!
//! ## Quick Start
//!
//! ```bash
//! # Point at the aggregator and sync once
//! podcache settings --episodes-url https://agg.example/items --opml-url https://agg.example/opml
//! podcache sync
//!
//! # Serve the API with periodic syncs
//! podcache serve --interval 30m
//! ```

/// HTTP JSON routes (axum), mounted under a configurable prefix.
pub mod api;

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher, sync engine and query service.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/podcache/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Episode`](domain::Episode): one podcast episode, keyed by a stable id
/// - [`Source`](domain::Source): one OPML subscription
/// - [`SyncRecord`](domain::SyncRecord) and [`Settings`](domain::Settings): `meta` values
pub mod domain;

/// Upstream HTTP fetching.
///
/// - [`RemoteFetcher`](fetcher::RemoteFetcher): async trait for both payloads
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Raw upstream records to domain models.
pub mod normalizer;

/// Read-side pagination and filtering.
pub mod query;

/// Diffs normalized batches against the store.
pub mod reconciler;

/// Periodic trigger for sync runs.
pub mod scheduler;

/// Persisted URL overrides.
pub mod settings;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// The single-flight sync run.
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

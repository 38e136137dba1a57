use std::time::Duration;

use crate::app::{AppContext, PodcacheError, Result};
use crate::query::{EpisodeParams, StatusReport};
use crate::scheduler::{format_interval, Scheduler};
use crate::settings::EffectiveUrls;
use crate::sync::{PipelineOutcome, RunSummary, SyncReport};

pub async fn serve(ctx: &AppContext, interval: Option<Duration>) -> Result<()> {
    let scheduler = match interval {
        Some(interval) => Scheduler::new(
            ctx.engine.clone(),
            ctx.config.sync.initial_delay(),
            interval,
        ),
        None => ctx.scheduler(),
    };

    let listener = tokio::net::TcpListener::bind(&ctx.config.server.bind).await?;
    tracing::info!(
        "Serving API on http://{}{} (sync every {})",
        listener.local_addr()?,
        ctx.config.server.mount.trim_end_matches('/'),
        format_interval(scheduler.interval())
    );

    scheduler.start().await;
    let served = axum::serve(listener, ctx.router())
        .with_graceful_shutdown(shutdown_signal())
        .await;
    scheduler.stop().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to set up SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
}

pub async fn sync(ctx: &AppContext) -> Result<()> {
    report(ctx.trigger_sync().await)
}

pub async fn clear(ctx: &AppContext) -> Result<()> {
    let outcome = ctx.clear_and_resync().await?;
    if matches!(outcome, SyncReport::Completed(_)) {
        println!("Cache cleared (settings kept)");
    }
    report(outcome)
}

/// Print a run report. A failed pipeline becomes the command's error.
fn report(outcome: SyncReport) -> Result<()> {
    let summary = match outcome {
        SyncReport::AlreadyRunning => {
            println!("A sync is already in progress");
            return Ok(());
        }
        SyncReport::Completed(summary) => summary,
    };

    print_summary(&summary);

    let RunSummary {
        episodes, sources, ..
    } = summary;
    match failure(episodes).or(failure(sources)) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn failure<T>(outcome: PipelineOutcome<T>) -> Option<PodcacheError> {
    match outcome {
        PipelineOutcome::Failed { error, .. } => Some(error),
        _ => None,
    }
}

fn print_summary(summary: &RunSummary) {
    match &summary.episodes {
        PipelineOutcome::Completed(c) => println!(
            "Episodes: {} received, {} inserted, {} updated, {} unchanged",
            c.received, c.inserted, c.updated, c.unchanged
        ),
        PipelineOutcome::Skipped => println!("Episodes: skipped (no URL configured)"),
        PipelineOutcome::Failed { error, .. } => eprintln!("Episodes: {}", error),
    }

    match &summary.sources {
        PipelineOutcome::Completed(c) => println!("Sources: {} stored", c.replaced),
        PipelineOutcome::Skipped => println!("Sources: skipped (no OPML URL configured)"),
        PipelineOutcome::Failed { error, .. } => eprintln!("Sources: {}", error),
    }
}

pub fn status(ctx: &AppContext) -> Result<()> {
    let dashboard = ctx.dashboard();
    print_status(&dashboard.status);
    print_urls(&dashboard.urls);
    if dashboard.sync_running {
        println!("A sync is in progress");
    }
    Ok(())
}

fn print_status(status: &StatusReport) {
    if !status.available {
        println!("Store unavailable");
        return;
    }

    println!("{} episodes, {} sources", status.episode_count, status.source_count);

    for (label, record) in [
        ("episodes", &status.last_episodes_sync),
        ("sources", &status.last_sources_sync),
    ] {
        match record {
            Some(r) if r.success => println!(
                "Last {} sync: {} ({} records)",
                label,
                r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                r.count
            ),
            Some(r) => println!(
                "Last {} sync: {} FAILED: {}",
                label,
                r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                r.error.as_deref().unwrap_or("unknown error")
            ),
            None => println!("Last {} sync: never", label),
        }
    }
}

fn print_urls(urls: &EffectiveUrls) {
    println!(
        "Episodes URL: {}",
        urls.episodes_url.as_deref().unwrap_or("(not set)")
    );
    println!("OPML URL: {}", urls.opml_url.as_deref().unwrap_or("(not set)"));
}

pub fn list_episodes(
    ctx: &AppContext,
    limit: usize,
    offset: usize,
    source: Option<String>,
) -> Result<()> {
    let page = ctx.query.list_episodes(&EpisodeParams {
        limit: Some(limit),
        offset: Some(offset),
        source,
    })?;

    if page.items.is_empty() {
        println!("No episodes");
        return Ok(());
    }

    for episode in &page.items {
        println!(
            "{} [{}] {}",
            episode.published.format("%Y-%m-%d"),
            episode.origin_title().unwrap_or("-"),
            episode.display_title()
        );
    }

    println!(
        "\nShowing {}-{} of {}",
        page.offset + 1,
        page.offset + page.items.len(),
        page.total
    );
    Ok(())
}

pub fn list_sources(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let list = ctx.query.list_sources(category)?;

    if list.items.is_empty() {
        println!("No sources");
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for source in &list.items {
        if current != Some(source.category.as_str()) {
            let heading = if source.category.is_empty() {
                "(uncategorized)"
            } else {
                source.category.as_str()
            };
            println!("{}", heading);
            current = Some(source.category.as_str());
        }
        println!("  {}\n    {}", source.title, source.xml_url);
    }

    println!("\n{} sources", list.total);
    Ok(())
}

/// Flags left out keep their stored value; with no flags, just show.
pub fn settings(
    ctx: &AppContext,
    episodes_url: Option<&str>,
    opml_url: Option<&str>,
) -> Result<()> {
    if episodes_url.is_some() || opml_url.is_some() {
        let current = ctx.store.settings()?.unwrap_or_default();
        ctx.save_settings(
            episodes_url.or(current.episodes_url.as_deref()),
            opml_url.or(current.opml_url.as_deref()),
        )?;
        println!("Settings saved");
    }

    print_urls(&ctx.dashboard().urls);
    Ok(())
}

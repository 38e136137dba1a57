use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podcache::app::AppContext;
use podcache::cli::{commands, Cli, Commands};
use podcache::config::Config;
use podcache::scheduler::parse_interval;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Serve { interval } => {
            let interval = interval
                .as_deref()
                .map(parse_interval)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            commands::serve(&ctx, interval).await?;
        }
        Commands::Sync => commands::sync(&ctx).await?,
        Commands::Status => commands::status(&ctx)?,
        Commands::Episodes {
            limit,
            offset,
            source,
        } => commands::list_episodes(&ctx, limit, offset, source)?,
        Commands::Sources { category } => commands::list_sources(&ctx, category.as_deref())?,
        Commands::Settings {
            episodes_url,
            opml_url,
        } => commands::settings(&ctx, episodes_url.as_deref(), opml_url.as_deref())?,
        Commands::Clear => commands::clear(&ctx).await?,
    }

    Ok(())
}

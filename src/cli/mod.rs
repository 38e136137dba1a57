pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::query::DEFAULT_LIMIT;

#[derive(Parser)]
#[command(name = "podcache")]
#[command(about = "Podcast episode cache synced from a feed aggregator", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/podcache/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync scheduler and HTTP API until interrupted
    Serve {
        /// Override the sync interval (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Run one sync now
    Sync,
    /// Show cache counts, last sync results and effective URLs
    Status,
    /// List cached episodes, newest first
    Episodes {
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Case-insensitive match on the podcast title
        #[arg(short, long)]
        source: Option<String>,
    },
    /// List cached podcast sources
    Sources {
        /// Case-insensitive match on the category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show or save sync URL overrides (pass "" to clear one)
    Settings {
        #[arg(long)]
        episodes_url: Option<String>,

        #[arg(long)]
        opml_url: Option<String>,
    },
    /// Clear cached episodes and sources, then sync again
    Clear,
}

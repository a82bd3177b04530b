use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

mod archive;
mod browser;
mod config;
mod downloader;
mod error;
mod fetch;
mod filter;
mod listing_cache;
mod listing_parser;
mod models;
mod orchestrator;
mod query;
mod transfer;

use browser::HttpBrowser;
use config::load_config;
use fetch::HttpFetcher;
use listing_cache::ListingCache;
use models::{MediaType, SubtitleRequest};
use orchestrator::SubtitleOrchestrator;

#[derive(Parser)]
#[command(name = "subfetch")]
#[command(about = "Download Chinese subtitles from opensubtitles.org next to your media files", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ItemArgs {
    /// IMDb id, e.g. tt1234567
    #[arg(long)]
    imdb_id: Option<String>,

    /// Title used for keyword searches
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    year: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a subtitle request event given as JSON (file path or - for stdin)
    Request {
        payload: String,
    },

    /// Download subtitles for a single media file
    Fetch {
        #[command(flatten)]
        item: ItemArgs,

        #[arg(long)]
        season: Option<u32>,

        #[arg(long)]
        episode: Option<u32>,

        /// Treat the item as a movie (keyword search is only allowed for movies)
        #[arg(long)]
        movie: bool,

        /// Media file path without its extension
        #[arg(long)]
        file: PathBuf,

        /// Media file extension, e.g. .mkv
        #[arg(long, default_value = "")]
        ext: String,
    },

    /// Print the subtitle listing without downloading anything
    Search {
        #[command(flatten)]
        item: ItemArgs,
    },
}

fn read_payload(source: &str) -> Result<SubtitleRequest> {
    let json = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };
    serde_json::from_str(&json).context("Invalid subtitle request payload")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    config.ensure_scratch_dir()?;

    let browser = HttpBrowser::new(&config);
    let fetcher = HttpFetcher::new(Duration::from_secs(config.request_timeout_secs))?;
    let orchestrator = SubtitleOrchestrator::new(
        config,
        Box::new(browser),
        Box::new(fetcher),
        ListingCache::default(),
    )?;

    match cli.command {
        Commands::Request { payload } => {
            let request = read_payload(&payload)?;
            let installed = orchestrator.handle(&request).await;
            println!("Installed subtitles from {} archive(s)", installed);
        }
        Commands::Fetch {
            item,
            season,
            episode,
            movie,
            file,
            ext,
        } => {
            let request = SubtitleRequest {
                media_type: if movie { MediaType::Movie } else { MediaType::TvShow },
                imdb_id: item.imdb_id,
                en_name: item.name,
                cn_name: None,
                year: item.year,
                season,
                episode,
                file,
                file_ext: ext,
            };
            let installed = orchestrator.handle(&request).await;
            println!("Installed subtitles from {} archive(s)", installed);
        }
        Commands::Search { item } => {
            let query = models::MediaQuery {
                identifier: item.imdb_id,
                display_name: item.name.unwrap_or_default(),
                year: item.year,
                season: None,
                episode: None,
            };
            if !query.has_identifier() && query.display_name.is_empty() {
                anyhow::bail!("Either --imdb-id or --name is required");
            }

            let page = orchestrator.search(&query).await?;
            if page.candidates.is_empty() {
                println!("No subtitles found");
                return Ok(());
            }

            println!("{:-<120}", "");
            for (i, candidate) in page.candidates.iter().enumerate() {
                println!("{}. {}", i + 1, candidate.title);
                if !candidate.season_label.is_empty() || !candidate.episode_number.is_empty() {
                    println!(
                        "   {} | Episode: {}",
                        candidate.season_label, candidate.episode_number
                    );
                }
                println!("   File: {}", candidate.description);
                println!("   Link: {}", candidate.download_link);
                println!("{:-<120}", "");
            }
            info!("Total results: {}", page.candidates.len());
        }
    }

    Ok(())
}

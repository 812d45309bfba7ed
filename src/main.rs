use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use satoru::config::{self, Config, LoggingConfig};
use satoru::{Error, Result, SatoruScraper};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the upstream base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalogue by keyword
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show metadata for an anime
    Info { anime_id: String },
    /// List an anime's episodes
    Episodes { anime_id: String },
    /// List playback servers for an episode
    Servers { episode_id: String },
    /// Resolve playable sources for an episode
    Sources { anime_id: String, episode_id: String },
    /// Look up the numeric id behind a watch-page slug
    Id { title: String },
}

fn setup_logging(logging: &LoggingConfig) -> Result<()> {
    let directive: Directive = format!("satoru={}", logging.level)
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::from_default_env().add_directive(directive);

    if logging.file {
        // stdout carries the JSON output, so logs go to a file
        let data_dir = config::data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        let file_appender = tracing_appender::rolling::daily(&data_dir, "satoru.log");

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(file_appender).with_ansi(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(|e| Error::Io(e.to_string()))?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = args.base_url {
        config.upstream.base_url = base_url;
    }

    if let Err(e) = setup_logging(&config.logging) {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    info!(base_url = %config.upstream.base_url, "Starting satoru");
    let scraper = SatoruScraper::from_config(&config)?;

    match args.command {
        Command::Search { query, page } => print_json(&scraper.search(&query, page).await?),
        Command::Info { anime_id } => print_json(&scraper.get_anime_info(&anime_id).await?),
        Command::Episodes { anime_id } => print_json(&scraper.get_episodes(&anime_id).await?),
        Command::Servers { episode_id } => {
            print_json(&scraper.get_episode_servers(&episode_id).await?)
        }
        Command::Sources {
            anime_id,
            episode_id,
        } => print_json(&scraper.get_video_sources(&anime_id, &episode_id).await?),
        Command::Id { title } => {
            let id = scraper.get_satoru_anime_id(&title).await?;
            print_json(&serde_json::json!({ "id": id }))
        }
    }
}

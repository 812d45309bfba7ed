//! Scraper for the satoru.one anime catalogue: search, metadata, episode
//! and server listings, and playable stream resolution, all behind an
//! in-process single-flight cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod resolver;
pub mod scraper;

pub use cache::Cache;
pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{Fetch, HttpFetcher, RequestHeaders};
pub use models::{
    AnimeInfo, Episode, EpisodeList, SearchPage, SearchResultItem, Server, SourceKind, VideoSource,
};
pub use resolver::{ManifestSniffer, StreamResolver};
pub use scraper::SatoruScraper;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{
    AjaxEnvelope, parse_anime_info, parse_episode_list, parse_movie_id, parse_search_page,
    parse_servers,
};
use crate::fetch::{Fetch, HttpFetcher, RequestHeaders, get_json};
use crate::models::{AnimeInfo, EpisodeList, SearchPage, Server, VideoSource};
use crate::resolver::{ManifestSniffer, StreamResolver};

/// Entry point for every upstream operation.
///
/// Base headers are fixed at construction. Calls that need a Referer derive
/// their own copy, so concurrent calls never overwrite each other's headers.
pub struct SatoruScraper {
    base_url: String,
    headers: RequestHeaders,
    ttl: Duration,
    fetcher: Arc<dyn Fetch>,
    resolver: Arc<dyn StreamResolver>,
    cache: Arc<Cache>,
}

impl SatoruScraper {
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config.upstream)?);
        Ok(Self::with_fetcher(
            &config.upstream.base_url,
            &config.upstream.user_agent,
            config.cache.ttl(),
            fetcher,
        ))
    }

    pub fn with_fetcher(
        base_url: &str,
        user_agent: &str,
        ttl: Duration,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let resolver = Arc::new(ManifestSniffer::new(fetcher.clone(), base_url.clone()));
        Self {
            base_url,
            headers: RequestHeaders::new(user_agent),
            ttl,
            fetcher,
            resolver,
            cache: Arc::new(Cache::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn StreamResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let page = page.max(1);
        let key = format!("search:{}:{}", query, page);

        self.cache
            .get_or_set(&key, self.ttl, || async {
                let mut url = format!(
                    "{}/filter?keyword={}",
                    self.base_url,
                    urlencoding::encode(query)
                );
                if page > 1 {
                    url.push_str(&format!("&page={}", page));
                }

                let html = self.fetcher.get_text(&url, &self.headers).await?;
                let results = parse_search_page(&html, page);
                debug!(query = %query, page, count = results.results.len(), "Parsed search results");
                Ok(results)
            })
            .await
    }

    pub async fn get_anime_info(&self, anime_id: &str) -> Result<AnimeInfo> {
        let key = format!("info:{}", anime_id);

        self.cache
            .get_or_set(&key, self.ttl, || async {
                let html = self.fetcher.get_text(&self.watch_url(anime_id), &self.headers).await?;
                Ok(parse_anime_info(anime_id, &html))
            })
            .await
    }

    pub async fn get_episodes(&self, anime_id: &str) -> Result<EpisodeList> {
        let key = format!("episodes:{}", anime_id);

        self.cache
            .get_or_set(&key, self.ttl, || async {
                let url = format!(
                    "{}/ajax/episode/list/{}",
                    self.base_url,
                    urlencoding::encode(anime_id)
                );
                let envelope: AjaxEnvelope = get_json(self.fetcher.as_ref(), &url, &self.headers).await?;
                let list = parse_episode_list(&envelope)?;
                debug!(anime_id = %anime_id, count = list.total_episodes, "Parsed episode list");
                Ok(list)
            })
            .await
    }

    pub async fn get_episode_servers(&self, episode_id: &str) -> Result<Vec<Server>> {
        self.servers(episode_id, &self.headers).await
    }

    /// Resolve every server of an episode concurrently. A server that fails
    /// to resolve contributes nothing; only a missing server list is fatal.
    /// Output follows server-list order.
    pub async fn get_video_sources(&self, anime_id: &str, episode_id: &str) -> Result<Vec<VideoSource>> {
        let key = format!("sources:{}:{}", anime_id, episode_id);

        self.cache
            .get_or_set(&key, self.ttl, || async {
                let headers = self.headers.with_referer(format!(
                    "{}?ep={}",
                    self.watch_url(anime_id),
                    episode_id
                ));

                let servers = self.servers(episode_id, &headers).await?;
                if servers.is_empty() {
                    return Err(Error::NotFound(format!("servers for episode {}", episode_id)));
                }

                // Dropping this future drops every in-flight resolution with it
                let results = join_all(
                    servers
                        .iter()
                        .map(|server| self.resolver.resolve(&server.id, &headers)),
                )
                .await;

                let mut sources = Vec::new();
                for (server, result) in servers.iter().zip(results) {
                    match result {
                        Ok(resolved) => sources.extend(resolved),
                        Err(e) => {
                            warn!(server_id = %server.id, error = %e, "Failed to get source from server");
                        }
                    }
                }

                info!(
                    anime_id = %anime_id,
                    episode_id = %episode_id,
                    count = sources.len(),
                    "Resolved video sources"
                );
                Ok(sources)
            })
            .await
    }

    /// Numeric upstream id for a watch-page slug. Not cached.
    pub async fn get_satoru_anime_id(&self, title: &str) -> Result<u64> {
        let html = self.fetcher.get_text(&self.watch_url(title), &self.headers).await?;
        let id = parse_movie_id(&html)?;
        debug!(title = %title, id, "Found anime id");
        Ok(id)
    }

    async fn servers(&self, episode_id: &str, headers: &RequestHeaders) -> Result<Vec<Server>> {
        let key = format!("servers:{}", episode_id);

        self.cache
            .get_or_set(&key, self.ttl, || async {
                let url = format!(
                    "{}/ajax/episode/servers?episodeId={}",
                    self.base_url,
                    urlencoding::encode(episode_id)
                );
                let envelope: AjaxEnvelope = get_json(self.fetcher.as_ref(), &url, headers).await?;
                parse_servers(&envelope)
            })
            .await
    }

    fn watch_url(&self, anime_id: &str) -> String {
        format!("{}/watch/{}", self.base_url, anime_id)
    }
}

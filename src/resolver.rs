//! Turns a playback-server id into playable sources.
//!
//! The shipped [`ManifestSniffer`] tries, in order: a direct `.m3u8` link,
//! a quoted `master.m3u8` URL in the embed page's static HTML, and finally
//! the embed page itself. Each stage is terminal; nothing is retried.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fetch::{Fetch, RequestHeaders};
use crate::models::VideoSource;

#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, server_id: &str, headers: &RequestHeaders) -> Result<Vec<VideoSource>>;
}

// Either quote style, closed by the same quote character
static MASTER_MANIFEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"([^"']*?master\.m3u8[^"']*?)"|'([^"']*?master\.m3u8[^"']*?)'"#).unwrap()
});

pub struct ManifestSniffer {
    fetcher: Arc<dyn Fetch>,
    base_url: String,
}

impl ManifestSniffer {
    pub fn new(fetcher: Arc<dyn Fetch>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StreamResolver for ManifestSniffer {
    async fn resolve(&self, server_id: &str, headers: &RequestHeaders) -> Result<Vec<VideoSource>> {
        let url = format!(
            "{}/ajax/episode/sources?id={}",
            self.base_url,
            urlencoding::encode(server_id)
        );
        let body = self.fetcher.get_text(&url, headers).await?;
        let link = source_link(&body).ok_or_else(|| Error::Resolution("no link".to_string()))?;

        if link.contains(".m3u8") {
            debug!(server_id = %server_id, "Direct HLS link");
            return Ok(vec![VideoSource::hls(link)]);
        }

        // A refused embed page is still a usable embed
        let page = match self.fetcher.get_text(&link, headers).await {
            Ok(page) => page,
            Err(Error::HttpStatus { status, .. }) => {
                debug!(server_id = %server_id, status, "Embed page refused, using link as embed");
                return Ok(vec![VideoSource::embed(link)]);
            }
            Err(e) => return Err(e),
        };
        if let Some(manifest) = find_master_manifest(&page) {
            debug!(server_id = %server_id, manifest = %manifest, "Found manifest in embed page");
            return Ok(vec![VideoSource::hls(manifest)]);
        }

        debug!(server_id = %server_id, link = %link, "Falling back to embed");
        Ok(vec![VideoSource::embed(link)])
    }
}

/// Non-empty `link` string from the sources endpoint. Anything else,
/// including `null` or a non-JSON body, counts as no link.
fn source_link(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("link")
        .and_then(Value::as_str)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}

/// First quoted string containing `master.m3u8`.
pub fn find_master_manifest(page: &str) -> Option<&str> {
    MASTER_MANIFEST
        .captures(page)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;

    const BASE: &str = "https://satoru.one";

    fn sources_url(id: &str) -> String {
        format!("{}/ajax/episode/sources?id={}", BASE, id)
    }

    fn sniffer(fetcher: MockFetcher) -> (Arc<MockFetcher>, ManifestSniffer) {
        let fetcher = Arc::new(fetcher);
        let resolver = ManifestSniffer::new(fetcher.clone(), BASE);
        (fetcher, resolver)
    }

    #[tokio::test]
    async fn test_direct_hls_link() {
        let link = "https://cdn.example/stream/index.m3u8";
        let (fetcher, resolver) = sniffer(
            MockFetcher::new().route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, link)),
        );

        let sources = resolver.resolve("9", &RequestHeaders::new("ua")).await.unwrap();
        assert_eq!(sources, vec![VideoSource::hls(link)]);
        assert!(sources[0].is_hls());
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manifest_found_in_embed_page() {
        let embed = "https://embed.example/e/abc";
        let (_, resolver) = sniffer(
            MockFetcher::new()
                .route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, embed))
                .route(
                    embed,
                    "<script>var src = 'https://cdn.example/master.m3u8?x=1'; load(src);</script>",
                ),
        );

        let sources = resolver.resolve("9", &RequestHeaders::new("ua")).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://cdn.example/master.m3u8?x=1");
        assert!(sources[0].is_hls());
        assert_eq!(sources[0].quality, "auto");
    }

    #[tokio::test]
    async fn test_embed_fallback() {
        let embed = "https://embed.example/e/abc";
        let (_, resolver) = sniffer(
            MockFetcher::new()
                .route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, embed))
                .route(embed, "<html><video id='player'></video></html>"),
        );

        let sources = resolver.resolve("9", &RequestHeaders::new("ua")).await.unwrap();
        assert_eq!(sources, vec![VideoSource::embed(embed)]);
        assert!(sources[0].is_embed());
    }

    #[tokio::test]
    async fn test_missing_link_is_resolution_error() {
        let (_, resolver) = sniffer(MockFetcher::new().route(&sources_url("9"), r#"{"type":"iframe"}"#));

        let result = resolver.resolve("9", &RequestHeaders::new("ua")).await;
        assert!(matches!(result, Err(Error::Resolution(_))));
    }

    #[tokio::test]
    async fn test_refused_embed_page_falls_back_to_embed() {
        let embed = "https://embed.example/e/blocked";
        let (_, resolver) = sniffer(
            MockFetcher::new()
                .route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, embed))
                .fail(
                    embed,
                    Error::HttpStatus {
                        status: 403,
                        url: embed.to_string(),
                    },
                ),
        );

        let sources = resolver.resolve("9", &RequestHeaders::new("ua")).await.unwrap();
        assert_eq!(sources, vec![VideoSource::embed(embed)]);
    }

    #[tokio::test]
    async fn test_embed_transport_failure_propagates() {
        let embed = "https://embed.example/e/down";
        let (_, resolver) = sniffer(
            MockFetcher::new()
                .route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, embed))
                .fail(embed, Error::Network("connection refused".to_string())),
        );

        let result = resolver.resolve("9", &RequestHeaders::new("ua")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_null_or_non_object_body_is_resolution_error() {
        for body in ["null", "[]", "\"link\"", r#"{"link":null}"#, r#"{"link":""}"#, "<html></html>"] {
            let (_, resolver) = sniffer(MockFetcher::new().route(&sources_url("9"), body));

            let result = resolver.resolve("9", &RequestHeaders::new("ua")).await;
            assert!(matches!(result, Err(Error::Resolution(_))), "body {}", body);
        }
    }

    #[tokio::test]
    async fn test_sources_endpoint_failure_propagates() {
        let (_, resolver) = sniffer(MockFetcher::new());

        let result = resolver.resolve("9", &RequestHeaders::new("ua")).await;
        assert!(matches!(result, Err(Error::HttpStatus { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_headers_reach_every_request() {
        let embed = "https://embed.example/e/abc";
        let (fetcher, resolver) = sniffer(
            MockFetcher::new()
                .route(&sources_url("9"), format!(r#"{{"link":"{}"}}"#, embed))
                .route(embed, ""),
        );
        let headers = RequestHeaders::new("ua").with_referer("https://satoru.one/watch/1?ep=2");

        resolver.resolve("9", &headers).await.unwrap();
        assert_eq!(
            fetcher.referers(),
            vec![headers.referer.clone(), headers.referer.clone()]
        );
    }

    #[test]
    fn test_find_master_manifest() {
        assert_eq!(
            find_master_manifest(r#"file: "https://a.example/hls/MASTER.m3u8", x: 'y'"#),
            Some("https://a.example/hls/MASTER.m3u8")
        );
        assert_eq!(
            find_master_manifest("<a href='/index.m3u8'>no master here</a>"),
            None
        );
    }
}

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

/// Headers for a single logical request. Built per call and never shared
/// mutably, so overlapping calls cannot see each other's Referer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub referer: Option<String>,
}

impl RequestHeaders {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            referer: None,
        }
    }

    pub fn with_referer(&self, referer: impl Into<String>) -> Self {
        Self {
            user_agent: self.user_agent.clone(),
            referer: Some(referer.into()),
        }
    }

    fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(header::USER_AGENT, value);
        }
        if let Some(referer) = self.referer.as_deref() {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(header::REFERER, value);
            }
        }
        headers
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the body. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str, headers: &RequestHeaders) -> Result<String>;
}

/// GET a JSON endpoint and decode the body.
pub async fn get_json<T: DeserializeOwned>(
    fetcher: &dyn Fetch,
    url: &str,
    headers: &RequestHeaders,
) -> Result<T> {
    let body = fetcher.get_text(url, headers).await?;
    Ok(serde_json::from_str(&body)?)
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str, headers: &RequestHeaders) -> Result<String> {
        debug!(url = %url, referer = ?headers.referer, "Fetching");

        let response = self
            .client
            .get(url)
            .headers(headers.to_header_map())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Errors are `Clone` so one failed computation can be shared by every
/// caller waiting on the same cache key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(String),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unexpected upstream data: {0}")]
    UpstreamData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Stream resolution failed: {0}")]
    Resolution(String),

    #[error("Cached value has the wrong shape: {0}")]
    CacheValue(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigParse(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::ConfigSerialize(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::HttpStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => Error::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::UpstreamData(format!("invalid JSON: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnimeInfo {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rating: String,
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub japanese_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeList {
    pub episodes: Vec<Episode>,
    pub total_episodes: usize,
}

impl EpisodeList {
    pub fn new(episodes: Vec<Episode>) -> Self {
        let total_episodes = episodes.len();
        Self {
            episodes,
            total_episodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Directly playable HLS manifest
    Hls,
    /// Third-party page meant to be framed
    Embed,
}

/// On the wire the kind is two flags, `isHLS` and `isEmbed`, exactly one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VideoSourceWire", try_from = "VideoSourceWire")]
pub struct VideoSource {
    pub url: String,
    pub quality: String,
    pub kind: SourceKind,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSourceWire {
    url: String,
    quality: String,
    #[serde(rename = "isHLS", default)]
    is_hls: bool,
    #[serde(default)]
    is_embed: bool,
}

impl From<VideoSource> for VideoSourceWire {
    fn from(source: VideoSource) -> Self {
        Self {
            is_hls: source.is_hls(),
            is_embed: source.is_embed(),
            url: source.url,
            quality: source.quality,
        }
    }
}

impl TryFrom<VideoSourceWire> for VideoSource {
    type Error = String;

    fn try_from(wire: VideoSourceWire) -> Result<Self, Self::Error> {
        let kind = match (wire.is_hls, wire.is_embed) {
            (true, false) => SourceKind::Hls,
            (false, true) => SourceKind::Embed,
            _ => return Err("exactly one of isHLS and isEmbed must be set".to_string()),
        };
        Ok(Self {
            url: wire.url,
            quality: wire.quality,
            kind,
        })
    }
}

impl VideoSource {
    pub fn hls(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: "auto".to_string(),
            kind: SourceKind::Hls,
        }
    }

    pub fn embed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: "auto".to_string(),
            kind: SourceKind::Embed,
        }
    }

    pub fn is_hls(&self) -> bool {
        self.kind == SourceKind::Hls
    }

    pub fn is_embed(&self) -> bool {
        self.kind == SourceKind::Embed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: u64,
    /// URL slug derived from the display title, not the title itself
    pub title: String,
    pub image_url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<SearchResultItem>,
    pub current_page: u32,
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

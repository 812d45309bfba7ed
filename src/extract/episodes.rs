use scraper::Html;
use serde::Deserialize;

use super::{Rule, leading_int, selector};
use crate::error::{Error, Result};
use crate::models::{Episode, EpisodeList, Server};

/// `{status, html}` wrapper returned by the `/ajax/episode/*` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AjaxEnvelope {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub html: String,
}

const EPISODE_ITEM: &str = ".ep-item";
const EPISODE_ID: Rule = Rule::own_attr("data-id");
const EPISODE_NUMBER: Rule = Rule::own_attr("data-number");
const EPISODE_TITLE: Rule = Rule::attr(".ep-name", "title");
const EPISODE_JNAME: Rule = Rule::attr(".ep-name", "data-jname");

const SERVER_ITEM: &str = ".server-item";
const SERVER_ID: Rule = Rule::own_attr("data-id");
const SERVER_NAME: Rule = Rule::text("a");
const SERVER_KIND: Rule = Rule::own_attr("data-type");

pub fn parse_episode_list(envelope: &AjaxEnvelope) -> Result<EpisodeList> {
    if !envelope.status || envelope.html.is_empty() {
        return Err(Error::UpstreamData("episode list unavailable".to_string()));
    }

    let fragment = Html::parse_fragment(&envelope.html);
    let episodes = fragment
        .select(&selector(EPISODE_ITEM))
        .map(|item| Episode {
            id: EPISODE_ID.first_or_default(item),
            number: EPISODE_NUMBER
                .first(item)
                .and_then(|n| leading_int(&n))
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            title: EPISODE_TITLE.first_or_default(item),
            japanese_title: EPISODE_JNAME.first_or_default(item),
        })
        .collect();

    Ok(EpisodeList::new(episodes))
}

/// Servers without a `data-id` are dropped.
pub fn parse_servers(envelope: &AjaxEnvelope) -> Result<Vec<Server>> {
    if !envelope.status {
        return Err(Error::UpstreamData("server list unavailable".to_string()));
    }

    let fragment = Html::parse_fragment(&envelope.html);
    let servers = fragment
        .select(&selector(SERVER_ITEM))
        .filter_map(|item| {
            let id = SERVER_ID.first(item).filter(|id| !id.is_empty())?;
            Some(Server {
                id,
                name: SERVER_NAME.first_or_default(item),
                kind: SERVER_KIND.first_or_default(item),
            })
        })
        .collect();

    Ok(servers)
}

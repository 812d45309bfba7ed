use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::Rule;
use crate::error::{Error, Result};
use crate::models::AnimeInfo;

const TITLE: Rule = Rule::text(".anime-info h1");
const IMAGE: Rule = Rule::attr(".anime-info img", "src");
const DESCRIPTION: Rule = Rule::text(".anime-info .description");
const GENRES: Rule = Rule::text(".anime-info .genres a");
const STATUS: Rule = Rule::text(".anime-info .status");
const KIND: Rule = Rule::text(".anime-info .type");
const RATING: Rule = Rule::text(".anime-info .rating");
const RELEASED: Rule = Rule::text(".anime-info .released");

static MOVIE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"const movieId = (\d+);").unwrap());

/// Parse the `/watch/{id}` page. Missing fields come back empty.
pub fn parse_anime_info(id: &str, html: &str) -> AnimeInfo {
    let document = Html::parse_document(html);
    let root = document.root_element();

    AnimeInfo {
        id: id.to_string(),
        title: TITLE.first_or_default(root),
        image_url: IMAGE.first_or_default(root),
        description: DESCRIPTION.first_or_default(root),
        genres: GENRES.all(root),
        status: STATUS.first_or_default(root),
        kind: KIND.first_or_default(root),
        rating: RATING.first_or_default(root),
        release_date: RELEASED.first_or_default(root),
    }
}

/// Numeric id the watch page assigns in its inline script.
pub fn parse_movie_id(html: &str) -> Result<u64> {
    MOVIE_ID
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| Error::NotFound("movieId assignment in watch page".to_string()))
}

use scraper::{ElementRef, Html};

use super::{Rule, leading_int, selector, slugify};
use crate::models::{SearchPage, SearchResultItem};

const RESULT_ROW: &str = ".flw-item";
const NAME: Rule = Rule::text(".film-name .dynamic-name");
const POSTER_ID: Rule = Rule::attr(".film-poster-ahref", "data-id");
const POSTER_LAZY_SRC: Rule = Rule::attr(".film-poster img", "data-src");
const POSTER_SRC: Rule = Rule::attr(".film-poster img", "src");
const POSTER_HREF: Rule = Rule::attr(".film-poster-ahref", "href");
const KIND: Rule = Rule::text(".fd-infor .fdi-item");

const PAGINATION_LINK: &str = ".pre-pagination .page-link";
const TOTAL_RESULTS: Rule = Rule::text(".total-results");

/// Parse a `/filter` results page. Rows lacking a title, image or
/// non-zero id are skipped.
pub fn parse_search_page(html: &str, page: u32) -> SearchPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let results = document
        .select(&selector(RESULT_ROW))
        .filter_map(parse_row)
        .collect();

    let has_next_page = document.select(&selector(PAGINATION_LINK)).next().is_some();
    let total_results = TOTAL_RESULTS.first(root).and_then(|t| leading_int(&t));

    SearchPage {
        results,
        current_page: page,
        has_next_page,
        total_results,
    }
}

fn parse_row(row: ElementRef<'_>) -> Option<SearchResultItem> {
    let title = NAME.first(row).filter(|t| !t.is_empty())?;
    let id = POSTER_ID
        .first(row)
        .and_then(|id| leading_int(&id))
        .filter(|id| *id != 0)?;
    let image_url = [POSTER_LAZY_SRC, POSTER_SRC, POSTER_HREF]
        .iter()
        .find_map(|rule| rule.first(row).filter(|v| !v.is_empty()))?;

    Some(SearchResultItem {
        id,
        title: slugify(&title),
        image_url,
        kind: KIND.first_or_default(row),
    })
}

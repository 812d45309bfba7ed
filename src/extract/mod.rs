//! Typed extraction from upstream pages and AJAX fragments.
//!
//! Each entity is described by a handful of [`Rule`]s (selector plus what to
//! pick from the matched node). A rule that matches nothing yields the
//! field's default, so one malformed item never aborts a whole list.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

mod anime;
mod episodes;
mod search;

pub use anime::{parse_anime_info, parse_movie_id};
pub use episodes::{AjaxEnvelope, parse_episode_list, parse_servers};
pub use search::parse_search_page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Trimmed text content
    Text,
    /// Trimmed attribute value
    Attr(&'static str),
}

/// One selection rule. `css: None` targets the scope element itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub css: Option<&'static str>,
    pub pick: Pick,
}

impl Rule {
    pub const fn text(css: &'static str) -> Self {
        Self {
            css: Some(css),
            pick: Pick::Text,
        }
    }

    pub const fn attr(css: &'static str, name: &'static str) -> Self {
        Self {
            css: Some(css),
            pick: Pick::Attr(name),
        }
    }

    pub const fn own_attr(name: &'static str) -> Self {
        Self {
            css: None,
            pick: Pick::Attr(name),
        }
    }

    /// Value from the first matching node, if any node matches and carries it.
    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        match self.css {
            None => self.pick_from(scope),
            Some(css) => scope.select(&selector(css)).find_map(|el| self.pick_from(el)),
        }
    }

    pub fn first_or_default(&self, scope: ElementRef<'_>) -> String {
        self.first(scope).unwrap_or_default()
    }

    /// Values from every matching node, in document order.
    pub fn all(&self, scope: ElementRef<'_>) -> Vec<String> {
        match self.css {
            None => self.pick_from(scope).into_iter().collect(),
            Some(css) => scope
                .select(&selector(css))
                .filter_map(|el| self.pick_from(el))
                .collect(),
        }
    }

    fn pick_from(&self, el: ElementRef<'_>) -> Option<String> {
        match self.pick {
            Pick::Text => Some(el.text().collect::<String>().trim().to_string()),
            Pick::Attr(name) => el.value().attr(name).map(|v| v.trim().to_string()),
        }
    }
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid built-in selector")
}

/// Leading decimal digits of `s` (after whitespace), like a lenient integer
/// parse: `"12 eps"` is 12, `"abc"` is `None`.
pub fn leading_int(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Lossy URL slug for a display title.
/// "Attack on Titan: Final Season!" -> "attack-on-titan-final-season"
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    let hyphenated = WHITESPACE_RUNS.replace_all(&stripped, "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Attack on Titan: Final Season!"),
            "attack-on-titan-final-season"
        );
        assert_eq!(slugify("Steins;Gate 0"), "steinsgate-0");
        assert_eq!(slugify("  Re:Zero -- Starting   Life  "), "rezero-starting-life");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for title in ["Attack on Titan: Final Season!", "Dr. STONE - New World", "86"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("12"), Some(12));
        assert_eq!(leading_int(" 7 eps"), Some(7));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int(""), None);
    }

    #[test]
    fn test_rule_defaults_on_miss() {
        let doc = Html::parse_fragment(r#"<div class="a" data-x=" 1 "><span>hi</span></div>"#);
        let root = doc.root_element();

        assert_eq!(Rule::text("span").first_or_default(root), "hi");
        assert_eq!(Rule::attr(".a", "data-x").first(root).as_deref(), Some("1"));
        assert_eq!(Rule::text(".missing").first_or_default(root), "");
        assert_eq!(Rule::attr(".a", "data-y").first(root), None);
        assert!(Rule::text("p").all(root).is_empty());
    }

    #[test]
    fn test_rule_first_skips_nodes_without_attr() {
        let doc = Html::parse_fragment(r#"<img class="p"><img class="p" src="b.jpg">"#);
        let rule = Rule::attr("img.p", "src");
        assert_eq!(rule.first(doc.root_element()).as_deref(), Some("b.jpg"));
    }
}

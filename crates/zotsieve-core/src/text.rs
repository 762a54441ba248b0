//! Title cleanup: produces the canonical string that similarity is computed on.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static INLINE_DOLLAR_MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$.*?\$").expect("valid dollar math regex"));
static INLINE_PAREN_MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\\(.*?\\\)").expect("valid paren math regex"));
static NAMESPACED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<[a-z][\w.-]*:[^>]+>.*?</[a-z][\w.-]*:[^>]+>")
        .expect("valid namespaced block regex")
});
static NAMESPACED_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?[a-z][\w.-]*:[^>]+>").expect("valid namespaced tag regex")
});
static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static HYPHEN_SPACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-\s*").expect("valid hyphen spacing regex"));
static TRAILING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,;:!?]+(\s|$)").expect("valid trailing punctuation regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const LEADING_ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Remove HTML/XML tags (keeping their text) and inline TeX math.
pub fn strip_markup(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let plain: String = fragment.root_element().text().collect();

    let plain = INLINE_DOLLAR_MATH_RE.replace_all(&plain, "");
    let plain = INLINE_PAREN_MATH_RE.replace_all(&plain, "");
    plain.trim().to_string()
}

fn strip_namespaced_markup(text: &str) -> String {
    let text = NAMESPACED_BLOCK_RE.replace_all(text, "");
    NAMESPACED_TAG_RE.replace_all(&text, "").into_owned()
}

fn is_dash_variant(c: char) -> bool {
    matches!(c, '\u{2010}'..='\u{2014}' | '\u{2212}')
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Full title cleanup pipeline, repeated until the output is stable.
///
/// A single pass can surface new markup: a decoded `&lt;` next to a letter
/// only parses as a tag on the following pass. Every pass either shrinks
/// the string or leaves it unchanged, so the loop ends.
pub fn clean_title(raw: &str) -> String {
    let mut current = clean_title_once(raw);
    loop {
        let next = clean_title_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Order matters: markup goes first so that entity-escaped tags surface
/// before the tag passes run.
fn clean_title_once(raw: &str) -> String {
    let title = strip_markup(raw);
    let title = strip_namespaced_markup(&title);
    let title = ANY_TAG_RE.replace_all(&title, "");
    let title = title.replace(is_dash_variant, "-");
    let title = HYPHEN_SPACING_RE.replace_all(&title, "-");
    let title = TRAILING_PUNCT_RE.replace_all(&title, "$1");
    // Dropping punctuation can expose new space next to a hyphen ("x -. y").
    let title = HYPHEN_SPACING_RE.replace_all(&title, "-");
    collapse_whitespace(&title)
}

/// Drop a single leading "the", "a" or "an".
pub fn strip_leading_article(text: &str) -> String {
    let mut words = text.split_whitespace();
    match words.next() {
        Some(first) if LEADING_ARTICLES.contains(&first.to_lowercase().as_str()) => {
            words.collect::<Vec<_>>().join(" ")
        }
        _ => text.to_string(),
    }
}

/// Search string for a title: cleaned, article-stripped, cut to
/// `query_length` characters.
pub fn build_title_query(title: &str, query_length: usize) -> String {
    let cleaned = strip_leading_article(&clean_title(title));
    let truncated: String = cleaned.chars().take(query_length).collect();
    truncated.trim().to_string()
}

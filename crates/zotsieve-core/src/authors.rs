//! Creator keys: "lastname + initials", cheap enough to intersect and safe
//! to send as a search query.

use std::collections::BTreeSet;

use deunicode::deunicode_with_tofu;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::Creator;

/// Closest ASCII spelling of `text`.
///
/// Combining marks are dropped first so decomposed input ("A" + ring)
/// spells the same as precomposed; characters with no ASCII reading
/// vanish instead of leaving a placeholder.
pub fn transliterate(text: &str) -> String {
    let unmarked: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    deunicode_with_tofu(&unmarked, "")
}

/// `"Ångström, J."` and `"angstrom j"` both become `"j a"`: the last token
/// is kept whole and every earlier token is reduced to its initial.
pub fn normalize_author_key(raw: &str) -> String {
    let lowered = transliterate(raw).to_lowercase();
    let stripped: String = lowered
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let parts: Vec<&str> = stripped.split_whitespace().collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            let initials: Vec<String> = rest
                .iter()
                .filter_map(|p| p.chars().next())
                .map(String::from)
                .collect();
            format!("{last} {}", initials.join(" "))
        }
        _ => stripped,
    }
}

fn surname_keys(creators: &[Creator]) -> impl Iterator<Item = String> + '_ {
    creators
        .iter()
        .filter_map(Creator::surname)
        .map(normalize_author_key)
        .filter(|key| !key.is_empty())
}

/// Set of surname keys; creators without a surname are skipped.
pub fn extract_author_keys(creators: &[Creator]) -> BTreeSet<String> {
    surname_keys(creators).collect()
}

/// Space-joined surname keys in creator order, used as the fallback query.
pub fn creator_query(creators: &[Creator]) -> String {
    surname_keys(creators).collect::<Vec<_>>().join(" ")
}

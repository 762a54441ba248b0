use crate::authors::extract_author_keys;
use crate::model::RawMetadata;

pub const DOI_POINTS: u32 = 5;
pub const DATE_POINTS: u32 = 2;
pub const TYPE_POINTS: u32 = 1;
pub const CREATOR_POINTS: u32 = 2;

/// Highest corroboration score any pair can reach.
pub const MAX_METADATA_SCORE: u32 = DOI_POINTS + DATE_POINTS + TYPE_POINTS + CREATOR_POINTS;

/// Trimmed, case-insensitive identifier equality; absent or blank never matches.
pub fn identifiers_match(left: Option<&str>, right: Option<&str>) -> bool {
    match (left.map(str::trim), right.map(str::trim)) {
        (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => l.to_lowercase() == r.to_lowercase(),
        _ => false,
    }
}

/// Corroboration score between a candidate and the target, `0..=10`.
///
/// The creator overlap ratio is taken against the target's creators only,
/// so swapping arguments can change that term.
pub fn score_metadata(candidate: &RawMetadata, target: &RawMetadata) -> u32 {
    let mut score = 0;

    if identifiers_match(candidate.doi.as_deref(), target.doi.as_deref()) {
        score += DOI_POINTS;
    }

    if let (Some(left), Some(right)) = (&candidate.date, &target.date)
        && left == right
    {
        score += DATE_POINTS;
    }

    if candidate.item_type == target.item_type {
        score += TYPE_POINTS;
    }

    let candidate_keys = extract_author_keys(&candidate.creators);
    let target_keys = extract_author_keys(&target.creators);
    let shared = candidate_keys.intersection(&target_keys).count();
    let overlap = shared as f64 / target_keys.len().max(1) as f64;
    if shared >= 2 || overlap >= 0.5 {
        score += CREATOR_POINTS;
    }

    score
}

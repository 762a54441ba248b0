use serde::{Deserialize, Serialize};

use crate::model::{EXACT_IDENTIFIER_SCORE, MatchCandidate, RawCandidate, RawMetadata};
use crate::scoring::{identifiers_match, score_metadata};
use crate::similarity::title_similarity;
use crate::text::clean_title;

/// Acceptance thresholds for non-identifier matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    /// Similarity that is enough on its own.
    pub strong_similarity: f64,
    /// Lower similarity accepted when metadata corroborates.
    pub corroborated_similarity: f64,
    /// Metadata score required alongside `corroborated_similarity`.
    pub corroborating_score: u32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            strong_similarity: 0.80,
            corroborated_similarity: 0.76,
            corroborating_score: 5,
        }
    }
}

impl MatchThresholds {
    pub fn accepts(&self, similarity: f64, score: u32) -> bool {
        similarity >= self.strong_similarity
            || (similarity >= self.corroborated_similarity && score >= self.corroborating_score)
    }
}

/// Decide whether `candidate` is the same work as `target`.
///
/// `cleaned_target_title` must already have gone through [`clean_title`].
pub fn evaluate(
    candidate: &RawCandidate,
    cleaned_target_title: &str,
    target: &RawMetadata,
    thresholds: &MatchThresholds,
) -> Option<MatchCandidate> {
    let data = &candidate.data;

    if identifiers_match(data.doi.as_deref(), target.doi.as_deref())
        || identifiers_match(data.issn.as_deref(), target.issn.as_deref())
    {
        return Some(MatchCandidate::from_candidate(candidate, 1.0, EXACT_IDENTIFIER_SCORE));
    }

    let similarity = title_similarity(cleaned_target_title, &clean_title(&data.title));
    let score = score_metadata(data, target);

    thresholds
        .accepts(similarity, score)
        .then(|| MatchCandidate::from_candidate(candidate, similarity, score))
}

//! Query strategy: title prefix first, creator names as fallback, shorter
//! prefixes on retry.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::authors::creator_query;
use crate::evaluate::{MatchThresholds, evaluate};
use crate::model::{MatchCandidate, RawMetadata};
use crate::provider::SearchProvider;
use crate::text::{build_title_query, clean_title};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub thresholds: MatchThresholds,
    /// Title prefix lengths for [`Matcher::adaptive_match`], tried in order.
    pub query_lengths: Vec<usize>,
    /// Maximum candidates requested per search.
    pub search_limit: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            query_lengths: vec![80, 40, 20],
            search_limit: 15,
        }
    }
}

/// A search that could not be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub query: String,
    pub reason: String,
}

/// Outcome of matching one target item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    /// Accepted candidates, best first.
    pub matches: Vec<MatchCandidate>,
    /// Searches that failed; treated as having returned nothing.
    pub failures: Vec<SearchFailure>,
    /// Candidates returned by the provider across all searches.
    pub candidates_seen: usize,
}

impl MatchReport {
    pub fn is_duplicate(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn best(&self) -> Option<&MatchCandidate> {
        self.matches.first()
    }

    fn absorb(&mut self, other: MatchReport) {
        self.matches.extend(other.matches);
        self.failures.extend(other.failures);
        self.candidates_seen += other.candidates_seen;
    }
}

/// Descending by score, then similarity.
pub fn rank_matches(matches: &mut [MatchCandidate]) {
    matches.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => b.similarity.total_cmp(&a.similarity),
        other => other,
    });
}

pub struct Matcher<P> {
    provider: P,
    settings: MatchSettings,
}

impl<P: SearchProvider> Matcher<P> {
    pub fn new(provider: P, settings: MatchSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    async fn run_query(
        &self,
        query: &str,
        cleaned_title: &str,
        target: &RawMetadata,
        report: &mut MatchReport,
    ) {
        debug!(provider = self.provider.name(), query, "searching");
        let candidates = match self.provider.search(query, self.settings.search_limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(provider = self.provider.name(), query, "search failed: {e}");
                report.failures.push(SearchFailure {
                    query: query.to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        report.candidates_seen += candidates.len();
        report.matches.extend(
            candidates
                .iter()
                .filter_map(|c| evaluate(c, cleaned_title, target, &self.settings.thresholds)),
        );
    }

    /// One round: title prefix of `query_length` characters, then the
    /// creator fallback if the title search accepted nothing.
    pub async fn find_matches(
        &self,
        title: &str,
        metadata: &RawMetadata,
        query_length: usize,
    ) -> MatchReport {
        let cleaned_title = clean_title(title);
        let query = build_title_query(title, query_length);
        let mut report = MatchReport::default();

        if !query.is_empty() {
            self.run_query(&query, &cleaned_title, metadata, &mut report).await;
        }

        if report.matches.is_empty() {
            let fallback = creator_query(&metadata.creators);
            if !fallback.is_empty() {
                debug!(query = %fallback, "no title matches, searching by creators");
                self.run_query(&fallback, &cleaned_title, metadata, &mut report).await;
            }
        }

        rank_matches(&mut report.matches);
        report
    }

    /// Retry [`Self::find_matches`] with each configured prefix length and
    /// stop at the first round that accepts something.
    pub async fn adaptive_match(&self, title: &str, metadata: &RawMetadata) -> MatchReport {
        let mut combined = MatchReport::default();

        for &length in &self.settings.query_lengths {
            let round = self.find_matches(title, metadata, length).await;
            if round.is_duplicate() {
                info!(
                    title,
                    query_length = length,
                    matches = round.matches.len(),
                    "found existing item"
                );
                combined.absorb(round);
                return combined;
            }
            combined.absorb(round);
        }

        combined
    }
}

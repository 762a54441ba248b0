//! Sieves a batch of source items: each is either already in the library,
//! new, or skipped before any search happens.

use std::collections::HashSet;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::ingest::SourceItem;
use crate::matcher::{MatchReport, Matcher};
use crate::provider::SearchProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingTitle,
    RepeatedInBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "reason")]
pub enum Verdict {
    Duplicate,
    Novel,
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub item: SourceItem,
    pub verdict: Verdict,
    pub report: MatchReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SieveSummary {
    pub total: usize,
    pub duplicates: usize,
    pub novel: usize,
    pub skipped: usize,
    /// Novel items whose searches partly failed; they may be false negatives.
    pub novel_with_failures: usize,
}

impl SieveSummary {
    pub fn from_classifications(results: &[Classification]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.verdict {
                Verdict::Duplicate => summary.duplicates += 1,
                Verdict::Novel => {
                    summary.novel += 1;
                    if !result.report.failures.is_empty() {
                        summary.novel_with_failures += 1;
                    }
                }
                Verdict::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Raw records of the items judged new, ready to forward for insertion.
pub fn novel_items(results: &[Classification]) -> Vec<Value> {
    results
        .iter()
        .filter(|r| r.verdict == Verdict::Novel)
        .map(|r| r.item.raw.clone())
        .collect()
}

pub struct Sieve<P> {
    matcher: Matcher<P>,
    concurrency: usize,
}

impl<P: SearchProvider> Sieve<P> {
    pub fn new(matcher: Matcher<P>, concurrency: usize) -> Self {
        Self {
            matcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn matcher(&self) -> &Matcher<P> {
        &self.matcher
    }

    /// Match one item. Items whose searches failed count as novel.
    pub async fn classify(&self, item: SourceItem) -> Classification {
        let report = self
            .matcher
            .adaptive_match(&item.metadata.title, &item.metadata)
            .await;

        let verdict = if report.is_duplicate() {
            Verdict::Duplicate
        } else {
            if !report.failures.is_empty() {
                warn!(
                    title = %item.metadata.title,
                    failures = report.failures.len(),
                    "treating item as new after failed searches"
                );
            }
            Verdict::Novel
        };

        Classification {
            item,
            verdict,
            report,
        }
    }

    /// Classify every item, at most `concurrency` at a time. Results keep
    /// the input order.
    pub async fn classify_all(&self, items: Vec<SourceItem>) -> Vec<Classification> {
        let mut seen_titles = HashSet::new();
        let mut pending = Vec::with_capacity(items.len());

        for item in items {
            let key = item.metadata.title.trim().to_lowercase();
            let skip = if key.is_empty() {
                warn!("skipping item without a title");
                Some(SkipReason::MissingTitle)
            } else if !seen_titles.insert(key) {
                info!(title = %item.metadata.title, "skipping repeated title");
                Some(SkipReason::RepeatedInBatch)
            } else {
                None
            };
            pending.push((item, skip));
        }

        futures::stream::iter(pending)
            .map(|(item, skip)| async move {
                match skip {
                    Some(reason) => Classification {
                        item,
                        verdict: Verdict::Skipped(reason),
                        report: MatchReport::default(),
                    },
                    None => self.classify(item).await,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{Result, SieveError};
    use crate::matcher::MatchSettings;
    use crate::model::{RawCandidate, RawMetadata};

    /// Library containing a single known title; fails on "offline" queries.
    struct OneItemLibrary {
        title: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for OneItemLibrary {
        fn name(&self) -> &str {
            "one-item"
        }

        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<RawCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.starts_with("Offline") {
                return Err(SieveError::search("one-item", "timeout"));
            }
            if self.title.starts_with(query) {
                return Ok(vec![RawCandidate::new("EXISTING", RawMetadata::new(self.title))]);
            }
            Ok(Vec::new())
        }
    }

    fn sieve() -> Sieve<OneItemLibrary> {
        let library = OneItemLibrary {
            title: "Known Paper About Glaciers",
            calls: AtomicUsize::new(0),
        };
        Sieve::new(Matcher::new(library, MatchSettings::default()), 2)
    }

    fn items(values: Vec<Value>) -> Vec<SourceItem> {
        values.into_iter().map(SourceItem::from_json).collect()
    }

    #[tokio::test]
    async fn classifies_duplicates_novel_and_skipped_in_order() {
        let sieve = sieve();
        let results = sieve
            .classify_all(items(vec![
                json!({"title": "Known Paper About Glaciers."}),
                json!({"title": "Brand New Findings"}),
                json!({"title": "  "}),
                json!({"title": "brand new findings"}),
            ]))
            .await;

        let verdicts: Vec<_> = results.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Duplicate,
                Verdict::Novel,
                Verdict::Skipped(SkipReason::MissingTitle),
                Verdict::Skipped(SkipReason::RepeatedInBatch),
            ]
        );

        let novel = novel_items(&results);
        assert_eq!(novel, vec![json!({"title": "Brand New Findings"})]);

        let summary = SieveSummary::from_classifications(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.novel, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn skipped_items_never_hit_the_provider() {
        let sieve = sieve();
        sieve.classify_all(items(vec![json!({"DOI": "10.1/x"})])).await;
        assert_eq!(sieve.matcher().provider().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_searches_leave_item_novel() {
        let sieve = sieve();
        let results = sieve
            .classify_all(items(vec![json!({"title": "Offline Catalogue Entry"})]))
            .await;

        assert_eq!(results[0].verdict, Verdict::Novel);
        assert_eq!(results[0].report.failures.len(), 3);
        assert_eq!(SieveSummary::from_classifications(&results).novel_with_failures, 1);
    }

    #[test]
    fn verdict_serializes_with_reason() {
        let v = serde_json::to_value(Verdict::Skipped(SkipReason::RepeatedInBatch)).unwrap();
        assert_eq!(v, json!({"verdict": "skipped", "reason": "repeated_in_batch"}));
        assert_eq!(serde_json::to_value(Verdict::Novel).unwrap(), json!({"verdict": "novel"}));
    }
}

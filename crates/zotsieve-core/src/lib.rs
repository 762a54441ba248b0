//! zotsieve core: decides whether an incoming bibliographic record already
//! exists in a reference library.

pub mod authors;
pub mod batch;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod provider;
pub mod scoring;
pub mod similarity;
pub mod text;

pub use batch::{Classification, Sieve, SieveSummary, SkipReason, Verdict, novel_items};
pub use config::{LibraryType, MatchingConfig, SieveConfig, ZoteroConfig};
pub use error::{Result, SieveError};
pub use evaluate::{MatchThresholds, evaluate};
pub use ingest::{SourceItem, metadata_from_json};
pub use matcher::{MatchReport, MatchSettings, Matcher, SearchFailure};
pub use model::{Creator, DateValue, EXACT_IDENTIFIER_SCORE, MatchCandidate, RawCandidate, RawMetadata};
pub use provider::SearchProvider;

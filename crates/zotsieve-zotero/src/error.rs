use thiserror::Error;
use zotsieve_core::SieveError;

#[derive(Debug, Error)]
pub enum ZoteroError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    Api(String, String),

    #[error("rate limited, retry after {0}s")]
    RateLimit(u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

pub type Result<T> = std::result::Result<T, ZoteroError>;

impl From<ZoteroError> for SieveError {
    fn from(e: ZoteroError) -> Self {
        SieveError::search("zotero", e.to_string())
    }
}

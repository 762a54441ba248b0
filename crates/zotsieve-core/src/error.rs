use thiserror::Error;

/// All errors that can occur in zotsieve-core.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("search failed on {provider}: {reason}")]
    Search { provider: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl SieveError {
    pub fn search(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Search {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SieveError>;

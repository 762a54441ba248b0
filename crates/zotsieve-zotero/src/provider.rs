use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;
use zotsieve_core::text::strip_markup;
use zotsieve_core::{LibraryType, RawCandidate, SearchProvider, ZoteroConfig};

use crate::error::{Result, ZoteroError};
use crate::http::RateLimitedClient;

const API_VERSION: &str = "3";

/// Free-text item search over one Zotero library via the Web API.
pub struct ZoteroSearchProvider {
    client: RateLimitedClient,
    base_url: String,
    library_type: LibraryType,
    library_id: String,
    headers: HeaderMap,
}

impl ZoteroSearchProvider {
    pub fn new(config: &ZoteroConfig, api_key: &str) -> Result<Self> {
        if config.library_id.trim().is_empty() {
            return Err(ZoteroError::MissingCredentials(
                "zotero.library_id is not set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key.trim()).map_err(|_| {
            ZoteroError::MissingCredentials("API key contains invalid characters".to_string())
        })?;
        headers.insert(HeaderName::from_static("zotero-api-key"), key);
        headers.insert(
            HeaderName::from_static("zotero-api-version"),
            HeaderValue::from_static(API_VERSION),
        );

        let client = RateLimitedClient::new(
            Duration::from_millis(config.min_interval_ms),
            config.max_retries,
            Duration::from_secs(config.timeout_secs),
            concat!("zotsieve/", env!("CARGO_PKG_VERSION")),
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            library_type: config.library_type,
            library_id: config.library_id.trim().to_string(),
            headers,
        })
    }

    /// Build a provider, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &ZoteroConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ZoteroError::MissingCredentials(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
        Self::new(config, &api_key)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn items_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/{}/{}/items?q={}&limit={}",
            self.base_url,
            self.library_type.path_segment(),
            self.library_id,
            urlencoding::encode(query),
            limit
        )
    }

    pub async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>> {
        let url = self.items_url(&strip_markup(query), limit);
        let body: Value = self.client.get_json_with_headers(&url, &self.headers).await?;

        let items = body
            .as_array()
            .ok_or_else(|| ZoteroError::Parse("expected a JSON array of items".to_string()))?;
        debug!(query, returned = items.len(), "zotero search");

        Ok(items.iter().map(RawCandidate::from_json).collect())
    }
}

#[async_trait]
impl SearchProvider for ZoteroSearchProvider {
    fn name(&self) -> &str {
        "zotero"
    }

    async fn search(&self, query: &str, limit: usize) -> zotsieve_core::Result<Vec<RawCandidate>> {
        Ok(self.search_items(query, limit).await?)
    }
}

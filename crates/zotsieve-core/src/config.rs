use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};
use crate::evaluate::MatchThresholds;
use crate::matcher::MatchSettings;

/// Root configuration, loaded from `~/.config/zotsieve/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveConfig {
    pub matching: MatchingConfig,
    pub zotero: ZoteroConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strong_similarity: f64,
    pub corroborated_similarity: f64,
    pub corroborating_score: u32,
    /// Title prefix lengths tried in order, most specific first.
    pub query_lengths: Vec<usize>,
    pub search_limit: usize,
    /// Items matched at once by `check`.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    User,
    Group,
}

impl LibraryType {
    /// Path segment in the Zotero Web API.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoteroConfig {
    pub base_url: String,
    pub library_type: LibraryType,
    pub library_id: String,
    /// Environment variable holding the API key; the key itself is never
    /// written to the config file.
    pub api_key_env: String,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for MatchingConfig {
    fn default() -> Self {
        let thresholds = MatchThresholds::default();
        let settings = MatchSettings::default();
        Self {
            strong_similarity: thresholds.strong_similarity,
            corroborated_similarity: thresholds.corroborated_similarity,
            corroborating_score: thresholds.corroborating_score,
            query_lengths: settings.query_lengths,
            search_limit: settings.search_limit,
            concurrency: 4,
        }
    }
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.zotero.org".to_string(),
            library_type: LibraryType::User,
            library_id: String::new(),
            api_key_env: "ZOTERO_API_KEY".to_string(),
            min_interval_ms: 100,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl MatchingConfig {
    pub fn thresholds(&self) -> MatchThresholds {
        MatchThresholds {
            strong_similarity: self.strong_similarity,
            corroborated_similarity: self.corroborated_similarity,
            corroborating_score: self.corroborating_score,
        }
    }

    pub fn settings(&self) -> MatchSettings {
        MatchSettings {
            thresholds: self.thresholds(),
            query_lengths: self.query_lengths.clone(),
            search_limit: self.search_limit,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl SieveConfig {
    /// Standard config file path: `~/.config/zotsieve/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ZOTSIEVE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("zotsieve")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;
        for (name, value) in [
            ("strong_similarity", m.strong_similarity),
            ("corroborated_similarity", m.corroborated_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SieveError::Config(format!("{name} must be within 0..=1, got {value}")));
            }
        }
        if m.query_lengths.is_empty() || m.query_lengths.contains(&0) {
            return Err(SieveError::Config(
                "query_lengths must list at least one positive length".to_string(),
            ));
        }
        if m.search_limit == 0 {
            return Err(SieveError::Config("search_limit must be positive".to_string()));
        }
        if m.concurrency == 0 {
            return Err(SieveError::Config("concurrency must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SieveConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.matching.query_lengths, vec![80, 40, 20]);
        assert_eq!(cfg.matching.search_limit, 15);
        assert_eq!(cfg.zotero.library_type.path_segment(), "users");
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = SieveConfig::default();
        cfg.zotero.library_id = "16452772".to_string();
        cfg.zotero.library_type = LibraryType::Group;
        cfg.save_to(&path).unwrap();

        let loaded = SieveConfig::load_from(&path).unwrap();
        assert_eq!(loaded.zotero.library_id, "16452772");
        assert_eq!(loaded.zotero.library_type, LibraryType::Group);
        assert_eq!(loaded.matching.strong_similarity, 0.80);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching]\nquery_lengths = [60, 30]\n").unwrap();

        let loaded = SieveConfig::load_from(&path).unwrap();
        assert_eq!(loaded.matching.query_lengths, vec![60, 30]);
        assert_eq!(loaded.matching.corroborating_score, 5);
        assert_eq!(loaded.zotero.api_key_env, "ZOTERO_API_KEY");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = SieveConfig::load_from(Path::new("/tmp/nonexistent_zotsieve_config.toml")).unwrap();
        assert_eq!(cfg.matching.concurrency, 4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching]\nquery_lengths = []\n").unwrap();
        assert!(matches!(SieveConfig::load_from(&path), Err(SieveError::Config(_))));

        let mut cfg = SieveConfig::default();
        cfg.matching.strong_similarity = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_settings_follow_matching_section() {
        let mut cfg = MatchingConfig::default();
        cfg.corroborating_score = 7;
        cfg.query_lengths = vec![50];
        let settings = cfg.settings();
        assert_eq!(settings.thresholds.corroborating_score, 7);
        assert_eq!(settings.query_lengths, vec![50]);
    }
}

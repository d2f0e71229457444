use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, AnuvadError};

fn default_notify_capacity() -> usize {
    256
}

fn default_offline_max_tokens() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub engine: EngineConfig,
    pub lookup: LookupConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the translation service
    pub endpoint: String,
    /// Path of the single-text endpoint
    pub single_path: String,
    /// Path of the batch endpoint
    pub bulk_path: String,
    /// Hard budget for one remote call, in milliseconds
    pub timeout_ms: u64,
    /// Bearer token; falls back to the ANUVAD_API_KEY environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Use the process-wide cache instead of a private one
    pub use_global_cache: bool,
    /// Maximum cached entries before LRU eviction; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<usize>,
    /// Buffered "key resolved" notifications per subscriber
    #[serde(default = "default_notify_capacity")]
    pub notify_capacity: usize,
    /// What to do when a whole batch call fails
    pub bulk_failure: BulkFailurePolicy,
    /// Longest text (in whitespace tokens) eligible for offline substitution
    #[serde(default = "default_offline_max_tokens")]
    pub offline_max_tokens: usize,
    /// Extra offline dictionary entries (TOML, one table per language code)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkFailurePolicy {
    /// Every uncached text resolves to itself and is negative-cached
    NegativeCache,
    /// Each uncached text is retried once through the single-unit path
    SingleUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Quiet period after the last request before translating, in milliseconds
    pub debounce_ms: u64,
    /// Texts shorter than this never report a loading state
    pub min_loading_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Element tags whose whole subtree is skipped
    pub excluded_tags: Vec<String>,
    /// Class name that opts an element out
    pub opt_out_class: String,
    /// Attribute that opts an element out when present
    pub opt_out_attribute: String,
    /// Element attributes whose values are translatable text
    pub translatable_attributes: Vec<String>,
    /// Object key that opts a JSON object out when set to true
    pub opt_out_key: String,
    /// JSON keys holding identifiers rather than display text; none by default
    pub identifier_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                endpoint: "http://localhost:8080".to_string(),
                single_path: "/api/translate".to_string(),
                bulk_path: "/api/translate/bulk".to_string(),
                timeout_ms: 10_000,
                api_key: None,
            },
            engine: EngineConfig {
                use_global_cache: true,
                cache_capacity: None,
                notify_capacity: default_notify_capacity(),
                bulk_failure: BulkFailurePolicy::NegativeCache,
                offline_max_tokens: default_offline_max_tokens(),
                dictionary_path: None,
            },
            lookup: LookupConfig {
                debounce_ms: 100,
                min_loading_chars: 3,
            },
            extract: ExtractConfig {
                excluded_tags: ["script", "style", "noscript", "code", "pre"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                opt_out_class: "notranslate".to_string(),
                opt_out_attribute: "data-no-translate".to_string(),
                translatable_attributes: ["placeholder", "title", "alt", "aria-label"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                opt_out_key: "noTranslate".to_string(),
                identifier_keys: Vec::new(),
            },
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LookupConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnuvadError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| AnuvadError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AnuvadError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AnuvadError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.timeout_ms == 0 {
            return Err(AnuvadError::Config("provider.timeout_ms must be > 0".to_string()));
        }
        if self.engine.cache_capacity == Some(0) {
            return Err(AnuvadError::Config("engine.cache_capacity must be > 0".to_string()));
        }
        if self.engine.notify_capacity == 0 {
            return Err(AnuvadError::Config("engine.notify_capacity must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_reload_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anuvad.toml");

        let mut config = Config::default();
        config.engine.bulk_failure = BulkFailurePolicy::SingleUnit;
        config.lookup.debounce_ms = 250;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.engine.bulk_failure, BulkFailurePolicy::SingleUnit);
        assert_eq!(loaded.lookup.debounce(), Duration::from_millis(250));
        assert_eq!(loaded.provider.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anuvad.toml");

        let mut config = Config::default();
        config.provider.timeout_ms = 0;
        config.save_to_file(&path).unwrap();

        assert!(matches!(Config::from_file(&path), Err(AnuvadError::Config(_))));
    }
}

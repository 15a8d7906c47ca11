//! Engine configuration.
//!
//! Loaded from TOML. Every section and field is optional; missing values take
//! the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colmap_map::{
    CachedMapping, LruTtlCache, MapOptions, ModelRouter, NormalizedCache,
    router::DEFAULT_MAX_SIMPLE_COLUMNS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColmapConfig {
    pub router: RouterSettings,
    pub cache: CacheSettings,
    pub feedback: FeedbackSettings,
    pub examples: ExampleSettings,
    pub mapping: MappingSettings,
}

impl ColmapConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn model_router(&self) -> ModelRouter {
        ModelRouter::new(&self.router.simple_model, &self.router.complex_model)
            .with_max_simple_columns(self.router.max_simple_columns)
    }

    pub fn mapping_cache(&self) -> NormalizedCache<CachedMapping> {
        NormalizedCache::new(LruTtlCache::new(
            self.cache.capacity,
            Duration::from_secs(self.cache.ttl_secs),
        ))
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            timeout: self.mapping.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Model routing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub simple_model: String,
    pub complex_model: String,
    /// Column count above which the complex model is used.
    pub max_simple_columns: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            simple_model: "mapping-small".to_string(),
            complex_model: "mapping-large".to_string(),
            max_simple_columns: DEFAULT_MAX_SIMPLE_COLUMNS,
        }
    }
}

/// Mapping cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: colmap_map::cache::DEFAULT_CAPACITY,
            ttl_secs: colmap_map::cache::DEFAULT_TTL.as_secs(),
        }
    }
}

/// Feedback loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// JSON Lines log. Feedback is kept in memory when unset.
    pub store_path: Option<PathBuf>,
    pub window_days: i64,
    pub max_learned_corrections: usize,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            window_days: 30,
            max_learned_corrections: 20,
        }
    }
}

/// Learned example storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleSettings {
    /// Directory for learned examples. Examples are kept in memory when unset.
    pub dir: Option<PathBuf>,
}

/// Column mapping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Deadline for one AI backend call.
    pub timeout_secs: Option<u64>,
    /// Data rows sent along with the headers.
    pub sample_rows: usize,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            sample_rows: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ColmapConfig::from_toml("").unwrap();
        assert_eq!(config, ColmapConfig::default());
        assert_eq!(config.router.max_simple_columns, 20);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.feedback.window_days, 30);
        assert_eq!(config.feedback.max_learned_corrections, 20);
        assert!(config.map_options().timeout.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ColmapConfig::from_toml(
            r#"
[router]
complex_model = "big"

[mapping]
timeout_secs = 15

[feedback]
store_path = "data/feedback.jsonl"
"#,
        )
        .unwrap();
        assert_eq!(config.router.simple_model, "mapping-small");
        assert_eq!(config.router.complex_model, "big");
        assert_eq!(config.model_router().complex_model(), "big");
        assert_eq!(config.map_options().timeout, Some(Duration::from_secs(15)));
        assert_eq!(
            config.feedback.store_path.as_deref(),
            Some(Path::new("data/feedback.jsonl"))
        );
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(ColmapConfig::from_toml("[router\nsimple_model = 1").is_err());
        assert!(ColmapConfig::from_toml("[cache]\ncapacity = \"many\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colmap.toml");
        std::fs::write(&path, "[cache]\ncapacity = 10\nttl_secs = 60\n").unwrap();
        let config = ColmapConfig::load_from(&path).unwrap();
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.mapping_cache().stats().size, 0);
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colmap.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        let err = ColmapConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ColmapConfig::load_from(Path::new("/nonexistent/colmap.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/colmap.toml"));
    }
}

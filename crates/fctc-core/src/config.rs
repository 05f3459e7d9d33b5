//! Configuration for fctc-core
//!
//! Storage locations, oracle settings and engine behavior. Loaded from TOML or
//! JSON; every section falls back to its defaults when omitted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::DEFAULT_OPTIONAL_MARKER;

/// Name of the project-local config file
pub const CONFIG_FILE_NAME: &str = "fctc.toml";

/// System-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FctcConfig {
    /// Where the persisted stores live
    pub storage: StorageConfig,
    /// Which oracle to talk to
    pub oracle: OracleConfig,
    /// Decomposition behavior
    pub engine: EngineConfig,
}

/// Persisted file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding all three files
    pub data_dir: PathBuf,
    /// Item graph file
    pub item_db_file: String,
    /// Query cache file
    pub cache_file: String,
    /// Tool vocabulary file
    pub tool_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            item_db_file: "fctc.db.json".to_string(),
            cache_file: "openai.cache.json".to_string(),
            tool_file: "tooldict.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn item_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.item_db_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.cache_file)
    }

    pub fn tool_path(&self) -> PathBuf {
        self.data_dir.join(&self.tool_file)
    }
}

/// Oracle provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Provider id from the oracle registry
    pub provider: String,
    /// Model override; the provider default when absent
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: Some(300),
        }
    }
}

/// Decomposition engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Items per batched list query
    pub list_batch_size: usize,
    /// Known tools offered per equivalence question
    pub tool_batch_size: usize,
    /// Substring marking optional list entries
    pub optional_marker: String,
    /// Query every dependency's own age instead of inheriting the parent's
    pub primitive_age_for_all: bool,
    /// Ask the oracle for item and step descriptions
    pub describe: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            list_batch_size: 20,
            tool_batch_size: 30,
            optional_marker: DEFAULT_OPTIONAL_MARKER.to_string(),
            primitive_age_for_all: false,
            describe: false,
        }
    }
}

impl FctcConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config file, choosing the format by extension (`.json` or TOML)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text)?,
            _ => Self::from_toml(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Candidate config files, most specific first
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".fctc").join("config.toml"));
        }
        paths
    }

    /// Load the first config found on the search path, or the defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Io(format!("{} does not exist", path.display())));
            }
        }

        for path in Self::search_paths(explicit) {
            if path.is_file() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.list_batch_size == 0 {
            return Err(ConfigError::OutOfRange(
                "list_batch_size must be positive".to_string(),
            ));
        }

        if self.engine.tool_batch_size == 0 {
            return Err(ConfigError::OutOfRange(
                "tool_batch_size must be positive".to_string(),
            ));
        }

        if self.engine.optional_marker.is_empty() {
            return Err(ConfigError::MissingField("optional_marker".to_string()));
        }

        for (field, value) in [
            ("item_db_file", &self.storage.item_db_file),
            ("cache_file", &self.storage.cache_file),
            ("tool_file", &self.storage.tool_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        if self.oracle.provider.is_empty() {
            return Err(ConfigError::MissingField("provider".to_string()));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Config text could not be parsed or written
    #[error("Parse error: {0}")]
    Parse(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

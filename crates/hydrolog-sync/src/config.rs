//! Sync configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for the sync engine and its local database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote endpoint settings.
    pub sync: SyncSettings,
    /// Local storage settings.
    pub storage: StorageSettings,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists yet.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - The base URL carries an http/https scheme
    /// - The pull limit is within 1..=1000
    /// - The request timeout is within 1..=300 seconds
    /// - The storage path is not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if !self.sync.base_url.starts_with("http://")
            && !self.sync.base_url.starts_with("https://")
        {
            issues.push(ValidationIssue {
                field: "sync.base_url".to_string(),
                message: format!(
                    "must start with http:// or https://, got '{}'",
                    self.sync.base_url
                ),
            });
        }

        if self.sync.pull_limit == 0 || self.sync.pull_limit > 1000 {
            issues.push(ValidationIssue {
                field: "sync.pull_limit".to_string(),
                message: format!("must be between 1 and 1000, got {}", self.sync.pull_limit),
            });
        }

        if self.sync.timeout_secs == 0 || self.sync.timeout_secs > 300 {
            issues.push(ValidationIssue {
                field: "sync.timeout_secs".to_string(),
                message: format!(
                    "must be between 1 and 300 seconds, got {}",
                    self.sync.timeout_secs
                ),
            });
        }

        if self.storage.path.as_os_str().is_empty() {
            issues.push(ValidationIssue {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(issues))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Base URL of the remote authority (e.g. "https://api.example.com").
    pub base_url: String,
    /// Maximum readings requested per pull.
    pub pull_limit: u32,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            pull_limit: 200,
            timeout_secs: 10,
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the local SQLite database.
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: hydrolog_store::default_db_path(),
        }
    }
}

/// One failed validation check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading, saving, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

/// Default configuration path following platform conventions.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hydrolog")
        .join("config.toml")
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://135.181.111.246:8000";
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Transport timeout; unset means wait indefinitely
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Where the bearer token lives
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Console behaviour
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub training_page_size: Option<usize>,
    #[serde(default)]
    pub transcripts_dir: Option<PathBuf>,
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.orthodash/config.local.toml) > project (.orthodash/config.toml) > user (~/.orthodash/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_layers(dirs::home_dir().as_deref(), Path::new("."))
    }

    /// Layered load rooted at explicit directories
    pub fn load_layers(home: Option<&Path>, project: &Path) -> Result<Self> {
        let mut config = Config::default();

        let mut layers = Vec::new();
        if let Some(home) = home {
            layers.push(home.join(".orthodash").join("config.toml"));
        }
        layers.push(project.join(".orthodash").join("config.toml"));
        // Should be gitignored
        layers.push(project.join(".orthodash").join("config.local.toml"));

        for path in layers {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config layer");
                config.merge(Self::load_from(&path)?);
            }
        }
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every value it sets)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.credentials.path.is_some() {
            self.credentials.path = other.credentials.path;
        }
        if other.console.training_page_size.is_some() {
            self.console.training_page_size = other.console.training_page_size;
        }
        if other.console.transcripts_dir.is_some() {
            self.console.transcripts_dir = other.console.transcripts_dir;
        }
        if other.console.history_file.is_some() {
            self.console.history_file = other.console.history_file;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.api.timeout_ms.map(Duration::from_millis)
    }

    pub fn training_page_size(&self) -> usize {
        self.console.training_page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials
            .path
            .clone()
            .or_else(crate::credentials::FileCredentialStore::default_path)
    }

    pub fn transcripts_dir(&self) -> Option<PathBuf> {
        self.console
            .transcripts_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".orthodash").join("sessions")))
    }

    pub fn history_file(&self) -> Option<PathBuf> {
        self.console
            .history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".orthodash").join("history")))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Expected an http:// or https:// URL, got '{}'", base_url),
            });
        }

        if self.api.timeout_ms == Some(0) {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0 (omit it to wait indefinitely)".to_string(),
            });
        }

        if self.console.training_page_size == Some(0) {
            errors.push(ValidationError {
                field: "console.training_page_size".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

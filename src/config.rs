//! Runtime configuration loaded from `refcore.toml`
//!
//! ```toml
//! [container]
//! timeout_ms = 500        # omit for infinite
//!
//! [libraries]
//! search_paths = ["/opt/app/lib"]
//! extensions = [".so"]     # omit for the platform defaults
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use crate::logging::{self, LogConfig};
use crate::registry::LibrarySearch;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up by `discover`
pub const CONFIG_FILE_NAME: &str = "refcore.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "REFCORE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub container: ContainerConfig,

    #[serde(default)]
    pub libraries: LibraryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Lock wait limit for new containers; absent means infinite
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Replaces the platform extension table when present
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file: None,
            spans: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to access config {}: {}", path.display(), source)
            }
            Self::Parse(err) => write!(f, "Failed to parse config: {}", err),
            Self::Serialize(err) => write!(f, "Failed to serialize config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Find `refcore.toml` in the current directory or its parents
    pub fn discover() -> Self {
        let mut current = std::env::current_dir().ok();

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(err) => logging::warn!(event = "config_invalid", error = %err),
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        Self::default()
    }

    /// File named by `REFCORE_CONFIG`, else `discover`
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)).unwrap_or_else(|err| {
                logging::warn!(event = "config_invalid", error = %err);
                Self::default()
            }),
            None => Self::discover(),
        }
    }

    pub fn container_timeout(&self) -> Option<Duration> {
        self.container.timeout_ms.map(Duration::from_millis)
    }

    pub fn library_search(&self) -> LibrarySearch {
        let defaults = LibrarySearch::default();
        LibrarySearch {
            paths: self.libraries.search_paths.clone(),
            extensions: self
                .libraries
                .extensions
                .clone()
                .unwrap_or(defaults.extensions),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: logging::parse_level(&self.logging.level),
            file_output: self.logging.file.is_some(),
            log_path: self.logging.file.clone(),
            json_format: self.logging.json,
            show_spans: self.logging.spans,
        }
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

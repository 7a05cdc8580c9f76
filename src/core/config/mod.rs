//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order; the first file found wins:
//! 1. An explicit path passed to [`Config::load`] (must exist)
//! 2. `$EVOGRAPH_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/evograph/config.toml`
//! 4. `~/.evograph/config.toml` (canonical write location)
//!
//! With no file found, defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use evograph::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let options = result.config.detect_options();
//! println!("verify detected changes: {}", options.verify);
//! ```

pub mod schema;

pub use schema::{ConfigFile, DetectionConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::evolution::detect::{ChangeOrder, DetectOptions};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "EVOGRAPH_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    /// Path the file was loaded from (if any)
    path: Option<PathBuf>,
}

/// Where to look for a config file, already read from the environment.
#[derive(Debug, Default)]
struct Locations {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    xdg_home: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl Locations {
    fn from_env(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
            env: std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            xdg_home: std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            home: dirs::home_dir(),
        }
    }

    /// The first existing candidate, or `None` for defaults.
    fn resolve(self, warnings: &mut Vec<ConfigWarning>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = self.explicit {
            if !path.exists() {
                return Err(ConfigError::ReadError {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                    path,
                });
            }
            return Ok(Some(path));
        }

        if let Some(path) = self.env {
            if path.exists() {
                return Ok(Some(path));
            }
            tracing::warn!(path = %path.display(), "{CONFIG_ENV} points to a missing file; falling back");
            warnings.push(ConfigWarning {
                message: format!("{CONFIG_ENV} points to a missing file, ignoring it"),
                path,
            });
        }

        let candidates = [
            self.xdg_home.map(|p| p.join("evograph/config.toml")),
            self.home.map(|p| p.join(".evograph/config.toml")),
        ];
        Ok(candidates.into_iter().flatten().find(|p| p.exists()))
    }
}

impl Config {
    /// Load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` does not exist, or if the
    /// selected file cannot be read, parsed or validated. A missing default
    /// file is not an error.
    pub fn load(path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_from(Locations::from_env(path))
    }

    fn load_from(locations: Locations) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let path = locations.resolve(&mut warnings)?;

        let file = match &path {
            Some(path) => Self::read_config(path)?,
            None => {
                tracing::debug!("no config file found; using defaults");
                ConfigFile::default()
            }
        };
        file.validate()?;

        Ok(ConfigLoadResult {
            config: Config { file, path },
            warnings,
        })
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for the config file.
    ///
    /// Returns `~/.evograph/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".evograph/config.toml"))
    }

    /// Write `config` to `path` atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file in the
    /// same directory, then renames it into place.
    pub fn write(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    fn detection(&self) -> Option<&DetectionConfig> {
        self.file.detection.as_ref()
    }

    /// Whether detection verifies every change.
    ///
    /// Defaults to `false`.
    pub fn verify(&self) -> bool {
        self.detection().and_then(|d| d.verify).unwrap_or(false)
    }

    /// Result ordering.
    ///
    /// Defaults to [`ChangeOrder::Collection`].
    pub fn order(&self) -> ChangeOrder {
        self.detection().and_then(|d| d.order).unwrap_or_default()
    }

    /// Detection options derived from this configuration.
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            verify: self.verify(),
            order: self.order(),
            scopes: self
                .detection()
                .and_then(|d| d.scopes.as_ref())
                .map(|s| s.iter().copied().collect()),
        }
    }

    /// Get the path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

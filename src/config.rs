//! Configuration for netform
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - User configuration (~/.netform.toml)
//! - Project configuration (./netform.toml)
//! - An explicit `--config` file
//! - Environment variables

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::stack::app::DEFAULT_REGION;
use crate::synth::TemplateFormat;

/// File name looked up in the home and working directories.
pub const CONFIG_FILE_NAME: &str = "netform.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// Synthesis output settings
    pub synth: SynthConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors
    pub colors: ColorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            synth: SynthConfig::default(),
            logging: LoggingConfig::default(),
            colors: ColorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region every stack deploys to
    pub region: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Cloud assembly directory
    pub output_dir: PathBuf,

    /// Template format
    pub format: TemplateFormat,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("cdk.out"),
            format: TemplateFormat::Json,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `-v` nor `RUST_LOG` is given
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from standard locations, then apply env overrides.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                debug!(path = %path.display(), "loading config");
                config = config.merge_from_file(&path)?;
            } else if config_path == Some(&path) {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Config files in increasing order of precedence.
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(format!(".{}", CONFIG_FILE_NAME)));
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));

        if let Some(path) = explicit_path {
            paths.push(path.clone());
        }
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(path, e))?,
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(path, e))?,
            _ => toml::from_str(&content).map_err(|e| parse_error(path, e))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; `other` wins where it differs from the defaults.
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();
        Config {
            app: AppConfig {
                region: if other.app.region != defaults.app.region {
                    other.app.region
                } else {
                    self.app.region.clone()
                },
            },
            synth: SynthConfig {
                output_dir: if other.synth.output_dir != defaults.synth.output_dir {
                    other.synth.output_dir
                } else {
                    self.synth.output_dir.clone()
                },
                format: if other.synth.format != defaults.synth.format {
                    other.synth.format
                } else {
                    self.synth.format
                },
            },
            logging: LoggingConfig {
                level: if other.logging.level != defaults.logging.level {
                    other.logging.level
                } else {
                    self.logging.level.clone()
                },
                format: if other.logging.format != defaults.logging.format {
                    other.logging.format
                } else {
                    self.logging.format
                },
            },
            colors: ColorsConfig {
                enabled: self.colors.enabled && other.colors.enabled,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(region) = std::env::var("NETFORM_REGION") {
            self.app.region = region;
        }

        if let Ok(dir) = std::env::var("NETFORM_OUTPUT_DIR") {
            self.synth.output_dir = PathBuf::from(dir);
        }

        if let Ok(format) = std::env::var("NETFORM_FORMAT") {
            self.synth.format = format.parse()?;
        }

        if let Ok(format) = std::env::var("NETFORM_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(Error::Config(format!(
                        "unknown log format '{}' (expected text or json)",
                        other
                    )))
                }
            };
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
        Ok(())
    }

    /// Load from a specific file only, without env overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}

fn parse_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Config(format!("{}: {}", path.display(), e))
}

// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::watermark::OutputFormat;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration.
///
/// ```yaml
/// font_dirs:
///   - ${HOME}/fonts
/// system_fonts: true
/// default_font: /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf
/// base_padding: 10
/// output_format: jpeg
/// logging:
///   level: info
///   format: pretty
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Font directories scanned before the platform ones
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,

    /// Also scan the platform font directories
    #[serde(default = "default_system_fonts")]
    pub system_fonts: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_font: Option<PathBuf>,

    /// Transparent border around text layers before effects are added
    #[serde(default = "default_base_padding")]
    pub base_padding: u32,

    /// Destination format; `None` keeps the source's channel layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,

    #[serde(default)]
    pub logging: LogConfig,
}

fn default_system_fonts() -> bool {
    true
}

fn default_base_padding() -> u32 {
    10
}

/// Upper bound for `base_padding`; a layer is allocated around it.
const MAX_BASE_PADDING: u32 = 1000;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            system_fonts: default_system_fonts(),
            default_font: None,
            base_padding: default_base_padding(),
            output_format: None,
            logging: LogConfig::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "photomark=debug"; RUST_LOG wins
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnvVar(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(&substituted)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_padding > MAX_BASE_PADDING {
            return Err(ConfigError::Invalid(format!(
                "base_padding must be at most {}, got {}",
                MAX_BASE_PADDING, self.base_padding
            )));
        }

        if let Some(dir) = self.font_dirs.iter().find(|d| d.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "font_dirs contains an empty path: {:?}",
                dir
            )));
        }

        if let Some(font) = &self.default_font {
            if !font.is_file() {
                return Err(ConfigError::Invalid(format!(
                    "default_font {} does not exist",
                    font.display()
                )));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level cannot be empty".to_string()));
        }
        tracing_subscriber::EnvFilter::try_new(&self.logging.level).map_err(|e| {
            ConfigError::Invalid(format!("Invalid logging.level '{}': {}", self.logging.level, e))
        })?;

        Ok(())
    }
}

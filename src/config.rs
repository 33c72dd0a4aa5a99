use config::{self, File, FileFormat};
use log::{debug, error};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ExporterError, Result};

/// How the exporter authenticates against the appliance
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Log in once and send the issued token
    Token,
    /// HTTP basic authentication on every request
    Basic,
}

impl Default for AuthMode {
    fn default() -> Self {
        AuthMode::Token
    }
}

/// One entry of the `targets` list
#[derive(Debug, Deserialize, Clone)]
pub struct TargetEntry {
    /// Exact host name or glob; empty marks the default entry
    #[serde(default)]
    pub pattern: String,
    /// Appliance user
    pub user: String,
    /// Appliance password
    #[serde(default)]
    pub password: String,
    /// Authentication mode
    #[serde(default)]
    pub auth_mode: AuthMode,
}

/// The credentials document
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExporterConfig {
    /// Target match rules in declaration order
    #[serde(default)]
    pub targets: Vec<TargetEntry>,
}

/// Where a credentials document is read from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// File path, format picked from the extension
    File(PathBuf),
    /// YAML string
    Yaml(String),
    /// TOML string
    Toml(String),
}

impl ConfigSource {
    /// Short human readable description used in log lines
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Yaml(_) => "inline YAML".to_string(),
            ConfigSource::Toml(_) => "inline TOML".to_string(),
        }
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, PartialEq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Pick the document format from a file extension
fn format_for(path: &Path) -> Result<FileFormat> {
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(ExporterError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            )));
        }
    };

    match extension.as_str() {
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        format => {
            error!("Unsupported configuration format: {}", format);
            Err(ExporterError::Config(format!("Unsupported config format: {}", format)))
        }
    }
}

/// Load and deserialize a credentials document. Nothing is validated beyond its shape.
pub fn load_config(source: &ConfigSource) -> Result<ExporterConfig> {
    let builder = config::Config::builder();

    let builder = match source {
        ConfigSource::File(path) => {
            debug!("Loading configuration from {}", path.display());
            if !path.exists() {
                error!("Configuration file {} does not exist", path.display());
                return Err(ExporterError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            let format = format_for(path)?;
            builder.add_source(File::from(path.as_path()).format(format))
        }
        ConfigSource::Yaml(text) => builder.add_source(File::from_str(text, FileFormat::Yaml)),
        ConfigSource::Toml(text) => builder.add_source(File::from_str(text, FileFormat::Toml)),
    };

    let config = builder
        .build()
        .map_err(|e| ExporterError::Config(format!("Failed to build configuration: {}", e)))?;

    config
        .try_deserialize()
        .map_err(|e| ExporterError::Config(format!("Failed to deserialize configuration: {}", e)))
}

// src/error.rs
use std::io;
use thiserror::Error;

/// Result type used throughout the exporter library
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Custom Error type for the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("'target' parameter must be specified")]
    MissingTarget,

    #[error("unknown target '{0}'")]
    NoCredentials(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ExporterError {
    fn from(err: reqwest::Error) -> Self {
        ExporterError::Device(err.to_string())
    }
}

impl From<config::ConfigError> for ExporterError {
    fn from(err: config::ConfigError) -> Self {
        ExporterError::Config(err.to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ExporterError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        ExporterError::Channel(err.to_string())
    }
}

impl ExporterError {
    /// Whether the error was caused by the scrape request itself rather than the exporter
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExporterError::MissingTarget | ExporterError::NoCredentials(_))
    }
}

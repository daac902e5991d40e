//! Error types for the monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// These are fatal: the monitor reports them once and never starts polling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No connection string was supplied by any configuration layer.
    #[error("The required connection string was not supplied")]
    MissingConnectionString,

    /// The connection string could not be parsed.
    #[error("Error parsing the connection string: {0}")]
    ConnectionString(String),

    /// A queue pattern is not a valid regular expression.
    #[error("Invalid queue pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The polling interval must be a positive number of milliseconds.
    #[error("The polling interval must be greater than zero")]
    InvalidInterval,

    /// The HTTP client for the queue service could not be created.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The log file could not be opened.
    #[error("Cannot open log file: {0}")]
    LogFile(String),

    /// The configuration file or environment could not be read.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors returned by a queue source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The queue no longer exists upstream.
    #[error("Queue '{0}' does not exist")]
    NotFound(String),

    /// Any other failure; the caller may retry on the next cycle.
    #[error("Transient source failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Transient("request timed out".to_string())
        } else if err.is_connect() {
            SourceError::Transient(format!("connection failed: {}", err))
        } else {
            SourceError::Transient(err.to_string())
        }
    }
}

/// Errors raised while writing the CSV history.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot create export directory {0}: {1}")]
    CreateDirectory(PathBuf, std::io::Error),

    #[error("Cannot write export file {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors that stop the poll loop.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listing the queues failed; nothing could be sampled this cycle.
    #[error("Failed to list queues: {0}")]
    Listing(#[source] SourceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Render failed: {0}")]
    Render(#[from] std::io::Error),
}

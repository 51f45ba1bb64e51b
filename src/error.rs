//! Error types for the depth replay pipeline

use thiserror::Error;

/// Depth replay errors
///
/// Decode-level anomalies never show up here: malformed frames degrade to
/// partial or unrecognized events instead.
#[derive(Error, Debug)]
pub enum DepthError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid layout table: {0}")]
    Layout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot sink error: {0}")]
    SinkError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    #[error("Snapshot channel closed")]
    ChannelClosed,
}

impl From<std::io::Error> for DepthError {
    fn from(err: std::io::Error) -> Self {
        DepthError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DepthError {
    fn from(err: serde_json::Error) -> Self {
        DepthError::SerializationError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for DepthError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        DepthError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for DepthError {
    fn from(err: config::ConfigError) -> Self {
        DepthError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for DepthError {
    fn from(err: prometheus::Error) -> Self {
        DepthError::MetricsError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DepthError {
    fn from(err: tokio::task::JoinError) -> Self {
        DepthError::TaskFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DepthError>;

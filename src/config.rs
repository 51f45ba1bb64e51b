//! Configuration module for the depth replay binary

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DepthError, Result};

/// Snapshot output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Jsonl,
    Msgpack,
}

impl FromStr for OutputFormat {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" | "json" => Ok(OutputFormat::Jsonl),
            "msgpack" => Ok(OutputFormat::Msgpack),
            other => Err(DepthError::ConfigError(format!(
                "unknown output format: {}",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Binary frame stream to replay
    pub input_path: PathBuf,

    /// Snapshot destination
    pub output_path: PathBuf,

    /// Snapshot encoding
    pub output_format: OutputFormat,

    /// Price levels per side
    pub depth_levels: usize,

    /// Frames decoded concurrently
    pub decode_workers: usize,

    /// Snapshots buffered ahead of the sink
    pub sink_capacity: usize,

    /// Frames between progress logs
    pub progress_interval: u64,

    /// Layout table file; the built-in table when unset
    pub layout_path: Option<PathBuf>,

    /// Where to dump Prometheus metrics at exit
    pub metrics_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let output_format = match lookup("OUTPUT_FORMAT") {
            Some(value) => value.parse()?,
            None => defaults.output_format,
        };

        Ok(Self {
            input_path: lookup("INPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_path),
            output_path: lookup("OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            output_format,
            depth_levels: number("DEPTH_LEVELS", defaults.depth_levels as u64) as usize,
            decode_workers: number("DECODE_WORKERS", defaults.decode_workers as u64) as usize,
            sink_capacity: number("SINK_CAPACITY", defaults.sink_capacity as u64) as usize,
            progress_interval: number("PROGRESS_INTERVAL", defaults.progress_interval),
            layout_path: lookup("LAYOUT_PATH").map(PathBuf::from),
            metrics_path: lookup("METRICS_PATH").map(PathBuf::from),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("feed.log"),
            output_path: PathBuf::from("level2_data.csv"),
            output_format: OutputFormat::Csv,
            depth_levels: 5,
            decode_workers: 4,
            sink_capacity: 1024,
            progress_interval: 50_000,
            layout_path: None,
            metrics_path: None,
        }
    }
}

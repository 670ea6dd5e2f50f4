//! Error types for run orchestration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use eodsync_registry::RegistryError;
use eodsync_store::StoreError;
use thiserror::Error;

/// Result type alias for run operations.
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors that abort a run.
///
/// Per-instrument fetch failures never show up here; they are recorded in
/// the run report and retried by a later run.
#[derive(Error, Debug)]
pub enum RunError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config '{path}': {source}")]
    ParseConfig {
        /// The config file path.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to write the configuration file.
    #[error("Failed to write config '{path}': {source}")]
    WriteConfig {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize JSON.
    #[error("Failed to serialize: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Another live process holds the run lock.
    #[error("Run lock '{path}' is held by process {pid} since {since}")]
    LockHeld {
        /// The lock file path.
        path: PathBuf,
        /// PID of the holder.
        pid: u32,
        /// When the holder acquired the lock.
        since: DateTime<Utc>,
    },

    /// The lock file exists but cannot be read yet, and is too recent to be
    /// treated as abandoned.
    #[error("Run lock '{path}' is unreadable and younger than the grace period")]
    LockBusy {
        /// The lock file path.
        path: PathBuf,
    },

    /// Failed to create or remove the lock file.
    #[error("Failed to access run lock '{path}': {source}")]
    Lock {
        /// The lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Registry persistence failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// History or artifact persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

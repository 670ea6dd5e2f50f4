//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, mutating, or persisting the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No registry has been persisted yet.
    #[error("Registry not found at '{0}' (run `eodsync import` first)")]
    NotFound(PathBuf),

    /// A symbol was inserted twice.
    #[error("Duplicate symbol in registry: {0}")]
    DuplicateSymbol(String),

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the registry JSON.
    #[error("Failed to parse registry file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize the registry.
    #[error("Failed to serialize registry: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// Failed to read a listings CSV.
    #[error("Failed to read listings '{path}': {source}")]
    Csv {
        /// The listings file.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv_async::Error,
    },

    /// A required listings column is absent.
    #[error("Listings '{path}' has no '{column}' column")]
    MissingColumn {
        /// The listings file.
        path: PathBuf,
        /// The missing header.
        column: &'static str,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

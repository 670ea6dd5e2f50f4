//! Error types for table persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing history data.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write {path}: {source}")]
    WriteFile {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create or list a directory.
    #[error("Failed to access directory {path}: {source}")]
    Directory {
        /// The directory path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to move an artifact into the archive.
    #[error("Failed to move {from} to {to}: {source}")]
    Rename {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Parquet or Arrow failure.
    #[error("Parquet error in {path}: {message}")]
    Parquet {
        /// The file path.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// An artifact file is malformed.
    #[error("Malformed artifact {path}: {message}")]
    Artifact {
        /// The file path.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// Table dimensions or ordering are inconsistent.
    #[error("Invalid table: {0}")]
    Shape(String),

    /// A column name cannot be stored.
    #[error("Invalid column name '{0}'")]
    InvalidColumn(String),
}

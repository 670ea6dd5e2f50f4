//! Error types for eodsync core values.

use chrono::NaiveDate;
use thiserror::Error;

/// Error for invalid fetch windows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Start date is not strictly before the end date.
    #[error("Empty fetch window: {start} .. {end}")]
    Empty {
        /// The start date (inclusive).
        start: NaiveDate,
        /// The end date (exclusive).
        end: NaiveDate,
    },
}

/// Error for malformed price series.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// A price was NaN or infinite.
    #[error("Non-finite price for {symbol} on {date}")]
    NonFinite {
        /// The series symbol.
        symbol: String,
        /// The offending date.
        date: NaiveDate,
    },
}

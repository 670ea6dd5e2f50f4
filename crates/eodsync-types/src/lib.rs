//! Core types for the eodsync end-of-day price collector.
//!
//! This crate provides the fundamental data structures used throughout eodsync:
//!
//! - [`Instrument`] - Tradable security with classification tags and URL template
//! - [`MarketCap`] - Market-capitalization bucket
//! - [`PricePoint`] / [`Series`] - Daily adjusted-close observations
//! - [`FetchWindow`] - Half-open date window requested by one run
//! - [`RunMode`] - Whether a run ends its window today or yesterday
//! - [`DateFilter`] - Date predicate used by read queries
//! - [`write_atomic`] - Temp-file-and-rename replacement for persisted files

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/eodsync/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod atomic;
mod error;
mod filter;
mod instrument;
mod series;
mod window;

pub use atomic::write_atomic;
pub use error::{SeriesError, WindowError};
pub use filter::DateFilter;
pub use instrument::{Instrument, MarketCap, MarketCapParseError};
pub use series::{PricePoint, Series};
pub use window::{DEFAULT_EPOCH, FetchWindow, RunMode};

//! HTTP price-history fetching and batch scheduling for eodsync.
//!
//! This crate provides the acquisition side of the pipeline:
//!
//! - [`url::expand_template`] - Fills an instrument's URL template with window timestamps
//! - [`SourceClient`] - Single-request HTTP client with a bounded timeout
//! - [`parse::parse_adjusted_close`] - CSV payload to [`Series`](eodsync_types::Series)
//! - [`PriceSource`] - Seam between the scheduler and the network
//! - [`run_batch`] - Sequential, failure-isolating fetch loop

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/eodsync/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
pub mod parse;
mod scheduler;
mod source;
pub mod url;

pub use client::{BROWSER_USER_AGENT, ClientConfig, FetchCause, FetchError, SourceClient};
pub use parse::ParseError;
pub use scheduler::{BatchOutcome, run_batch};
pub use source::PriceSource;

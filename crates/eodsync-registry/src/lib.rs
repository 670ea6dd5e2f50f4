//! Instrument registry and update tracking for eodsync.
//!
//! This crate provides the registry side of the reconciliation pipeline:
//!
//! - [`Registry`] - Ordered, symbol-unique set of instruments with
//!   eligibility selection, update marking, and classification queries
//! - [`RegistryStore`] - Whole-file JSON persistence with atomic replace
//! - [`import_listings`] - Bulk import from the instrument-discovery CSV
//!
//! # Example
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use eodsync_registry::Registry;
//! use eodsync_types::Instrument;
//!
//! let mut registry = Registry::new();
//! registry
//!     .insert(Instrument::new("MSFT", "Information Technology", "Common stocks", "https://example.test/MSFT"))
//!     .unwrap();
//!
//! let eligible = registry.list_eligible(TimeDelta::hours(12), Utc::now());
//! assert_eq!(eligible.len(), 1);
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/eodsync/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod import;
mod registry;
mod store;

pub use error::{RegistryError, Result};
pub use import::{ImportSummary, TRACKED_SECTORS, import_listings};
pub use registry::{MarkSummary, Registry};
pub use store::RegistryStore;

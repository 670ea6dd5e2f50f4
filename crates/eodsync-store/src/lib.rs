//! Wide history table, partial artifacts, and reconciliation for eodsync.
//!
//! This crate provides:
//!
//! - [`WideTable`] - Date-keyed table with one nullable column per symbol
//! - [`HistoryStore`] - Parquet persistence of the consolidated table
//! - [`ArtifactStore`] - Numbered CSV side artifacts written by partial runs
//! - [`Reconciler`] - Chooses between a partial write and a consolidation
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use chrono::NaiveDate;
//! use eodsync_store::{WideTable, consolidate, partial_block};
//! use eodsync_types::{FetchWindow, PricePoint, Series};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let window = FetchWindow::new(day(1), day(4)).unwrap();
//! let series = Series::new("XOM", [PricePoint::new(day(2), 101.5)]).unwrap();
//!
//! let block = partial_block(&window, &BTreeMap::from([("XOM".to_string(), series)]));
//! let table = consolidate(&WideTable::new(), &[block]);
//!
//! assert_eq!(table.latest_date(), Some(day(2)));
//! assert_eq!(table.value("XOM", day(2)), Some(101.5));
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/eodsync/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod artifacts;
mod error;
mod history;
mod merge;
mod table;

pub use artifacts::{ARCHIVE_DIR, ArtifactMeta, ArtifactStore};
pub use error::{Result, StoreError};
pub use history::HistoryStore;
pub use merge::{Reconciler, Reconciliation, consolidate, partial_block};
pub use table::{DATE_COLUMN, WideTable};

//! Run orchestration for eodsync.
//!
//! This crate ties the registry, fetcher, and store together:
//!
//! - [`RunController`] - One locked run: window, batch, fetch, reconcile
//! - [`RunConfig`] - Batch size, staleness, timeouts, and epoch
//! - [`DataDir`] - Layout of the persisted files
//! - [`RunLock`] - Exclusive lock file with stale-owner detection
//! - [`RunReport`] / [`StatusReport`] - What a run did, what is on disk
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use eodsync_fetch::SourceClient;
//! use eodsync_run::{DataDir, RunConfig, RunController};
//! use eodsync_types::RunMode;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let data = DataDir::with_default_path()?;
//! let config = RunConfig::load(&data.config_path())?;
//! let source = SourceClient::new(config.client_config())?;
//!
//! let controller = RunController::new(data, config, source);
//! let report = controller.run(RunMode::Daily, Utc::now(), &mut ()).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/eodsync/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod controller;
mod error;
mod lock;
mod paths;
mod report;

pub use config::RunConfig;
pub use controller::{RunController, RunProgress, consolidate, status};
pub use error::{Result, RunError};
pub use lock::{LockInfo, RunLock, UNREADABLE_GRACE, is_process_running, read_holder};
pub use paths::{CONFIG_FILE, DataDir, HISTORY_FILE, LOCK_FILE, PARTIALS_DIR, REGISTRY_FILE};
pub use report::{RunOutcome, RunReport, StatusReport};

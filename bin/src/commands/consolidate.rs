//! Forced consolidation command.

use crate::display::open_data_dir;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Fold outstanding artifacts into the history table now.
pub(crate) fn consolidate(data_dir: Option<&Path>, json: bool) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let report = eodsync_run::consolidate(&data, Utc::now()).context("Consolidation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

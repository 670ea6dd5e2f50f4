//! Data directory status command.

use crate::display::{load_config, open_data_dir};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Print registry, history, and lock state.
pub(crate) fn status(data_dir: Option<&Path>, json: bool) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let config = load_config(&data)?;

    let report = eodsync_run::status(&data, &config, Utc::now())
        .context("Failed to read data directory (run `eodsync import` first?)")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Data directory: {}", data.root().display());
        println!("{report}");
    }
    Ok(())
}

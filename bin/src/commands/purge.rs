//! Archive housekeeping command.

use crate::display::open_data_dir;
use anyhow::{Context, Result};
use chrono::{Days, Utc};
use std::path::Path;

/// Delete archived artifacts older than `older_than_days`.
pub(crate) fn purge(data_dir: Option<&Path>, older_than_days: u32) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let cutoff = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(older_than_days)))
        .context("Age out of range")?;

    let removed = data
        .artifact_store()
        .purge_archive(cutoff)
        .context("Failed to purge archive")?;

    println!("Removed {removed} archived artifacts written before {cutoff}");
    Ok(())
}

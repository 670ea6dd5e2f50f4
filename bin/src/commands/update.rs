//! Incremental update command.

use crate::display::{BarProgress, load_config, open_data_dir};
use anyhow::{Context, Result};
use chrono::Utc;
use eodsync_fetch::SourceClient;
use eodsync_run::RunController;
use eodsync_types::RunMode;
use std::path::Path;

/// Run the controller once.
pub(crate) async fn update(
    data_dir: Option<&Path>,
    mode: RunMode,
    batch_size: Option<usize>,
    staleness_hours: Option<u32>,
    delay_ms: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let mut config = load_config(&data)?;
    if let Some(size) = batch_size {
        config.batch_size = size;
    }
    if let Some(hours) = staleness_hours {
        config.staleness_hours = hours;
    }
    if let Some(ms) = delay_ms {
        config.request_delay_ms = ms;
    }
    config.validate().context("Invalid run options")?;

    let source =
        SourceClient::new(config.client_config()).context("Failed to create HTTP client")?;
    let controller = RunController::new(data, config, source);

    let mut progress = BarProgress::new(quiet || json);
    let result = controller.run(mode, Utc::now(), &mut progress).await;
    progress.finish();
    let report = result.context("Run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

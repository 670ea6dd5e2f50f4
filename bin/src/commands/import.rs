//! Registry import command.

use crate::display::open_data_dir;
use anyhow::{Context, Result, bail};
use eodsync_registry::{Registry, import_listings};
use eodsync_run::RunLock;
use inquire::Confirm;
use std::path::Path;

/// Load the registry from a listings CSV.
///
/// When replacing, `last_update` stamps of symbols that survive the
/// re-import are carried over so they are not fetched again early.
pub(crate) async fn import(
    data_dir: Option<&Path>,
    csv: &Path,
    replace: bool,
    yes: bool,
) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let store = data.registry_store();

    let previous = if store.exists() {
        if !replace {
            bail!(
                "Registry already exists at {}; pass --replace to overwrite it",
                store.path().display()
            );
        }
        let previous = store.load().context("Failed to read existing registry")?;
        if !yes {
            let confirmed = Confirm::new(&format!(
                "Replace the registry of {} instruments?",
                previous.len()
            ))
            .with_default(false)
            .prompt()
            .context("Confirmation cancelled")?;
            if !confirmed {
                println!("Import cancelled.");
                return Ok(());
            }
        }
        Some(previous)
    } else {
        None
    };

    let _lock = RunLock::acquire(data.lock_path()).context("Cannot import during a run")?;

    let mut registry = Registry::new();
    let summary = import_listings(csv, &mut registry)
        .await
        .with_context(|| format!("Failed to import {}", csv.display()))?;

    let mut carried = 0;
    if let Some(previous) = &previous {
        for old in previous.all() {
            if let Some(at) = old.last_update() {
                carried += registry.mark_updated([old.symbol()], at).updated.len();
            }
        }
    }

    store.persist(&registry).context("Failed to save registry")?;

    println!("Imported:          {}", summary.imported);
    println!("Duplicates:        {}", summary.skipped_duplicate);
    println!("Filtered out:      {}", summary.skipped_filtered);
    if previous.is_some() {
        println!("Stamps carried:    {carried}");
    }
    println!("Registry:          {}", store.path().display());
    Ok(())
}

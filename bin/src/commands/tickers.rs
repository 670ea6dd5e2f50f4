//! Registry query command.

use crate::display::{open_data_dir, parse_cap};
use anyhow::{Context, Result};
use eodsync_types::Instrument;
use std::path::Path;

/// List registered instruments matching the filters.
pub(crate) fn tickers(
    data_dir: Option<&Path>,
    sector: Option<&str>,
    category: Option<&str>,
    cap: Option<&str>,
    list_sectors: bool,
    symbols: &[String],
) -> Result<()> {
    let data = open_data_dir(data_dir)?;
    let registry = data
        .registry_store()
        .load()
        .context("Failed to load registry (run `eodsync import` first?)")?;

    if !symbols.is_empty() {
        let sectors = registry.sectors_of(symbols.iter().map(String::as_str));
        for symbol in symbols {
            let sector = sectors.get(symbol.as_str()).copied().unwrap_or("(not registered)");
            println!("{symbol:<10} {sector}");
        }
        return Ok(());
    }

    if list_sectors {
        for sector in registry.sectors() {
            let count = registry.tickers_in_sector(sector).count();
            println!("{sector:<30} {count:>6}");
        }
        return Ok(());
    }

    let bucket = cap.map(parse_cap).transpose()?;
    let instruments: Vec<&Instrument> = match (category, bucket) {
        (Some(category), bucket) => registry
            .by_category(category, sector)
            .filter(|i| bucket.is_none_or(|b| i.market_cap_bucket() == Some(b)))
            .collect(),
        (None, Some(bucket)) => registry.by_market_cap(bucket, sector).collect(),
        (None, None) => match sector {
            Some(sector) => registry.tickers_in_sector(sector).collect(),
            None => registry.all().collect(),
        },
    };

    if instruments.is_empty() {
        println!("No instruments found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<28} {:<8} {:<20}",
        "SYMBOL", "SECTOR", "CAP", "LAST UPDATE"
    );
    println!("{}", "-".repeat(68));

    for instrument in &instruments {
        println!(
            "{:<10} {:<28} {:<8} {:<20}",
            instrument.symbol(),
            instrument.sector(),
            instrument
                .market_cap_bucket()
                .map_or("-", |bucket| bucket.as_str()),
            instrument
                .last_update()
                .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string())
        );
    }

    println!("\nTotal: {} instruments", instruments.len());
    Ok(())
}

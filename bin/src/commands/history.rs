//! History query command.

use crate::display::{open_data_dir, parse_date};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use eodsync_types::DateFilter;
use std::path::Path;

/// Print stored adjusted closes for the given symbols.
pub(crate) fn history(
    data_dir: Option<&Path>,
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
    months: Option<u32>,
) -> Result<()> {
    let filter = match (months, start, end) {
        (Some(months), _, _) => DateFilter::Trailing {
            months,
            reference: Utc::now().date_naive(),
        },
        (None, None, None) => DateFilter::All,
        (None, start, end) => DateFilter::Between {
            start: start.map_or(Ok(NaiveDate::MIN), |s| parse_date(s, "start"))?,
            end: end.map_or(Ok(NaiveDate::MAX), |s| parse_date(s, "end"))?,
        },
    };

    let data = open_data_dir(data_dir)?;
    let table = data
        .history_store()
        .load()
        .context("Failed to load history table")?;

    let wanted: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let history = table.price_history(&wanted, filter);

    for symbol in &wanted {
        match history.get(*symbol) {
            None => println!("{symbol}: no history stored"),
            Some(points) if points.is_empty() => println!("{symbol}: no values in range"),
            Some(points) => {
                println!("{symbol} ({} values)", points.len());
                for point in points {
                    println!("  {}  {:>12.4}", point.date, point.value);
                }
            }
        }
    }
    Ok(())
}

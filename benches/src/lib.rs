//! Synthetic data for eodsync store benchmarks.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use eodsync_store::{WideTable, partial_block};
use eodsync_types::{FetchWindow, PricePoint, Series};

/// Shape of one synthetic partial block.
#[derive(Debug, Clone, Copy)]
pub struct BlockShape {
    /// First calendar day covered.
    pub start: NaiveDate,
    /// Calendar days covered.
    pub days: u64,
    /// Symbol columns.
    pub symbols: usize,
    /// Offset of the first symbol name, so blocks can cover disjoint symbols.
    pub first_symbol: usize,
}

/// Symbol name used for column `idx`.
#[must_use]
pub fn symbol(idx: usize) -> String {
    format!("SYM{idx:05}")
}

/// Builds a block with a value on every weekday of the shape's window.
///
/// Returns an empty table if the shape covers no days.
#[must_use]
pub fn synthetic_block(shape: BlockShape) -> WideTable {
    let Some(end) = shape.start.checked_add_days(Days::new(shape.days)) else {
        return WideTable::new();
    };
    let Ok(window) = FetchWindow::new(shape.start, end) else {
        return WideTable::new();
    };

    let fetched: BTreeMap<String, Series> = (shape.first_symbol
        ..shape.first_symbol + shape.symbols)
        .filter_map(|idx| {
            let name = symbol(idx);
            let points = window
                .days()
                .enumerate()
                .filter(|(_, d)| is_weekday(*d))
                .map(|(i, d)| PricePoint::new(d, 50.0 + (idx % 97) as f64 + i as f64 * 0.01));
            Series::new(name.clone(), points).ok().map(|s| (name, s))
        })
        .collect();

    partial_block(&window, &fetched)
}

/// A day's worth of partial blocks covering `batches * batch_size` symbols.
#[must_use]
pub fn synthetic_day(start: NaiveDate, days: u64, batches: usize, batch_size: usize) -> Vec<WideTable> {
    (0..batches)
        .map(|b| {
            synthetic_block(BlockShape {
                start,
                days,
                symbols: batch_size,
                first_symbol: b * batch_size,
            })
        })
        .collect()
}

fn is_weekday(date: NaiveDate) -> bool {
    use chrono::Datelike;
    date.weekday().number_from_monday() <= 5
}

//! Sequential batch fetching.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use eodsync_types::{FetchWindow, Instrument, Series};

use crate::PriceSource;

/// Result of one batch: successful series and failed symbols.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Series keyed by symbol for every instrument that fetched successfully.
    pub fetched: BTreeMap<String, Series>,
    /// Failure cause keyed by symbol.
    pub failed: BTreeMap<String, String>,
}

impl BatchOutcome {
    /// Returns true if no instrument in the batch succeeded.
    ///
    /// This is the drain signal: the upstream is assumed to be throttling.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.fetched.is_empty()
    }

    /// Returns the symbols that fetched successfully.
    #[must_use]
    pub fn succeeded(&self) -> BTreeSet<&str> {
        self.fetched.keys().map(String::as_str).collect()
    }

    /// Returns the symbols that failed.
    #[must_use]
    pub fn failed_symbols(&self) -> BTreeSet<&str> {
        self.failed.keys().map(String::as_str).collect()
    }

    /// Returns the number of instruments attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.fetched.len() + self.failed.len()
    }
}

/// Fetches every instrument in order, one request at a time.
///
/// A failed fetch is logged and recorded; it never stops the batch.
/// `delay` is slept between consecutive requests. `progress` is called
/// after each instrument with whether it succeeded.
pub async fn run_batch<S, F>(
    source: &S,
    instruments: &[Instrument],
    window: &FetchWindow,
    delay: Duration,
    mut progress: F,
) -> BatchOutcome
where
    S: PriceSource + ?Sized,
    F: FnMut(&Instrument, bool),
{
    let mut outcome = BatchOutcome::default();

    for (idx, instrument) in instruments.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match source.fetch(instrument, window).await {
            Ok(series) => {
                tracing::info!(
                    "Fetched {} points for {} ({})",
                    series.len(),
                    instrument.symbol(),
                    window
                );
                outcome
                    .fetched
                    .insert(instrument.symbol().to_string(), series);
                progress(instrument, true);
            }
            Err(e) => {
                if e.is_throttled() {
                    tracing::warn!("Fetch throttled for {}: {}", e.symbol, e.cause);
                } else {
                    tracing::warn!("Fetch failed for {}: {}", e.symbol, e.cause);
                }
                outcome.failed.insert(e.symbol, e.cause.to_string());
                progress(instrument, false);
            }
        }
    }

    tracing::info!(
        "Batch finished: {} of {} succeeded",
        outcome.fetched.len(),
        outcome.attempted()
    );
    outcome
}

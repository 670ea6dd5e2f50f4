//! In-memory instrument registry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use eodsync_types::{Instrument, MarketCap};

use crate::{RegistryError, Result};

/// Outcome of [`Registry::mark_updated`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSummary {
    /// Symbols whose timestamp moved forward.
    pub updated: Vec<String>,
    /// Symbols already stamped at or after the given time.
    pub unchanged: Vec<String>,
    /// Symbols not present in the registry.
    pub unknown: Vec<String>,
}

/// Ordered set of instruments keyed by symbol.
///
/// Iteration follows insertion order so that batches are reproducible
/// across runs.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    instruments: Vec<Instrument>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from instruments in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if two instruments share a symbol.
    pub fn from_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Result<Self> {
        let mut registry = Self::new();
        for instrument in instruments {
            registry.insert(instrument)?;
        }
        Ok(registry)
    }

    /// Appends an instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is already registered.
    pub fn insert(&mut self, instrument: Instrument) -> Result<()> {
        if self.index.contains_key(instrument.symbol()) {
            return Err(RegistryError::DuplicateSymbol(instrument.symbol().to_string()));
        }
        self.index
            .insert(instrument.symbol().to_string(), self.instruments.len());
        self.instruments.push(instrument);
        Ok(())
    }

    /// Looks up an instrument by symbol.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.index.get(symbol).map(|&idx| &self.instruments[idx])
    }

    /// Returns true if the symbol is registered.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Returns all instruments in registry order.
    pub fn all(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    /// Returns the number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Returns instruments not updated within `staleness` of `now`.
    ///
    /// Never-updated instruments are always eligible. Registry order is kept.
    #[must_use]
    pub fn list_eligible(&self, staleness: TimeDelta, now: DateTime<Utc>) -> Vec<&Instrument> {
        let cutoff = now - staleness;
        self.instruments
            .iter()
            .filter(|i| i.is_stale(cutoff))
            .collect()
    }

    /// Returns the first `batch_size` eligible instruments.
    #[must_use]
    pub fn select_batch(
        &self,
        staleness: TimeDelta,
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Vec<Instrument> {
        self.list_eligible(staleness, now)
            .into_iter()
            .take(batch_size)
            .cloned()
            .collect()
    }

    /// Stamps `last_update = at` on exactly the given symbols.
    ///
    /// All other instruments are left untouched, and no timestamp moves
    /// backwards.
    pub fn mark_updated<'a>(
        &mut self,
        symbols: impl IntoIterator<Item = &'a str>,
        at: DateTime<Utc>,
    ) -> MarkSummary {
        let mut summary = MarkSummary::default();
        for symbol in symbols {
            match self.index.get(symbol) {
                Some(&idx) => {
                    if self.instruments[idx].record_update(at) {
                        summary.updated.push(symbol.to_string());
                    } else {
                        summary.unchanged.push(symbol.to_string());
                    }
                }
                None => summary.unknown.push(symbol.to_string()),
            }
        }
        summary
    }

    /// Returns instruments whose sector matches (case-insensitive).
    pub fn tickers_in_sector<'a>(&'a self, sector: &'a str) -> impl Iterator<Item = &'a Instrument> {
        self.instruments
            .iter()
            .filter(move |i| i.sector().eq_ignore_ascii_case(sector))
    }

    /// Maps each known symbol to its sector; unknown symbols are skipped.
    #[must_use]
    pub fn sectors_of<'a>(
        &'a self,
        symbols: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<&'a str, &'a str> {
        symbols
            .into_iter()
            .filter_map(|s| self.get(s).map(|i| (i.symbol(), i.sector())))
            .collect()
    }

    /// Returns instruments of a category, optionally restricted to a sector.
    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
        sector: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Instrument> {
        self.instruments.iter().filter(move |i| {
            i.category().eq_ignore_ascii_case(category)
                && sector.is_none_or(|s| i.sector().eq_ignore_ascii_case(s))
        })
    }

    /// Returns instruments in a market-cap bucket, optionally restricted to a sector.
    pub fn by_market_cap<'a>(
        &'a self,
        bucket: MarketCap,
        sector: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Instrument> {
        self.instruments.iter().filter(move |i| {
            i.market_cap_bucket() == Some(bucket)
                && sector.is_none_or(|s| i.sector().eq_ignore_ascii_case(s))
        })
    }

    /// Returns the distinct sectors, sorted.
    #[must_use]
    pub fn sectors(&self) -> BTreeSet<&str> {
        self.instruments.iter().map(Instrument::sector).collect()
    }

    /// Returns the most recent successful update across all instruments.
    #[must_use]
    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.instruments.iter().filter_map(Instrument::last_update).max()
    }

    pub(crate) fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instrument(symbol: &str, sector: &str) -> Instrument {
        Instrument::new(symbol, sector, "Common stocks", format!("https://example.test/{symbol}"))
    }

    fn sample_registry(n: usize) -> Registry {
        Registry::from_instruments((0..n).map(|i| instrument(&format!("T{i:02}"), "Energy"))).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut registry = sample_registry(1);
        let result = registry.insert(instrument("T00", "Utilities"));
        assert!(matches!(result, Err(RegistryError::DuplicateSymbol(s)) if s == "T00"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_eligible_keeps_order_and_skips_fresh() {
        let mut registry = sample_registry(5);
        registry.mark_updated(["T01", "T03"], now() - TimeDelta::hours(1));
        registry.mark_updated(["T04"], now() - TimeDelta::days(2));

        let eligible: Vec<_> = registry
            .list_eligible(TimeDelta::hours(12), now())
            .iter()
            .map(|i| i.symbol())
            .collect();

        assert_eq!(eligible, vec!["T00", "T02", "T04"]);
    }

    #[test]
    fn test_select_batch_caps() {
        let registry = sample_registry(10);
        let batch = registry.select_batch(TimeDelta::hours(12), 4, now());

        let symbols: Vec<_> = batch.iter().map(Instrument::symbol).collect();
        assert_eq!(symbols, vec!["T00", "T01", "T02", "T03"]);
    }

    #[test]
    fn test_mark_updated_touches_only_given_symbols() {
        let mut registry = sample_registry(3);
        let summary = registry.mark_updated(["T01", "ZZZ"], now());

        assert_eq!(summary.updated, vec!["T01"]);
        assert_eq!(summary.unknown, vec!["ZZZ"]);
        assert_eq!(registry.get("T01").unwrap().last_update(), Some(now()));
        assert!(registry.get("T00").unwrap().last_update().is_none());
        assert!(registry.get("T02").unwrap().last_update().is_none());
    }

    #[test]
    fn test_mark_updated_never_moves_backwards() {
        let mut registry = sample_registry(1);
        registry.mark_updated(["T00"], now());
        let summary = registry.mark_updated(["T00"], now() - TimeDelta::hours(3));

        assert_eq!(summary.unchanged, vec!["T00"]);
        assert_eq!(registry.get("T00").unwrap().last_update(), Some(now()));
        assert_eq!(registry.latest_update(), Some(now()));
    }

    #[test]
    fn test_classification_queries() {
        let registry = Registry::from_instruments([
            instrument("XOM", "Energy").with_market_cap(Some(450_000_000_000)),
            instrument("CVX", "Energy").with_market_cap(Some(5_000_000_000)),
            instrument("DUK", "Utilities").with_market_cap(Some(75_000_000_000)),
        ])
        .unwrap();

        let energy: Vec<_> = registry.tickers_in_sector("energy").map(Instrument::symbol).collect();
        assert_eq!(energy, vec!["XOM", "CVX"]);

        let sectors = registry.sectors_of(["DUK", "NOPE", "XOM"]);
        assert_eq!(sectors.get("DUK"), Some(&"Utilities"));
        assert_eq!(sectors.len(), 2);

        let large: Vec<_> = registry
            .by_market_cap(MarketCap::Large, None)
            .map(Instrument::symbol)
            .collect();
        assert_eq!(large, vec!["DUK"]);

        let mid_energy: Vec<_> = registry
            .by_market_cap(MarketCap::Mid, Some("Energy"))
            .map(Instrument::symbol)
            .collect();
        assert_eq!(mid_energy, vec!["CVX"]);

        assert_eq!(registry.by_category("common stocks", Some("Utilities")).count(), 1);
        assert_eq!(registry.sectors().len(), 2);
    }
}

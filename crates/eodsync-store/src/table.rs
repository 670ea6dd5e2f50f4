//! Date-keyed wide table of adjusted closes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use eodsync_types::{DateFilter, FetchWindow, PricePoint, Series};

use crate::{Result, StoreError};

/// Name of the row-key column in every persisted form of the table.
pub const DATE_COLUMN: &str = "Date";

/// A table with one row per date and one nullable column per symbol.
///
/// Dates are strictly ascending and unique. Columns are kept in symbol
/// order and every column has exactly one cell per date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl WideTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with one empty row per day of `window` and no columns.
    #[must_use]
    pub fn skeleton(window: &FetchWindow) -> Self {
        Self {
            dates: window.days().collect(),
            columns: BTreeMap::new(),
        }
    }

    /// Builds a table from a date key and its columns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Shape`] if dates are not strictly ascending or
    /// a column's length differs from the number of dates.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(StoreError::Shape(format!(
                "dates not strictly ascending at {}",
                pair[1]
            )));
        }
        if let Some((name, cells)) = columns.iter().find(|(_, c)| c.len() != dates.len()) {
            return Err(StoreError::Shape(format!(
                "column {name} has {} cells for {} dates",
                cells.len(),
                dates.len()
            )));
        }
        Ok(Self { dates, columns })
    }

    /// Returns the row dates in ascending order.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Returns the cells of one column, if present.
    #[must_use]
    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    /// Returns true if the table has a column for `symbol`.
    #[must_use]
    pub fn has_column(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    /// Returns the value at `(symbol, date)`, if present and not null.
    #[must_use]
    pub fn value(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.columns.get(symbol)?[row]
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    /// Returns the number of symbol columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Returns the number of non-null cells.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.columns
            .values()
            .map(|cells| cells.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    /// Returns the first row date.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Returns the last row date.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Iterates rows as `(date, cells)` with cells in column order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<Option<f64>>)> + '_ {
        self.dates.iter().enumerate().map(|(row, date)| {
            let cells = self.columns.values().map(|c| c[row]).collect();
            (*date, cells)
        })
    }

    /// Adds a series as a column, keeping only points on existing row dates.
    ///
    /// An existing column of the same name is overwritten where the series
    /// has a value and left as is elsewhere.
    pub fn join_series(&mut self, series: &Series) {
        let hits: Vec<(usize, f64)> = series
            .points()
            .iter()
            .filter_map(|p| self.dates.binary_search(&p.date).ok().map(|row| (row, p.value)))
            .collect();
        let cells = self.ensure_column(series.symbol());
        for (row, value) in hits {
            cells[row] = Some(value);
        }
    }

    /// Merges `other` into this table, cell by cell.
    ///
    /// The result has the union of both row keys and both column sets.
    /// Where `other` has a value it replaces the current cell; a null in
    /// `other` never erases a stored value. Applying the same table twice
    /// gives the same result as applying it once.
    pub fn upsert(&mut self, other: &Self) {
        for name in other.columns.keys() {
            self.ensure_column(name);
        }

        for (other_row, date) in other.dates.iter().enumerate() {
            let row = match self.dates.binary_search(date) {
                Ok(row) => row,
                Err(row) => {
                    self.insert_row(row, *date);
                    row
                }
            };
            for (name, cells) in &other.columns {
                if let (Some(value), Some(target)) = (cells[other_row], self.columns.get_mut(name)) {
                    target[row] = Some(value);
                }
            }
        }
    }

    /// Removes every row whose cells are all null. Returns how many went.
    pub fn drop_empty_rows(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.dates.len())
            .map(|row| self.columns.values().any(|c| c[row].is_some()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }

        let mut flags = keep.iter();
        self.dates.retain(|_| *flags.next().unwrap_or(&false));
        for cells in self.columns.values_mut() {
            let mut flags = keep.iter();
            cells.retain(|_| *flags.next().unwrap_or(&false));
        }
        dropped
    }

    /// Returns the non-null history of each requested symbol that passes
    /// `filter`. Symbols without a column are omitted.
    #[must_use]
    pub fn price_history(
        &self,
        symbols: &[&str],
        filter: DateFilter,
    ) -> BTreeMap<String, Vec<PricePoint>> {
        symbols
            .iter()
            .filter_map(|symbol| {
                let cells = self.columns.get(*symbol)?;
                let points = self
                    .dates
                    .iter()
                    .zip(cells)
                    .filter(|(date, _)| filter.matches(**date))
                    .filter_map(|(date, cell)| cell.map(|v| PricePoint::new(*date, v)))
                    .collect();
                Some(((*symbol).to_string(), points))
            })
            .collect()
    }

    fn ensure_column(&mut self, name: &str) -> &mut Vec<Option<f64>> {
        let rows = self.dates.len();
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| vec![None; rows])
    }

    fn insert_row(&mut self, row: usize, date: NaiveDate) {
        self.dates.insert(row, date);
        for cells in self.columns.values_mut() {
            cells.insert(row, None);
        }
    }
}

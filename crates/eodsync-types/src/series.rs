//! Daily price observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::SeriesError;

/// One observed adjusted close for a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Calendar day of the observation.
    pub date: NaiveDate,
    /// Adjusted close.
    pub value: f64,
}

impl PricePoint {
    /// Creates a new price point.
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Date-ordered adjusted-close history for one instrument.
///
/// Holds at most one point per date, sorted ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    symbol: String,
    points: Vec<PricePoint>,
}

impl Series {
    /// Builds a series from unordered points.
    ///
    /// Points are sorted by date; when a date repeats, the point that came
    /// last in the input wins.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is NaN or infinite.
    pub fn new(
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = PricePoint>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        let mut points: Vec<PricePoint> = points.into_iter().collect();

        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(SeriesError::NonFinite {
                symbol,
                date: bad.date,
            });
        }

        // Stable sort keeps input order within a date; dedup then keeps the last.
        points.sort_by_key(|p| p.date);
        points.reverse();
        points.dedup_by_key(|p| p.date);
        points.reverse();

        Ok(Self { symbol, points })
    }

    /// Returns the instrument symbol naming this series.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the points in ascending date order.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Returns the value observed on `date`, if any.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].value)
    }

    /// Returns true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns the first and last observed dates.
    #[must_use]
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.points.first()?.date, self.points.last()?.date))
    }
}

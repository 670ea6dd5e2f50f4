//! Date predicates for history queries.

use chrono::{Months, NaiveDate};

/// Selects which history rows a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    /// Every stored row.
    #[default]
    All,
    /// Rows between two dates, both inclusive.
    Between {
        /// First date returned.
        start: NaiveDate,
        /// Last date returned.
        end: NaiveDate,
    },
    /// Rows from `months` months before `reference` through `reference`.
    Trailing {
        /// Number of calendar months to look back.
        months: u32,
        /// Last date returned, usually today.
        reference: NaiveDate,
    },
}

impl DateFilter {
    /// Returns true if `date` passes the filter.
    #[must_use]
    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::All => true,
            Self::Between { start, end } => date >= start && date <= end,
            Self::Trailing { months, reference } => {
                let start = reference
                    .checked_sub_months(Months::new(months))
                    .unwrap_or(NaiveDate::MIN);
                date >= start && date <= reference
            }
        }
    }
}

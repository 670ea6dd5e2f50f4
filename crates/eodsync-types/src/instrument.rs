//! Tradable instrument definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Market-capitalization bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCap {
    /// At least $200B.
    Mega,
    /// At least $10B.
    Large,
    /// At least $2B.
    Mid,
    /// At least $300M.
    Small,
    /// At least $50M.
    Micro,
    /// Below $50M.
    Nano,
}

impl MarketCap {
    /// Classifies a market capitalization given in dollars.
    #[must_use]
    pub fn from_value(dollars: u64) -> Self {
        const B: u64 = 1_000_000_000;
        const M: u64 = 1_000_000;
        match dollars {
            d if d >= 200 * B => Self::Mega,
            d if d >= 10 * B => Self::Large,
            d if d >= 2 * B => Self::Mid,
            d if d >= 300 * M => Self::Small,
            d if d >= 50 * M => Self::Micro,
            _ => Self::Nano,
        }
    }

    /// Returns the bucket as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mega => "mega",
            Self::Large => "large",
            Self::Mid => "mid",
            Self::Small => "small",
            Self::Micro => "micro",
            Self::Nano => "nano",
        }
    }

    /// Returns all buckets, largest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Mega,
            Self::Large,
            Self::Mid,
            Self::Small,
            Self::Micro,
            Self::Nano,
        ]
    }
}

impl std::fmt::Display for MarketCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a market-cap bucket name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown market cap bucket: {0}")]
pub struct MarketCapParseError(pub String);

impl std::str::FromStr for MarketCap {
    type Err = MarketCapParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|bucket| bucket.as_str() == lower)
            .ok_or_else(|| MarketCapParseError(s.to_string()))
    }
}

/// Represents a tradable security tracked by symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Unique ticker used as the history column name (e.g., "MSFT").
    symbol: String,
    /// Exchange code from the listings site (e.g., "UQ").
    #[serde(default)]
    exchange: String,
    /// Country of the listing exchange.
    #[serde(default)]
    country: String,
    /// Company name.
    #[serde(default)]
    description: String,
    /// GICS sector.
    sector: String,
    /// Security category (e.g., "Common stocks").
    category: String,
    /// Market capitalization in dollars, if known.
    #[serde(default)]
    market_cap: Option<u64>,
    /// Price-history URL with `{timestmp1}` / `{timestmp2}` placeholders.
    url_template: String,
    /// Last time a fetch for this instrument succeeded.
    #[serde(default)]
    last_update: Option<DateTime<Utc>>,
}

impl Instrument {
    /// Creates a new instrument that has never been fetched.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        sector: impl Into<String>,
        category: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: String::new(),
            country: String::new(),
            description: String::new(),
            sector: sector.into(),
            category: category.into(),
            market_cap: None,
            url_template: url_template.into(),
            last_update: None,
        }
    }

    /// Sets the listing exchange and country.
    #[must_use]
    pub fn with_listing(mut self, exchange: impl Into<String>, country: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self.country = country.into();
        self
    }

    /// Sets the company description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the market capitalization in dollars.
    #[must_use]
    pub const fn with_market_cap(mut self, dollars: Option<u64>) -> Self {
        self.market_cap = dollars;
        self
    }

    /// Returns the ticker symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the exchange code.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Returns the listing country.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Returns the company description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the sector tag.
    #[must_use]
    pub fn sector(&self) -> &str {
        &self.sector
    }

    /// Returns the category tag.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the market capitalization in dollars.
    #[must_use]
    pub const fn market_cap(&self) -> Option<u64> {
        self.market_cap
    }

    /// Returns the market-cap bucket, if the capitalization is known.
    #[must_use]
    pub fn market_cap_bucket(&self) -> Option<MarketCap> {
        self.market_cap.map(MarketCap::from_value)
    }

    /// Returns the URL template.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Returns the last successful update time.
    #[must_use]
    pub const fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Returns true if the instrument has not been updated since `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_update.is_none_or(|at| at < cutoff)
    }

    /// Records a successful fetch at `at`.
    ///
    /// The timestamp never moves backwards: returns false and leaves the
    /// instrument untouched if `at` is not later than the current value.
    pub fn record_update(&mut self, at: DateTime<Utc>) -> bool {
        if self.last_update.is_some_and(|current| at <= current) {
            return false;
        }
        self.last_update = Some(at);
        true
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.symbol)
        } else {
            write!(f, "{} ({})", self.description, self.symbol)
        }
    }
}

//! Bulk import of the instrument-discovery listings CSV.

use std::path::Path;

use csv_async::{AsyncReaderBuilder, StringRecord};
use eodsync_types::Instrument;

use crate::{Registry, RegistryError, Result};

/// GICS sectors (and the listing site's sector spellings) that are tracked.
pub const TRACKED_SECTORS: &[&str] = &[
    "Financials",
    "Communication Services",
    "Consumer Discretionary",
    "Information Technology",
    "Industrials",
    "Consumer Staples",
    "Energy",
    "Materials",
    "Health Care",
    "Capital Goods",
    "Real Estate",
    "Utilities",
    "Retailing",
    "Real Estate Development & Operations",
    "Commercial REITs",
    "Technology Hardware & Equipment",
    "Food Beverage & Tobacco",
    "Automobiles & Components",
    "Consumer Services",
    "Health Care Equipment & Services",
    "Consumer Durables & Apparel",
    "Banks",
    "Minerals",
    "Information technology",
];

/// Security category kept by the import.
const COMMON_STOCKS: &str = "Common stocks";

/// Price-history URL used when a listing row carries no link.
const DEFAULT_TEMPLATE: &str = "https://query1.finance.yahoo.com/v7/finance/download/{symbol}?period1={timestmp1}&period2={timestmp2}&interval=1d&events=history&includeAdjustedClose=true";

/// Counts reported by [`import_listings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows added to the registry.
    pub imported: usize,
    /// Rows whose symbol was already registered.
    pub skipped_duplicate: usize,
    /// Rows outside the tracked categories or sectors, or without a symbol.
    pub skipped_filtered: usize,
}

/// Column positions resolved from the listings header.
struct Columns {
    symbol: Option<usize>,
    source_symbol: Option<usize>,
    sector: usize,
    category: Option<usize>,
    link: Option<usize>,
    description: Option<usize>,
    exchange: Option<usize>,
    country: Option<usize>,
    market_cap: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let columns = Self {
            symbol: find("Symbol"),
            source_symbol: find("Yahoo_Symbol"),
            sector: find("GICS_Sector").ok_or_else(|| RegistryError::MissingColumn {
                path: path.to_path_buf(),
                column: "GICS_Sector",
            })?,
            category: find("Category2"),
            link: find("Yahoo_Listings_Link"),
            description: find("Description"),
            exchange: find("Exchange_ID"),
            country: find("Country"),
            market_cap: find("Market_Cap"),
        };

        if columns.symbol.is_none() && columns.source_symbol.is_none() {
            return Err(RegistryError::MissingColumn {
                path: path.to_path_buf(),
                column: "Symbol",
            });
        }
        Ok(columns)
    }

    fn instrument(&self, record: &StringRecord) -> Option<Instrument> {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        if field(self.category).is_some_and(|c| c != COMMON_STOCKS) {
            return None;
        }

        let sector = field(Some(self.sector))?;
        if !TRACKED_SECTORS.contains(&sector) {
            return None;
        }

        let symbol = field(self.source_symbol).or_else(|| field(self.symbol))?;
        let template = field(self.link)
            .map_or_else(|| DEFAULT_TEMPLATE.replace("{symbol}", symbol), str::to_string);
        let market_cap = field(self.market_cap).and_then(parse_market_cap);

        Some(
            Instrument::new(
                symbol,
                sector,
                field(self.category).unwrap_or(COMMON_STOCKS),
                template,
            )
            .with_listing(
                field(self.exchange).unwrap_or_default(),
                field(self.country).unwrap_or_default(),
            )
            .with_description(field(self.description).unwrap_or_default())
            .with_market_cap(market_cap),
        )
    }
}

/// Parses a market cap that may carry thousands separators.
fn parse_market_cap(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64)
}

/// Appends the instruments listed in a discovery CSV to `registry`.
///
/// Only common stocks in [`TRACKED_SECTORS`] are kept. The first row for
/// a symbol wins; later rows and symbols already registered are counted as
/// duplicates.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid CSV, or lacks
/// the sector or symbol columns.
pub async fn import_listings(path: &Path, registry: &mut Registry) -> Result<ImportSummary> {
    let csv_error = |e| RegistryError::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| RegistryError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut reader = AsyncReaderBuilder::new()
        .flexible(true)
        .create_reader(file);
    let headers = reader.headers().await.map_err(csv_error)?.clone();
    let columns = Columns::resolve(&headers, path)?;

    let mut summary = ImportSummary::default();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).await.map_err(csv_error)? {
        let Some(instrument) = columns.instrument(&record) else {
            summary.skipped_filtered += 1;
            continue;
        };

        if registry.contains(instrument.symbol()) {
            summary.skipped_duplicate += 1;
            continue;
        }
        registry.insert(instrument)?;
        summary.imported += 1;
    }

    tracing::info!(
        "Imported {} instruments from {} ({} duplicates, {} filtered)",
        summary.imported,
        path.display(),
        summary.skipped_duplicate,
        summary.skipped_filtered
    );
    Ok(summary)
}

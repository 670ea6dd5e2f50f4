//! Adjusted-close parsing from the upstream CSV payload.

use chrono::NaiveDate;
use csv_async::{AsyncReaderBuilder, StringRecord};
use eodsync_types::{FetchWindow, PricePoint, Series, SeriesError};
use thiserror::Error;

/// Header of the date column.
pub const DATE_COLUMN: &str = "Date";

/// Header of the adjusted-close column.
pub const ADJ_CLOSE_COLUMN: &str = "Adj Close";

/// Errors that can occur while parsing a price payload.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A required column is absent from the header.
    #[error("Missing column '{0}'")]
    MissingColumn(&'static str),

    /// A date cell could not be parsed.
    #[error("Invalid date '{value}' on line {line}")]
    InvalidDate {
        /// 1-based line number in the payload.
        line: u64,
        /// The offending cell.
        value: String,
    },

    /// The payload is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    /// The parsed points do not form a valid series.
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Parses a `Date, ..., Adj Close, ...` CSV payload into a series.
///
/// Columns are located by header name. Rows whose adjusted close is empty,
/// `null`, or not a number are skipped (the source emits these for
/// suspended days); rows dated outside `window` are dropped.
///
/// # Errors
///
/// Returns an error if a required column is missing, a date is malformed,
/// or the payload is not valid CSV.
pub async fn parse_adjusted_close(
    symbol: &str,
    body: &[u8],
    window: &FetchWindow,
) -> Result<Series, ParseError> {
    let mut reader = AsyncReaderBuilder::new()
        .trim(csv_async::Trim::All)
        .create_reader(body);

    let headers = reader.headers().await?.clone();
    let date_idx = column(&headers, DATE_COLUMN)?;
    let value_idx = column(&headers, ADJ_CLOSE_COLUMN)?;

    let mut points = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).await? {
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| ParseError::InvalidDate {
            line: record.position().map_or(0, csv_async::Position::line),
            value: raw_date.to_string(),
        })?;

        if !window.contains(date) {
            continue;
        }

        let Some(value) = record.get(value_idx).and_then(parse_value) else {
            continue;
        };
        points.push(PricePoint::new(date, value));
    }

    Ok(Series::new(symbol, points)?)
}

fn column(headers: &StringRecord, name: &'static str) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or(ParseError::MissingColumn(name))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, d).unwrap()
    }

    fn window() -> FetchWindow {
        FetchWindow::new(date(1), date(8)).unwrap()
    }

    const PAYLOAD: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2023-05-31,10,10,10,10,9.5,100
2023-06-01,10,11,9,10.5,10.1,200
2023-06-02,null,null,null,null,null,null
2023-06-05,11,12,10,11.5,11.25,300
2023-06-08,11,12,10,11.5,11.75,300
";

    #[tokio::test]
    async fn test_parse_adjusted_close() {
        let series = parse_adjusted_close("XOM", PAYLOAD.as_bytes(), &window())
            .await
            .unwrap();

        assert_eq!(series.symbol(), "XOM");
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.get(date(1)).unwrap(), 10.1);
        assert_relative_eq!(series.get(date(5)).unwrap(), 11.25);
        assert_eq!(series.get(date(2)), None);
    }

    #[tokio::test]
    async fn test_header_only_payload() {
        let series = parse_adjusted_close("XOM", b"Date,Adj Close\n", &window())
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_missing_adj_close_column() {
        let result = parse_adjusted_close("XOM", b"Date,Close\n2023-06-01,10\n", &window()).await;
        assert!(matches!(result, Err(ParseError::MissingColumn("Adj Close"))));
    }

    #[tokio::test]
    async fn test_html_error_page() {
        let body = b"<html><body>Too Many Requests</body></html>";
        let result = parse_adjusted_close("XOM", body, &window()).await;
        assert!(matches!(result, Err(ParseError::MissingColumn("Date"))));
    }

    #[tokio::test]
    async fn test_invalid_date() {
        let result =
            parse_adjusted_close("XOM", b"Date,Adj Close\nyesterday,10\n", &window()).await;
        assert!(matches!(result, Err(ParseError::InvalidDate { line: 2, .. })));
    }

    #[test]
    fn test_parse_date_with_time() {
        assert_eq!(parse_date("2023-06-05 00:00:00-04:00"), Some(date(5)));
        assert_eq!(parse_date("06/05/2023"), None);
    }
}

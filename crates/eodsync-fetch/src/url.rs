//! Price-history URL construction.

use eodsync_types::FetchWindow;

/// Placeholder replaced by the window start (Unix seconds).
pub const START_PLACEHOLDER: &str = "{timestmp1}";

/// Placeholder replaced by the window end (Unix seconds).
pub const END_PLACEHOLDER: &str = "{timestmp2}";

/// Builds the request URL for an instrument's template and window.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use eodsync_fetch::url::expand_template;
/// use eodsync_types::FetchWindow;
///
/// let window = FetchWindow::new(
///     NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2023, 10, 16).unwrap(),
/// )
/// .unwrap();
/// let url = expand_template("https://q.test/MSFT?period1={timestmp1}&period2={timestmp2}", &window);
/// assert_eq!(url, "https://q.test/MSFT?period1=946684800&period2=1697414400");
/// ```
#[must_use]
pub fn expand_template(template: &str, window: &FetchWindow) -> String {
    template
        .replace(START_PLACEHOLDER, &window.start_timestamp().to_string())
        .replace(END_PLACEHOLDER, &window.end_timestamp().to_string())
}

/// Returns true if the template carries both window placeholders.
#[must_use]
pub fn has_placeholders(template: &str) -> bool {
    template.contains(START_PLACEHOLDER) && template.contains(END_PLACEHOLDER)
}

//! HTTP client for the upstream price source.

use std::time::Duration;

use eodsync_types::{FetchWindow, Instrument, Series};
use reqwest::Client;
use reqwest::header::{CONNECTION, EXPIRES, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use thiserror::Error;

use crate::parse::{ParseError, parse_adjusted_close};
use crate::url::expand_template;

/// Desktop-browser user agent; the source throttles unfamiliar signatures.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/54.0.2840.99 Safari/537.36";

/// Configuration for the source client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Why a single instrument fetch failed.
#[derive(Error, Debug)]
pub enum FetchCause {
    /// The server answered with something other than 200.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The payload could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// A failed fetch for one instrument.
#[derive(Error, Debug)]
#[error("{symbol}: {cause}")]
pub struct FetchError {
    /// The instrument symbol.
    pub symbol: String,
    /// The underlying cause.
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    /// Creates a fetch error for a symbol.
    pub fn new(symbol: impl Into<String>, cause: impl Into<FetchCause>) -> Self {
        Self {
            symbol: symbol.into(),
            cause: cause.into(),
        }
    }

    /// Returns true if the upstream signalled rate limiting.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(self.cause, FetchCause::Status(429))
    }
}

/// HTTP client issuing one bounded request per instrument.
///
/// Retries are deliberately absent; an instrument that fails stays stale
/// in the registry and is retried by a later run.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
    config: ClientConfig,
}

impl SourceClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(EXPIRES, HeaderValue::from_static("-1"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the adjusted-close series for one instrument and window.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] carrying the symbol on any non-200 status,
    /// transport failure, timeout, or malformed payload.
    pub async fn fetch(
        &self,
        instrument: &Instrument,
        window: &FetchWindow,
    ) -> Result<Series, FetchError> {
        let symbol = instrument.symbol();
        let url = expand_template(instrument.url_template(), window);
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::new(symbol, classify(e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::new(symbol, FetchCause::Status(status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::new(symbol, classify(e)))?;

        parse_adjusted_close(symbol, &body, window)
            .await
            .map_err(|e| FetchError::new(symbol, e))
    }
}

fn classify(error: reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else {
        FetchCause::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn window() -> FetchWindow {
        FetchWindow::new(
            NaiveDate::from_ymd_opt(2023, 6, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 5).unwrap(),
        )
        .unwrap()
    }

    fn instrument(base: &str) -> Instrument {
        Instrument::new(
            "XOM",
            "Energy",
            "Common stocks",
            format!("{base}/XOM?period1={{timestmp1}}&period2={{timestmp2}}"),
        )
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers one request with `response` and returns the request text.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (base, handle)
    }

    fn client() -> SourceClient {
        SourceClient::new(ClientConfig {
            timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = SourceClient::with_defaults();
        assert!(client.is_ok());
    }

    #[test]
    fn test_fetch_error_display() {
        let error = FetchError::new("XOM", FetchCause::Status(429));
        assert_eq!(error.to_string(), "XOM: HTTP status 429");
        assert!(error.is_throttled());
        assert!(!FetchError::new("XOM", FetchCause::Timeout).is_throttled());
    }

    #[tokio::test]
    async fn test_fetch_parses_ok_response() {
        let body = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                    2023-06-02,1,1,1,1,101.5,100\n\
                    2023-06-03,null,null,null,null,null,null\n\
                    2023-06-05,1,1,1,1,103.0,100\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (base, server) = serve_once(response).await;

        let series = client().fetch(&instrument(&base), &window()).await.unwrap();

        assert_eq!(series.symbol(), "XOM");
        assert_eq!(series.len(), 1);
        assert_relative_eq!(
            series.get(NaiveDate::from_ymd_opt(2023, 6, 2).unwrap()).unwrap(),
            101.5
        );

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /xom?period1=1685664000&period2=1685923200 "));
        assert!(request.contains("user-agent: mozilla/5.0 (windows nt 10.0; wow64)"));
        assert!(request.contains("expires: -1"));
        assert!(request.contains("upgrade-insecure-requests: 1"));
    }

    #[tokio::test]
    async fn test_fetch_non_ok_status() {
        let response =
            "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string();
        let (base, server) = serve_once(response).await;

        let error = client().fetch(&instrument(&base), &window()).await.unwrap_err();

        assert_eq!(error.symbol, "XOM");
        assert!(matches!(error.cause, FetchCause::Status(429)));
        assert!(error.is_throttled());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });
        let client = SourceClient::new(ClientConfig {
            timeout: Duration::from_millis(50),
            ..ClientConfig::default()
        })
        .unwrap();

        let error = client.fetch(&instrument(&base), &window()).await.unwrap_err();

        assert_eq!(error.symbol, "XOM");
        assert!(matches!(error.cause, FetchCause::Timeout));
        server.abort();
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let error = client().fetch(&instrument(&base), &window()).await.unwrap_err();

        assert_eq!(error.symbol, "XOM");
        assert!(matches!(error.cause, FetchCause::Http(_)));
    }
}

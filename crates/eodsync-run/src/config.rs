//! Run configuration.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use eodsync_fetch::{BROWSER_USER_AGENT, ClientConfig};
use eodsync_types::{DEFAULT_EPOCH, write_atomic};
use serde::{Deserialize, Serialize};

use crate::{Result, RunError};

/// Tunables for a run, stored as `config.json` in the data directory.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of instruments fetched per run.
    pub batch_size: usize,
    /// Hours after which an instrument is due again.
    pub staleness_hours: u32,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Pause between consecutive requests in milliseconds.
    pub request_delay_ms: u64,
    /// First day of history when the table is empty.
    pub epoch: NaiveDate,
    /// User agent sent to the source.
    pub user_agent: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            staleness_hours: 12,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            request_delay_ms: 0,
            epoch: DEFAULT_EPOCH,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl RunConfig {
    /// Loads the config at `path`, or the defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| RunError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| RunError::ParseConfig {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, |w| w.write_all(json.as_bytes())).map_err(|source| {
            RunError::WriteConfig {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RunError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(RunError::InvalidConfig(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(RunError::InvalidConfig(
                "connect_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Returns the staleness threshold.
    #[must_use]
    pub fn staleness(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.staleness_hours))
    }

    /// Returns the pause between requests.
    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Returns the HTTP client settings.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.staleness(), TimeDelta::hours(12));
        assert_eq!(config.epoch, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert!(config.request_delay().is_zero());
        assert_eq!(config.client_config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "batch_size": 25, "epoch": "2010-01-04" }"#).unwrap();

        let config = RunConfig::load(&path).unwrap();

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.epoch, NaiveDate::from_ymd_opt(2010, 1, 4).unwrap());
        assert_eq!(config.staleness_hours, 12);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = RunConfig {
            request_delay_ms: 250,
            ..RunConfig::default()
        };

        config.save(&path).unwrap();

        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "batch_size": 0 }"#).unwrap();
        assert!(matches!(RunConfig::load(&path), Err(RunError::InvalidConfig(_))));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RunConfig::load(&path), Err(RunError::ParseConfig { .. })));
    }
}

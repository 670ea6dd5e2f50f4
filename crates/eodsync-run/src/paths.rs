//! Data directory layout.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use eodsync_registry::RegistryStore;
use eodsync_store::{ArtifactStore, HistoryStore, Reconciler};

use crate::{Result, RunError};

/// File holding the instrument registry.
pub const REGISTRY_FILE: &str = "registry.json";
/// File holding the consolidated history table.
pub const HISTORY_FILE: &str = "history.parquet";
/// Directory of outstanding partial artifacts.
pub const PARTIALS_DIR: &str = "partials";
/// Exclusive run lock.
pub const LOCK_FILE: &str = "run.lock";
/// Optional run configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Root directory holding every persisted file.
///
/// ```text
/// <root>/
///   registry.json
///   history.parquet
///   partials/
///     archive/
///   run.lock
///   config.json
/// ```
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Opens the data directory at `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let partials = root.join(PARTIALS_DIR);

        for path in [&root, &partials] {
            if !path.exists() {
                fs::create_dir_all(path).map_err(|source| RunError::CreateDir {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        Ok(Self { root })
    }

    /// Returns the default data directory.
    ///
    /// Uses the platform data directory from the `directories` crate:
    /// - Linux: `~/.local/share/eodsync/`
    /// - macOS: `~/Library/Application Support/eodsync/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\eodsync\`
    ///
    /// Falls back to `~/.eodsync/` if that cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "eodsync")
            .map_or_else(home_fallback, |dirs| dirs.data_dir().to_path_buf())
    }

    /// Opens the data directory at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Returns the history table path.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Returns the outstanding-artifact directory.
    #[must_use]
    pub fn partials_dir(&self) -> PathBuf {
        self.root.join(PARTIALS_DIR)
    }

    /// Returns the run lock path.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Returns the config file path.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Returns a handle on the registry file.
    #[must_use]
    pub fn registry_store(&self) -> RegistryStore {
        RegistryStore::new(self.registry_path())
    }

    /// Returns a handle on the history table.
    #[must_use]
    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::new(self.history_path())
    }

    /// Returns a handle on the artifact directory.
    #[must_use]
    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(self.partials_dir())
    }

    /// Returns a reconciler over this directory's stores.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.history_store(), self.artifact_store())
    }
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".eodsync")
}

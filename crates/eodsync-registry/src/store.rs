//! Registry persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use eodsync_types::{Instrument, write_atomic};
use serde::{Deserialize, Serialize};

use crate::{Registry, RegistryError, Result};

/// On-disk layout of the registry file.
#[derive(Serialize, Deserialize)]
struct RegistryFile {
    instruments: Vec<Instrument>,
}

/// Loads and persists the registry as a single JSON file.
///
/// Every persist rewrites the whole file through a temporary sibling and
/// a rename, so readers see either the old or the new registry.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a registry has been persisted.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the whole registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if nothing was persisted yet, or
    /// an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Registry> {
        if !self.path.exists() {
            return Err(RegistryError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| RegistryError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;

        let file: RegistryFile =
            serde_json::from_str(&content).map_err(|e| RegistryError::ParseJson {
                path: self.path.clone(),
                source: e,
            })?;

        let registry = Registry::from_instruments(file.instruments)?;
        tracing::debug!(
            "Loaded {} instruments from {}",
            registry.len(),
            self.path.display()
        );
        Ok(registry)
    }

    /// Replaces the persisted registry with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails. On
    /// failure the previously persisted registry is left intact.
    pub fn persist(&self, registry: &Registry) -> Result<()> {
        let file = RegistryFile {
            instruments: registry.instruments().to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        write_atomic(&self.path, |w| w.write_all(&json)).map_err(|e| {
            RegistryError::WriteFile {
                path: self.path.clone(),
                source: e,
            }
        })?;

        tracing::debug!(
            "Persisted {} instruments to {}",
            registry.len(),
            self.path.display()
        );
        Ok(())
    }
}

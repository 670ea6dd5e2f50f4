//! Partial writes and consolidation of fetched history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use eodsync_types::{FetchWindow, Series};

use crate::{ArtifactMeta, ArtifactStore, HistoryStore, Result, WideTable};

/// Builds the block a partial run writes: the window's calendar days
/// left-joined with every fetched series, all-null rows dropped.
#[must_use]
pub fn partial_block(window: &FetchWindow, fetched: &BTreeMap<String, Series>) -> WideTable {
    let mut block = WideTable::skeleton(window);
    for series in fetched.values() {
        block.join_series(series);
    }
    let dropped = block.drop_empty_rows();
    tracing::debug!(
        "Partial block for {window}: {} rows kept, {dropped} empty rows dropped",
        block.row_count()
    );
    block
}

/// Folds `blocks` into `existing` and returns the new table.
///
/// Blocks are applied in order, so a later block wins where two disagree.
/// Existing columns absent from every block are carried through
/// unchanged. Rows left entirely null are dropped.
#[must_use]
pub fn consolidate(existing: &WideTable, blocks: &[WideTable]) -> WideTable {
    let mut merged = existing.clone();
    for block in blocks {
        merged.upsert(block);
    }
    merged.drop_empty_rows();
    merged
}

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Outstanding artifacts were folded into the history table.
    Consolidated {
        /// Artifacts consumed, now archived.
        consumed: Vec<ArtifactMeta>,
        /// Rows in the table after the commit.
        rows: usize,
        /// Columns in the table after the commit.
        columns: usize,
    },
    /// The fetched block was written as a new artifact.
    PartialWrite {
        /// The artifact written.
        artifact: ArtifactMeta,
        /// Rows in the artifact.
        rows: usize,
    },
}

/// Applies the drain rule to one run's fetched data.
///
/// With data in hand the run writes a partial artifact and leaves the
/// history table alone. With nothing fetched, every outstanding artifact
/// up to the processing day is folded into the table in a single atomic
/// replace and then archived.
#[derive(Debug, Clone)]
pub struct Reconciler {
    history: HistoryStore,
    artifacts: ArtifactStore,
}

impl Reconciler {
    /// Creates a reconciler over the given stores.
    #[must_use]
    pub const fn new(history: HistoryStore, artifacts: ArtifactStore) -> Self {
        Self { history, artifacts }
    }

    /// Returns the history store.
    #[must_use]
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Returns the artifact store.
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Writes a partial artifact if anything was fetched, otherwise
    /// consolidates.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or written. A failed
    /// consolidation leaves the history table and the artifacts as they
    /// were.
    pub fn reconcile(
        &self,
        window: &FetchWindow,
        fetched: &BTreeMap<String, Series>,
        processing_day: NaiveDate,
    ) -> Result<Reconciliation> {
        if fetched.is_empty() {
            return self.consolidate(processing_day);
        }

        let block = partial_block(window, fetched);
        let artifact = self.artifacts.write(processing_day, &block)?;
        Ok(Reconciliation::PartialWrite {
            artifact,
            rows: block.row_count(),
        })
    }

    /// Folds every artifact written on or before `processing_day` into the
    /// history table, then archives them.
    ///
    /// With no outstanding artifacts the table is not rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if an artifact or the table cannot be read, or the
    /// table cannot be replaced.
    pub fn consolidate(&self, processing_day: NaiveDate) -> Result<Reconciliation> {
        let pending = self.artifacts.outstanding_through(processing_day)?;
        let existing = self.history.load()?;

        if pending.is_empty() {
            tracing::info!("Nothing to consolidate");
            return Ok(Reconciliation::Consolidated {
                consumed: Vec::new(),
                rows: existing.row_count(),
                columns: existing.column_count(),
            });
        }

        let blocks = pending
            .iter()
            .map(|meta| self.artifacts.read(meta))
            .collect::<Result<Vec<_>>>()?;
        let merged = consolidate(&existing, &blocks);
        self.history.save(&merged)?;

        // Archive only after the commit; re-applying an artifact is a no-op.
        self.artifacts.archive(&pending)?;

        tracing::info!(
            "Consolidated {} artifacts: {} -> {} rows, {} columns",
            pending.len(),
            existing.row_count(),
            merged.row_count(),
            merged.column_count()
        );
        Ok(Reconciliation::Consolidated {
            consumed: pending,
            rows: merged.row_count(),
            columns: merged.column_count(),
        })
    }
}

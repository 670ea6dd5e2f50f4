//! Run and status reports.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use eodsync_types::{FetchWindow, RunMode};
use serde::Serialize;
use uuid::Uuid;

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The history table is already current; nothing was fetched or written.
    NoOp,
    /// Outstanding artifacts were folded into the history table.
    Consolidated {
        /// Number of artifacts consumed.
        consumed: usize,
        /// Rows in the table after the commit.
        rows: usize,
        /// Columns in the table after the commit.
        columns: usize,
    },
    /// A new partial artifact was written.
    PartialWrite {
        /// Path of the artifact.
        artifact: PathBuf,
        /// Rows in the artifact.
        rows: usize,
    },
}

impl RunOutcome {
    /// Returns a short label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Consolidated { .. } => "consolidated",
            Self::PartialWrite { .. } => "partial write",
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique identifier of the run, also attached to its log lines.
    pub run_id: Uuid,
    /// Window end policy.
    pub mode: RunMode,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Window requested, absent for a no-op or a forced consolidation.
    pub window: Option<FetchWindow>,
    /// Symbols fetched, in registry order.
    pub attempted: Vec<String>,
    /// Symbols that fetched successfully.
    pub succeeded: Vec<String>,
    /// Failure cause keyed by symbol.
    pub failed: BTreeMap<String, String>,
    /// What the run did.
    pub outcome: RunOutcome,
}

impl RunReport {
    pub(crate) fn new(run_id: Uuid, mode: RunMode, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            mode,
            started_at,
            window: None,
            attempted: Vec::new(),
            succeeded: Vec::new(),
            failed: BTreeMap::new(),
            outcome: RunOutcome::NoOp,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({})", self.run_id, self.mode)?;
        match &self.window {
            Some(window) => writeln!(f, "  Window:     {window}")?,
            None => writeln!(f, "  Window:     -")?,
        }
        writeln!(f, "  Attempted:  {}", self.attempted.len())?;
        writeln!(f, "  Succeeded:  {}", self.succeeded.len())?;
        writeln!(f, "  Failed:     {}", self.failed.len())?;
        for (symbol, cause) in &self.failed {
            writeln!(f, "    {symbol}: {cause}")?;
        }
        match &self.outcome {
            RunOutcome::NoOp => write!(f, "  Outcome:    no-op (history is current)"),
            RunOutcome::Consolidated {
                consumed,
                rows,
                columns,
            } => write!(
                f,
                "  Outcome:    consolidated {consumed} artifacts ({rows} rows, {columns} columns)"
            ),
            RunOutcome::PartialWrite { artifact, rows } => write!(
                f,
                "  Outcome:    partial write {} ({rows} rows)",
                artifact.display()
            ),
        }
    }
}

/// Snapshot of the data directory.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Instruments in the registry.
    pub instruments: usize,
    /// Instruments currently due for a fetch.
    pub eligible: usize,
    /// Most recent registry stamp.
    pub last_update: Option<DateTime<Utc>>,
    /// First date in the history table.
    pub first_date: Option<NaiveDate>,
    /// Last date in the history table.
    pub last_date: Option<NaiveDate>,
    /// Symbol columns in the history table.
    pub columns: usize,
    /// Partial artifacts waiting for consolidation.
    pub outstanding: Vec<PathBuf>,
    /// Window the next daily run would request.
    pub next_window: Option<FetchWindow>,
    /// PID holding the run lock, if any.
    pub locked_by: Option<u32>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registry")?;
        writeln!(f, "  Instruments:  {}", self.instruments)?;
        writeln!(f, "  Eligible:     {}", self.eligible)?;
        match self.last_update {
            Some(at) => writeln!(f, "  Last update:  {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => writeln!(f, "  Last update:  never")?,
        }
        writeln!(f, "History")?;
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => writeln!(f, "  Dates:        {first} to {last}")?,
            _ => writeln!(f, "  Dates:        empty")?,
        }
        writeln!(f, "  Columns:      {}", self.columns)?;
        writeln!(f, "  Outstanding:  {} artifacts", self.outstanding.len())?;
        match &self.next_window {
            Some(window) => writeln!(f, "  Next window:  {window}")?,
            None => writeln!(f, "  Next window:  none (current)")?,
        }
        match self.locked_by {
            Some(pid) => write!(f, "  Lock:         held by process {pid}"),
            None => write!(f, "  Lock:         free"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RunOutcome::NoOp.label(), "no-op");
        assert_eq!(
            RunOutcome::PartialWrite {
                artifact: PathBuf::from("p.csv"),
                rows: 1
            }
            .label(),
            "partial write"
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = RunReport::new(Uuid::nil(), RunMode::Daily, Utc::now());
        report.attempted = vec!["XOM".into(), "CVX".into()];
        report.succeeded = vec!["XOM".into()];
        report.failed.insert("CVX".into(), "HTTP status 429".into());
        report.outcome = RunOutcome::PartialWrite {
            artifact: PathBuf::from("partials/partial_20240102_0001_1.csv"),
            rows: 1,
        };

        let text = report.to_string();
        assert!(text.contains("Attempted:  2"));
        assert!(text.contains("CVX: HTTP status 429"));
        assert!(text.contains("partial_20240102_0001_1.csv"));
    }

    #[test]
    fn test_outcome_serializes_with_kind() {
        let json = serde_json::to_string(&RunOutcome::NoOp).unwrap();
        assert_eq!(json, r#"{"kind":"no_op"}"#);
    }
}

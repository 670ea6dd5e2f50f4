//! The run state machine.

use chrono::{DateTime, Utc};
use eodsync_fetch::{PriceSource, run_batch};
use eodsync_store::Reconciliation;
use eodsync_types::{FetchWindow, Instrument, RunMode};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::lock::{RunLock, read_holder};
use crate::{DataDir, Result, RunConfig, RunOutcome, RunReport, StatusReport};

/// Observer for a run's fetch loop.
///
/// Both methods default to doing nothing, so `()` can be passed when no
/// feedback is wanted.
pub trait RunProgress {
    /// Called once the window is known and the batch is selected.
    fn batch_selected(&mut self, _window: &FetchWindow, _batch: &[Instrument]) {}

    /// Called after each instrument with whether its fetch succeeded.
    fn instrument_done(&mut self, _instrument: &Instrument, _succeeded: bool) {}
}

impl RunProgress for () {}

/// Runs the pipeline once per call against one data directory.
///
/// Each call takes the run lock, computes the window from the history
/// table, fetches the capped batch of stale instruments, and reconciles:
///
/// - window empty: [`RunOutcome::NoOp`], nothing is written;
/// - something fetched: [`RunOutcome::PartialWrite`], and only the
///   instruments that succeeded get a new `last_update`;
/// - nothing fetched: [`RunOutcome::Consolidated`], and no timestamp moves.
#[derive(Debug)]
pub struct RunController<S> {
    data: DataDir,
    config: RunConfig,
    source: S,
}

impl<S: PriceSource> RunController<S> {
    /// Creates a controller.
    pub const fn new(data: DataDir, config: RunConfig, source: S) -> Self {
        Self {
            data,
            config,
            source,
        }
    }

    /// Returns the data directory.
    pub const fn data(&self) -> &DataDir {
        &self.data
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Executes one run.
    ///
    /// `now` is the run's clock: its UTC date is the processing day and it
    /// is the timestamp stamped on updated instruments.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held, or the registry, history table
    /// or artifacts cannot be read or written. Individual fetch failures
    /// are not errors; they are listed in the report.
    pub async fn run<P>(&self, mode: RunMode, now: DateTime<Utc>, progress: &mut P) -> Result<RunReport>
    where
        P: RunProgress + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", id = %run_id, %mode);
        self.run_locked(run_id, mode, now, progress)
            .instrument(span)
            .await
    }

    async fn run_locked<P>(
        &self,
        run_id: Uuid,
        mode: RunMode,
        now: DateTime<Utc>,
        progress: &mut P,
    ) -> Result<RunReport>
    where
        P: RunProgress + ?Sized,
    {
        let _lock = RunLock::acquire(self.data.lock_path())?;
        let mut report = RunReport::new(run_id, mode, now);
        let today = now.date_naive();

        let registry_store = self.data.registry_store();
        let mut registry = registry_store.load()?;
        let reconciler = self.data.reconciler();
        let last_persisted = reconciler.history().load()?.latest_date();

        let Some(window) = FetchWindow::compute(last_persisted, today, mode, self.config.epoch)
        else {
            tracing::info!(
                "History is current (last date {}), nothing to do",
                last_persisted.map_or_else(|| "-".to_string(), |d| d.to_string())
            );
            return Ok(report);
        };
        report.window = Some(window);

        let batch =
            registry.select_batch(self.config.staleness(), self.config.batch_size, now);
        tracing::info!(
            "Window {window} ({} days): {} of {} instruments selected",
            window.total_days(),
            batch.len(),
            registry.len()
        );
        progress.batch_selected(&window, &batch);

        let outcome = run_batch(
            &self.source,
            &batch,
            &window,
            self.config.request_delay(),
            |instrument, ok| progress.instrument_done(instrument, ok),
        )
        .await;

        report.attempted = batch.iter().map(|i| i.symbol().to_string()).collect();
        report.succeeded = batch
            .iter()
            .filter(|i| outcome.fetched.contains_key(i.symbol()))
            .map(|i| i.symbol().to_string())
            .collect();
        report.failed = outcome.failed.clone();

        if outcome.is_drained() && !batch.is_empty() {
            let failed: Vec<&str> = outcome.failed_symbols().into_iter().collect();
            tracing::warn!(
                "Every fetch failed ({}); treating the source as drained",
                failed.join(", ")
            );
        }

        match reconciler.reconcile(&window, &outcome.fetched, today)? {
            Reconciliation::PartialWrite { artifact, rows } => {
                let marked =
                    registry.mark_updated(outcome.succeeded(), now);
                registry_store.persist(&registry)?;
                tracing::info!(
                    "Stamped {} instruments ({} unchanged)",
                    marked.updated.len(),
                    marked.unchanged.len()
                );
                report.outcome = RunOutcome::PartialWrite {
                    artifact: artifact.path,
                    rows,
                };
            }
            Reconciliation::Consolidated {
                consumed,
                rows,
                columns,
            } => {
                report.outcome = RunOutcome::Consolidated {
                    consumed: consumed.len(),
                    rows,
                    columns,
                };
            }
        }

        tracing::info!("Run finished: {}", report.outcome.label());
        Ok(report)
    }

    /// Folds every outstanding artifact into the history table without
    /// fetching anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held or persistence fails.
    pub fn consolidate(&self, now: DateTime<Utc>) -> Result<RunReport> {
        consolidate(&self.data, now)
    }

    /// Describes the data directory without taking the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry, table or artifact directory cannot
    /// be read.
    pub fn status(&self, now: DateTime<Utc>) -> Result<StatusReport> {
        status(&self.data, &self.config, now)
    }
}

/// Folds every outstanding artifact in `data` into its history table.
///
/// # Errors
///
/// Returns an error if the lock is held or persistence fails.
pub fn consolidate(data: &DataDir, now: DateTime<Utc>) -> Result<RunReport> {
    let _lock = RunLock::acquire(data.lock_path())?;
    let mut report = RunReport::new(Uuid::new_v4(), RunMode::Daily, now);

    if let Reconciliation::Consolidated {
        consumed,
        rows,
        columns,
    } = data.reconciler().consolidate(now.date_naive())?
    {
        report.outcome = RunOutcome::Consolidated {
            consumed: consumed.len(),
            rows,
            columns,
        };
    }
    Ok(report)
}

/// Describes `data` without taking the lock.
///
/// # Errors
///
/// Returns an error if the registry, table or artifact directory cannot be
/// read.
pub fn status(data: &DataDir, config: &RunConfig, now: DateTime<Utc>) -> Result<StatusReport> {
    let registry = data.registry_store().load()?;
    let reconciler = data.reconciler();
    let table = reconciler.history().load()?;
    let outstanding = reconciler.artifacts().outstanding()?;

    Ok(StatusReport {
        instruments: registry.len(),
        eligible: registry.list_eligible(config.staleness(), now).len(),
        last_update: registry.latest_update(),
        first_date: table.first_date(),
        last_date: table.latest_date(),
        columns: table.column_count(),
        outstanding: outstanding.into_iter().map(|m| m.path).collect(),
        next_window: FetchWindow::compute(
            table.latest_date(),
            now.date_naive(),
            RunMode::Daily,
            config.epoch,
        ),
        locked_by: read_holder(&data.lock_path()).map(|h| h.pid),
    })
}

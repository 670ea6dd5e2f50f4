//! Parquet persistence of the consolidated history table.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::temporal_conversions::date32_to_datetime;
use eodsync_types::write_atomic;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::table::DATE_COLUMN;
use crate::{Result, StoreError, WideTable};

/// The consolidated history table on disk.
///
/// One Parquet file: a non-null `Date32` key column followed by a nullable
/// `Float64` column per symbol in symbol order. The file is only ever
/// replaced whole, so readers see either the previous or the new table.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a table has been persisted.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the persisted table; a missing file is an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// history table.
    pub fn load(&self) -> Result<WideTable> {
        if !self.exists() {
            return Ok(WideTable::new());
        }

        let file = File::open(&self.path).map_err(|source| StoreError::ReadFile {
            path: self.path.clone(),
            source,
        })?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| self.parquet_error(e))?;
        let symbols: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .filter(|name| name != DATE_COLUMN)
            .collect();
        let reader = builder.build().map_err(|e| self.parquet_error(e))?;

        let mut dates = Vec::new();
        let mut columns: BTreeMap<String, Vec<Option<f64>>> =
            symbols.iter().map(|s| (s.clone(), Vec::new())).collect();

        for batch in reader {
            let batch = batch.map_err(|e| self.parquet_error(e))?;

            let keys = batch
                .column_by_name(DATE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Date32Array>())
                .ok_or_else(|| self.parquet_error("missing Date32 key column"))?;
            for days in keys.iter() {
                let date = days
                    .and_then(date32_to_datetime)
                    .map(|at| at.date())
                    .ok_or_else(|| self.parquet_error("null or out-of-range date"))?;
                dates.push(date);
            }

            for (symbol, cells) in &mut columns {
                let values = batch
                    .column_by_name(symbol)
                    .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
                    .ok_or_else(|| self.parquet_error(format!("column {symbol} is not Float64")))?;
                cells.extend(values.iter());
            }
        }

        let table = WideTable::from_columns(dates, columns)?;
        tracing::debug!(
            "Loaded history {}: {} rows, {} columns",
            self.path.display(),
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    /// Replaces the persisted table with `table` in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be encoded or the file cannot
    /// be replaced. The previous file is untouched on failure.
    pub fn save(&self, table: &WideTable) -> Result<()> {
        let batch = self.to_batch(table)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
            .map_err(|e| self.parquet_error(e))?;
        writer.write(&batch).map_err(|e| self.parquet_error(e))?;
        writer.close().map_err(|e| self.parquet_error(e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_atomic(&self.path, |w| w.write_all(&buffer)).map_err(|source| {
            StoreError::WriteFile {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::info!(
            "Saved history {}: {} rows, {} columns",
            self.path.display(),
            table.row_count(),
            table.column_count()
        );
        Ok(())
    }

    fn to_batch(&self, table: &WideTable) -> Result<RecordBatch> {
        let mut fields = vec![Field::new(DATE_COLUMN, DataType::Date32, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Date32Array::from(
            table.dates().iter().map(|d| Date32Type::from_naive_date(*d)).collect::<Vec<_>>(),
        ))];

        for symbol in table.column_names() {
            if symbol == DATE_COLUMN {
                return Err(StoreError::InvalidColumn(symbol.to_string()));
            }
            fields.push(Field::new(symbol, DataType::Float64, true));
            let cells = table.column(symbol).unwrap_or_default();
            arrays.push(Arc::new(Float64Array::from(cells.to_vec())));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| self.parquet_error(e))
    }

    fn parquet_error(&self, error: impl ToString) -> StoreError {
        StoreError::Parquet {
            path: self.path.clone(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use eodsync_types::{FetchWindow, PricePoint, Series};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample() -> WideTable {
        let window = FetchWindow::new(day(1), day(8)).unwrap();
        let mut table = WideTable::skeleton(&window);
        table.join_series(
            &Series::new(
                "XOM",
                [PricePoint::new(day(1), 101.25), PricePoint::new(day(4), 102.5)],
            )
            .unwrap(),
        );
        table.join_series(&Series::new("CVX", [PricePoint::new(day(5), 150.0)]).unwrap());
        table.drop_empty_rows();
        table
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.parquet"));

        assert!(!store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.parquet"));
        let table = sample();

        store.save(&table).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.dates(), &[day(1), day(4), day(5)]);
        assert_eq!(loaded.column_names().collect::<Vec<_>>(), vec!["CVX", "XOM"]);
        assert_relative_eq!(loaded.value("XOM", day(4)).unwrap(), 102.5);
        assert_eq!(loaded.value("XOM", day(5)), None);
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.parquet"));

        store.save(&WideTable::new()).unwrap();

        assert!(store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_previous_table() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.parquet"));
        store.save(&sample()).unwrap();

        let mut grown = sample();
        grown.upsert(&{
            let window = FetchWindow::new(day(7), day(8)).unwrap();
            let mut t = WideTable::skeleton(&window);
            t.join_series(&Series::new("XOM", [PricePoint::new(day(7), 103.0)]).unwrap());
            t
        });
        store.save(&grown).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.latest_date(), Some(day(7)));
        assert_eq!(loaded.row_count(), 4);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.parquet");
        fs::write(&path, b"not parquet").unwrap();

        let result = HistoryStore::new(&path).load();
        assert!(matches!(result, Err(StoreError::Parquet { .. })));
    }

    #[test]
    fn test_dates_stored_as_days_since_epoch() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.parquet"));
        let window = FetchWindow::new(day(1), day(2)).unwrap();
        let mut table = WideTable::skeleton(&window);
        table.join_series(&Series::new("XOM", [PricePoint::new(day(1), 1.0)]).unwrap());
        store.save(&table).unwrap();

        let file = File::open(store.path()).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        let keys = batch
            .column_by_name(DATE_COLUMN)
            .unwrap()
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();

        assert_eq!(keys.value(0), 19_783);
    }
}

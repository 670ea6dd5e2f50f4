//! Partial artifacts written by runs that fetched only part of the registry.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use eodsync_types::write_atomic;

use crate::table::DATE_COLUMN;
use crate::{Result, StoreError, WideTable};

/// Subdirectory holding artifacts already folded into the history table.
pub const ARCHIVE_DIR: &str = "archive";

const PREFIX: &str = "partial_";
const EXTENSION: &str = "csv";
const DAY_FORMAT: &str = "%Y%m%d";

/// Identity of one artifact file.
///
/// The file name is `partial_{YYYYMMDD}_{seq}_{columns}.csv`, where `seq`
/// numbers the artifacts of one processing day from 1 and `columns` is
/// the number of symbol columns inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    /// Processing day the artifact was written on.
    pub day: NaiveDate,
    /// Sequence number within the day.
    pub seq: u32,
    /// Number of symbol columns.
    pub columns: usize,
    /// Location of the file.
    pub path: PathBuf,
}

impl ArtifactMeta {
    /// Builds the file name for the given identity.
    #[must_use]
    pub fn file_name(day: NaiveDate, seq: u32, columns: usize) -> String {
        format!(
            "{PREFIX}{}_{seq:04}_{columns}.{EXTENSION}",
            day.format(DAY_FORMAT)
        )
    }

    /// Parses an artifact file path. Returns `None` for foreign files.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name
            .strip_prefix(PREFIX)?
            .strip_suffix(EXTENSION)?
            .strip_suffix('.')?;

        let mut parts = stem.split('_');
        let day = NaiveDate::parse_from_str(parts.next()?, DAY_FORMAT).ok()?;
        let seq = parts.next()?.parse().ok()?;
        let columns = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            day,
            seq,
            columns,
            path: path.to_path_buf(),
        })
    }
}

/// Directory of outstanding artifacts plus its archive.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    archive: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`; archived files go to `dir/archive`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let archive = dir.join(ARCHIVE_DIR);
        Self { dir, archive }
    }

    /// Returns the directory of outstanding artifacts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the archive directory.
    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive
    }

    /// Lists every outstanding artifact ordered by `(day, seq)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn outstanding(&self) -> Result<Vec<ArtifactMeta>> {
        list(&self.dir)
    }

    /// Lists outstanding artifacts written on or before `day`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn outstanding_through(&self, day: NaiveDate) -> Result<Vec<ArtifactMeta>> {
        let mut metas = self.outstanding()?;
        metas.retain(|m| m.day <= day);
        Ok(metas)
    }

    /// Lists every archived artifact ordered by `(day, seq)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive exists but cannot be listed.
    pub fn archived(&self) -> Result<Vec<ArtifactMeta>> {
        list(&self.archive)
    }

    /// Returns the next free sequence number for `day`.
    ///
    /// Archived artifacts count, so a name is never reused within a day.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be listed.
    pub fn next_seq(&self, day: NaiveDate) -> Result<u32> {
        let highest = self
            .outstanding()?
            .into_iter()
            .chain(self.archived()?)
            .filter(|m| m.day == day)
            .map(|m| m.seq)
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Writes `block` as the next artifact for `day`.
    ///
    /// The file appears under its final name only once fully written.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is empty or named like the date column,
    /// or the file cannot be written.
    pub fn write(&self, day: NaiveDate, block: &WideTable) -> Result<ArtifactMeta> {
        if let Some(bad) = block.column_names().find(|name| !is_storable(name)) {
            return Err(StoreError::InvalidColumn(bad.to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let seq = self.next_seq(day)?;
        let columns = block.column_count();
        let path = self.dir.join(ArtifactMeta::file_name(day, seq, columns));

        write_atomic(&path, |w| write_block(w, block)).map_err(|source| StoreError::WriteFile {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote artifact {} ({} rows, {} columns)",
            path.display(),
            block.row_count(),
            columns
        );
        Ok(ArtifactMeta {
            day,
            seq,
            columns,
            path,
        })
    }

    /// Reads an artifact back into a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn read(&self, meta: &ArtifactMeta) -> Result<WideTable> {
        let content = fs::read(&meta.path).map_err(|source| StoreError::ReadFile {
            path: meta.path.clone(),
            source,
        })?;
        parse_block(&content).map_err(|message| StoreError::Artifact {
            path: meta.path.clone(),
            message,
        })
    }

    /// Moves consumed artifacts into the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be created or a file cannot
    /// be moved. Files moved before the failure stay archived.
    pub fn archive(&self, metas: &[ArtifactMeta]) -> Result<Vec<PathBuf>> {
        if metas.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.archive).map_err(|source| StoreError::Directory {
            path: self.archive.clone(),
            source,
        })?;

        let mut moved = Vec::with_capacity(metas.len());
        for meta in metas {
            let Some(name) = meta.path.file_name() else {
                continue;
            };
            let to = self.archive.join(name);
            fs::rename(&meta.path, &to).map_err(|source| StoreError::Rename {
                from: meta.path.clone(),
                to: to.clone(),
                source,
            })?;
            tracing::debug!("Archived {}", to.display());
            moved.push(to);
        }
        Ok(moved)
    }

    /// Deletes archived artifacts written before `older_than`.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be listed or a file cannot
    /// be removed.
    pub fn purge_archive(&self, older_than: NaiveDate) -> Result<usize> {
        let mut removed = 0;
        for meta in self.archived()? {
            if meta.day >= older_than {
                continue;
            }
            fs::remove_file(&meta.path).map_err(|source| StoreError::WriteFile {
                path: meta.path.clone(),
                source,
            })?;
            removed += 1;
        }
        if removed > 0 {
            tracing::info!("Purged {removed} archived artifacts older than {older_than}");
        }
        Ok(removed)
    }
}

fn list(dir: &Path) -> Result<Vec<ArtifactMeta>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| StoreError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut metas = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match ArtifactMeta::from_path(&path) {
            Some(meta) => metas.push(meta),
            None => tracing::debug!("Ignoring foreign file {}", path.display()),
        }
    }
    metas.sort_by_key(|m| (m.day, m.seq));
    Ok(metas)
}

fn is_storable(name: &str) -> bool {
    !name.is_empty() && name != DATE_COLUMN
}

fn write_block(w: &mut dyn Write, block: &WideTable) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(std::iter::once(DATE_COLUMN).chain(block.column_names()))?;

    for (date, cells) in block.rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(cells.iter().map(|cell| cell.map_or_else(String::new, |v| v.to_string())));
        writer.write_record(&record)?;
    }
    writer.flush()
}

fn parse_block(content: &[u8]) -> std::result::Result<WideTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let header = reader
        .headers()
        .map_err(|e| format!("unreadable header: {e}"))?
        .clone();
    let mut fields = header.iter();
    if fields.next() != Some(DATE_COLUMN) {
        return Err(format!("header must start with {DATE_COLUMN}"));
    }
    let names: Vec<&str> = fields.collect();

    let mut dates = Vec::new();
    let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        let row = record.position().map_or(0, csv::Position::line);

        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{raw_date}' on line {row}"))?;
        dates.push(date);

        for (column, raw) in cells.iter_mut().zip(record.iter().skip(1)) {
            column.push(parse_cell(raw).map_err(|e| format!("{e} on line {row}"))?);
        }
    }

    let mut columns = BTreeMap::new();
    for (name, column) in names.into_iter().zip(cells) {
        if columns.insert(name.to_string(), column).is_some() {
            return Err(format!("duplicate column {name}"));
        }
    }
    WideTable::from_columns(dates, columns).map_err(|e| e.to_string())
}

fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(format!("invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eodsync_types::{FetchWindow, PricePoint, Series};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn block(symbols: &[&str]) -> WideTable {
        let window = FetchWindow::new(day(1), day(4)).unwrap();
        let mut table = WideTable::skeleton(&window);
        for (i, symbol) in symbols.iter().enumerate() {
            let value = 10.0 + i as f64 + 0.125;
            table.join_series(&Series::new(*symbol, [PricePoint::new(day(2), value)]).unwrap());
        }
        table.drop_empty_rows();
        table
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            ArtifactMeta::file_name(day(7), 3, 4),
            "partial_20240507_0003_4.csv"
        );

        let meta = ArtifactMeta::from_path(Path::new("/x/partial_20240507_0003_4.csv")).unwrap();
        assert_eq!(meta.day, day(7));
        assert_eq!(meta.seq, 3);
        assert_eq!(meta.columns, 4);

        assert!(ArtifactMeta::from_path(Path::new("/x/history.parquet")).is_none());
        assert!(ArtifactMeta::from_path(Path::new("/x/partial_2024_1_2.csv")).is_none());
    }

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("partials"));
        let table = block(&["CVX", "XOM"]);

        let meta = store.write(day(7), &table).unwrap();

        assert_eq!(meta.seq, 1);
        assert_eq!(meta.columns, 2);
        assert!(meta.path.ends_with("partial_20240507_0001_2.csv"));
        assert_eq!(store.read(&meta).unwrap(), table);
    }

    #[test]
    fn test_sequence_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = store.write(day(7), &block(&["XOM"])).unwrap();
        let first_bytes = fs::read(&first.path).unwrap();
        let second = store.write(day(7), &block(&["CVX"])).unwrap();
        let next_day = store.write(day(8), &block(&["BP"])).unwrap();

        assert_eq!((first.seq, second.seq, next_day.seq), (1, 2, 1));
        assert_ne!(first.path, second.path);
        assert_eq!(fs::read(&first.path).unwrap(), first_bytes);
        assert_eq!(store.outstanding().unwrap().len(), 3);
    }

    #[test]
    fn test_archived_names_are_not_reused() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = store.write(day(7), &block(&["XOM"])).unwrap();
        store.archive(std::slice::from_ref(&first)).unwrap();
        let second = store.write(day(7), &block(&["XOM"])).unwrap();

        assert_eq!(second.seq, 2);
        assert!(store.outstanding().unwrap().iter().all(|m| m.seq == 2));
        assert_eq!(store.archived().unwrap().len(), 1);
    }

    #[test]
    fn test_outstanding_order_and_cutoff() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write(day(9), &block(&["A"])).unwrap();
        store.write(day(7), &block(&["B"])).unwrap();
        store.write(day(7), &block(&["C"])).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let all: Vec<_> = store
            .outstanding()
            .unwrap()
            .into_iter()
            .map(|m| (m.day, m.seq))
            .collect();
        assert_eq!(all, vec![(day(7), 1), (day(7), 2), (day(9), 1)]);
        assert_eq!(store.outstanding_through(day(8)).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("absent"));

        assert!(store.outstanding().unwrap().is_empty());
        assert!(store.archived().unwrap().is_empty());
        assert_eq!(store.next_seq(day(1)).unwrap(), 1);
    }

    #[test]
    fn test_purge_archive() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let old = store.write(day(1), &block(&["XOM"])).unwrap();
        let recent = store.write(day(9), &block(&["XOM"])).unwrap();
        store.archive(&[old, recent]).unwrap();

        assert_eq!(store.purge_archive(day(5)).unwrap(), 1);
        let left = store.archived().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].day, day(9));
    }

    #[test]
    fn test_quoted_symbols_survive() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let table = block(&["BRK,B", "ODD\"Q"]);

        let meta = store.write(day(1), &table).unwrap();

        assert_eq!(meta.columns, 2);
        let back = store.read(&meta).unwrap();
        assert_eq!(back, table);
        assert!(back.has_column("BRK,B"));
    }

    #[test]
    fn test_rejects_reserved_column() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let result = store.write(day(1), &block(&[DATE_COLUMN]));
        assert!(matches!(result, Err(StoreError::InvalidColumn(_))));
        assert!(store.outstanding().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial_20240501_0001_1.csv");
        fs::write(&path, "Date,XOM\n2024-05-01,abc\n").unwrap();
        let store = ArtifactStore::new(dir.path());
        let meta = ArtifactMeta::from_path(&path).unwrap();

        assert!(matches!(store.read(&meta), Err(StoreError::Artifact { .. })));
    }

    #[test]
    fn test_parse_block_with_nulls() {
        let table = parse_block(b"Date,CVX,XOM\n2024-05-01,,1.5\n2024-05-02,2,\n").unwrap();

        assert_eq!(table.column("CVX").unwrap(), &[None, Some(2.0)]);
        assert_eq!(table.column("XOM").unwrap(), &[Some(1.5), None]);
    }
}

//! Whole-file replacement that never exposes a partially written file.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Writes a file by filling a temporary sibling and renaming it over `path`.
///
/// `write` receives a buffered writer. If it fails, or the flush or rename
/// fails, the temporary file is removed and whatever was at `path` before
/// is left exactly as it was.
///
/// # Errors
///
/// Returns the first I/O error from creating, writing, syncing, or renaming
/// the temporary file.
pub fn write_atomic<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

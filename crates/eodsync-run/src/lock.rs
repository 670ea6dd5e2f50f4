//! Exclusive run lock.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Result, RunError};

/// Age after which an unreadable lock file counts as abandoned.
pub const UNREADABLE_GRACE: Duration = Duration::from_secs(30);

const ATTEMPTS: usize = 3;

/// Contents of the lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// PID of the process holding the lock.
    pub pid: u32,
    /// When the lock was taken.
    pub started_at: DateTime<Utc>,
}

/// Guard for the data directory's run lock.
///
/// The holder record is written to a temporary file next to the lock and
/// linked into place without clobbering, so the lock file is never seen
/// half written and only one process can publish it. A lock left behind by
/// a process that is no longer running is replaced, as is an unreadable
/// lock older than [`UNREADABLE_GRACE`]. The file is removed when the guard
/// drops.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    info: LockInfo,
}

impl RunLock {
    /// Takes the lock at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::LockHeld`] if a live process owns the lock,
    /// [`RunError::LockBusy`] if the lock file is unreadable but recent, or
    /// [`RunError::Lock`] if the file cannot be written.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let info = LockInfo {
            pid: std::process::id(),
            started_at: Utc::now(),
        };

        let mut staged =
            NamedTempFile::new_in(parent_dir(&path)).map_err(|e| lock_error(&path, e))?;
        staged
            .write_all(&serde_json::to_vec(&info)?)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| lock_error(&path, e))?;

        for _ in 0..ATTEMPTS {
            let err = match staged.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::debug!("Acquired run lock {}", path.display());
                    return Ok(Self { path, info });
                }
                Err(err) => err,
            };
            if err.error.kind() != ErrorKind::AlreadyExists {
                return Err(lock_error(&path, err.error));
            }
            staged = err.file;

            let holder = read_holder(&path);
            match holder {
                Some(holder) if is_process_running(holder.pid) => {
                    return Err(RunError::LockHeld {
                        path,
                        pid: holder.pid,
                        since: holder.started_at,
                    });
                }
                Some(holder) => tracing::warn!(
                    "Clearing stale run lock left by process {} at {}",
                    holder.pid,
                    holder.started_at
                ),
                None => match lock_age(&path) {
                    // Released between our attempts.
                    None => continue,
                    Some(age) if age < UNREADABLE_GRACE => {
                        return Err(RunError::LockBusy { path });
                    }
                    Some(_) => tracing::warn!("Clearing unreadable run lock {}", path.display()),
                },
            }
            clear_stale(&path, holder)?;
        }

        Err(lock_error(&path, ErrorKind::AlreadyExists.into()))
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns what this guard wrote into the lock file.
    #[must_use]
    pub const fn info(&self) -> LockInfo {
        self.info
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Only remove the file if it is still ours.
        if read_holder(&self.path).is_some_and(|h| h == self.info) {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to release run lock {}: {e}", self.path.display());
            }
        }
    }
}

/// Reads the current lock holder, if the file exists and parses.
#[must_use]
pub fn read_holder(path: &Path) -> Option<LockInfo> {
    let content = fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
}

/// Moves a stale lock out of the way.
///
/// The lock is renamed to a private name first and only deleted if it
/// still holds `observed`. If another process replaced it in the meantime
/// the fresh lock is linked back.
fn clear_stale(path: &Path, observed: Option<LockInfo>) -> Result<()> {
    let claim = path.with_extension(format!("lock.stale.{}", std::process::id()));
    match fs::rename(path, &claim) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(lock_error(path, e)),
    }

    if read_holder(&claim) != observed {
        tracing::debug!("Run lock {} changed hands, restoring it", path.display());
        if let Err(e) = fs::hard_link(&claim, path) {
            tracing::warn!("Failed to restore run lock {}: {e}", path.display());
        }
    }
    remove(&claim)
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn lock_error(path: &Path, source: std::io::Error) -> RunError {
    RunError::Lock {
        path: path.to_path_buf(),
        source,
    }
}

fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(lock_error(path, e)),
    }
}

/// Checks if a process with the given PID is still running.
#[must_use]
pub fn is_process_running(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }

    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}")])
            .output()
            .map(|output| String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        {
            let lock = RunLock::acquire(&path).unwrap();
            assert!(path.exists());
            assert_eq!(read_holder(&path), Some(lock.info()));
            assert_eq!(lock.info().pid, std::process::id());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        let _held = RunLock::acquire(&path).unwrap();

        let second = RunLock::acquire(&path);

        assert!(matches!(
            second,
            Err(RunError::LockHeld { pid, .. }) if pid == std::process::id()
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        let stale = LockInfo {
            pid: 999_999_999,
            started_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&stale).unwrap()).unwrap();

        let lock = RunLock::acquire(&path).unwrap();

        assert_eq!(lock.info().pid, std::process::id());
    }

    #[test]
    fn test_lock_being_written_is_not_taken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        fs::File::create(&path).unwrap();

        let result = RunLock::acquire(&path);

        assert!(matches!(result, Err(RunError::LockBusy { .. })));
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_abandoned_unreadable_lock_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        fs::write(&path, "garbage").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - UNREADABLE_GRACE * 2)
            .unwrap();

        let lock = RunLock::acquire(&path).unwrap();

        assert_eq!(read_holder(&path), Some(lock.info()));
    }

    #[test]
    fn test_clearing_stale_lock_keeps_fresh_holder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        let stale = LockInfo {
            pid: 999_999_999,
            started_at: Utc::now(),
        };
        let fresh = LockInfo {
            pid: std::process::id(),
            started_at: Utc::now(),
        };
        // Another process cleared the stale lock and took it first.
        fs::write(&path, serde_json::to_vec(&fresh).unwrap()).unwrap();

        clear_stale(&path, Some(stale)).unwrap();

        assert_eq!(read_holder(&path), Some(fresh));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        let _held = RunLock::acquire(&path).unwrap();

        assert!(RunLock::acquire(&path).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_current_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }
}

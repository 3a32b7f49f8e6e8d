use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};

use crate::utils::error::Result;

/// 跨行程的快照鎖：CLI 從載入到寫回整段期間都持有
///
/// Uses an advisory lock on a `<snapshot>.lock` file next to the snapshot. The
/// snapshot itself is replaced by rename on every save, so it cannot carry the
/// lock.
pub struct SnapshotLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl SnapshotLock {
    pub fn open(data_dir: impl AsRef<Path>, snapshot_file: &str) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let path = data_dir.join(format!("{}.lock", snapshot_file));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until every other holder has released the lock.
    pub fn acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        Ok(self.lock.write()?)
    }

    /// `None` while another holder has the lock.
    pub fn try_acquire(&mut self) -> Result<Option<RwLockWriteGuard<'_, File>>> {
        match self.lock.try_write() {
            Ok(guard) => Ok(Some(guard)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_file_sits_next_to_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");

        let lock = SnapshotLock::open(&data_dir, "guild-fill.json").unwrap();
        assert_eq!(lock.path(), data_dir.join("guild-fill.json.lock"));
        assert!(lock.path().exists());
    }

    #[test]
    fn test_reacquire_after_release() {
        let temp_dir = TempDir::new().unwrap();
        let mut lock = SnapshotLock::open(temp_dir.path(), "guild-fill.json").unwrap();

        drop(lock.acquire().unwrap());
        assert!(lock.try_acquire().unwrap().is_some());
    }
}

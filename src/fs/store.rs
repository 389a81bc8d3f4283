//! File-per-watch status store
//!
//! Every watch persists one JSON record in a fixed per-user directory, named
//! after the pid of the watcher process that owns it. The watcher is the only
//! writer of its record; any process may read. That single-writer-per-key
//! discipline is what makes the store safe without locks.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::TaskRecord;

/// Environment variable overriding the state directory (used by tests and
/// scripting; defaults to `~/.vigil`).
pub const STATE_DIR_ENV: &str = "VIGIL_STATE_DIR";

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open the per-user store, creating the directory if needed.
    pub fn open_default() -> Result<Self> {
        let root = match std::env::var_os(STATE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("could not determine the home directory")?
                .join(".vigil"),
        };
        Self::open(root)
    }

    /// Open a store rooted at an explicit directory, creating it if needed.
    /// Creation is idempotent; an existing directory is reused as-is.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create state directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, watcher_pid: u32) -> PathBuf {
        self.root.join(watcher_pid.to_string())
    }

    /// Read the record owned by `watcher_pid`.
    ///
    /// A missing entry is not an error: it reads as `None` and callers
    /// substitute the not-started default. A present but unreadable entry is
    /// an error; enumeration-style callers skip those.
    pub fn read(&self, watcher_pid: u32) -> Result<Option<TaskRecord>> {
        let path = self.path_for(watcher_pid);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("malformed status record {}", path.display()))?;
        Ok(Some(record))
    }

    /// Persist a whole-record snapshot under its watcher pid.
    ///
    /// Mutations go through read-modify-write of the full snapshot so fields
    /// not being updated are preserved. Only the owning watcher ever calls
    /// this for a given key, so no cross-process locking is needed.
    pub fn save(&self, record: &TaskRecord) -> Result<()> {
        let watcher_pid = record
            .watcher_pid
            .context("cannot persist a record that has no watcher pid")?;
        let path = self.path_for(watcher_pid);
        let json = serde_json::to_string(record).context("failed to serialize status record")?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// List every `(watcher_pid, target_pid)` pair in the store.
    ///
    /// Stray entries (subdirectories, non-numeric names, unparsable files)
    /// are skipped silently rather than aborting the whole listing.
    pub fn enumerate(&self) -> Result<Vec<(u32, u32)>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read state directory {}", self.root.display()))?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let watcher_pid: u32 = match entry.file_name().to_string_lossy().parse() {
                Ok(pid) => pid,
                Err(_) => continue,
            };
            if let Ok(Some(record)) = self.read(watcher_pid) {
                keys.push((watcher_pid, record.target_pid));
            }
        }
        Ok(keys)
    }

    /// Delete the entry owned by `watcher_pid`.
    pub fn remove(&self, watcher_pid: u32) -> Result<()> {
        let path = self.path_for(watcher_pid);
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(temp_dir.path().join("state")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_open_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("state");
        Store::open(&root).unwrap();
        Store::open(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_read_missing_entry_is_none() {
        let (_tmp, store) = test_store();
        assert!(store.read(12345).unwrap().is_none());
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let (_tmp, store) = test_store();

        let mut record = TaskRecord::not_started(4242);
        record.assign_watcher(999).unwrap();
        record.mark_monitoring();
        store.save(&record).unwrap();

        let loaded = store.read(999).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.phase, Phase::Monitoring);
    }

    #[test]
    fn test_save_requires_watcher_pid() {
        let (_tmp, store) = test_store();
        let record = TaskRecord::not_started(4242);
        let err = store.save(&record).unwrap_err();
        assert!(err.to_string().contains("no watcher pid"));
    }

    #[test]
    fn test_enumerate_skips_stray_entries() {
        let (_tmp, store) = test_store();

        let mut record = TaskRecord::not_started(10);
        record.assign_watcher(100).unwrap();
        store.save(&record).unwrap();

        // Stray entries that must be ignored
        fs::create_dir(store.root().join("200")).unwrap();
        fs::write(store.root().join("not-a-pid"), "{}").unwrap();
        fs::write(store.root().join("300"), "this is not json").unwrap();

        let keys = store.enumerate().unwrap();
        assert_eq!(keys, vec![(100, 10)]);
    }

    #[test]
    fn test_remove_deletes_entry() {
        let (_tmp, store) = test_store();

        let mut record = TaskRecord::not_started(10);
        record.assign_watcher(100).unwrap();
        store.save(&record).unwrap();

        store.remove(100).unwrap();
        assert!(store.read(100).unwrap().is_none());
        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_entry_is_an_error() {
        let (_tmp, store) = test_store();
        assert!(store.remove(100).is_err());
    }
}

//! File-based record storage for Hifdh.
//!
//! Records are stored as JSON files in `<project>/.hifdh/records/`.
//! Atomic writes are achieved via temp file + rename pattern.
//!
//! New records first claim their id by creating an empty `<id>.json` with
//! `create_new`, so two processes adding lessons at once cannot both take
//! the same id. The claim is then replaced by the record itself.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::records_dir;
use crate::core::MemorizationRecord;
use crate::error::{HifdhError, Result};
use crate::storage::traits::{id_after, parse_record_id, sort_by_id};
use crate::storage::RecordStore;

/// File-based record storage.
///
/// Stores records as JSON files in a configurable directory.
/// Uses atomic writes via temp file + rename pattern.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    /// Directory where record files are stored.
    records_dir: PathBuf,
}

impl FileRecordStore {
    /// Create a record store for the project containing `cwd`.
    pub fn for_project(cwd: &Path) -> Result<Self> {
        Self::with_dir(records_dir(cwd))
    }

    /// Create a new file record store with a custom directory.
    pub fn with_dir(records_dir: impl Into<PathBuf>) -> Result<Self> {
        let records_dir = records_dir.into();

        if !records_dir.exists() {
            fs::create_dir_all(&records_dir).map_err(|e| HifdhError::storage(&records_dir, e))?;
        }

        Ok(Self { records_dir })
    }

    /// Get the directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.records_dir
    }

    /// Get the path for a record file.
    fn record_path(&self, id: &str) -> PathBuf {
        self.records_dir.join(format!("{}.json", id))
    }

    /// Get the path for a temp file used during atomic writes.
    fn temp_path(&self, id: &str) -> PathBuf {
        self.records_dir.join(format!(".{}.json.tmp", id))
    }

    /// Write a record atomically using temp file + rename.
    fn atomic_write(&self, record: &MemorizationRecord) -> Result<()> {
        let final_path = self.record_path(&record.id);
        let temp_path = self.temp_path(&record.id);

        let json = serde_json::to_string_pretty(record)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| HifdhError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| HifdhError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| HifdhError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &final_path).map_err(|e| HifdhError::storage(&final_path, e))?;

        Ok(())
    }

    /// Paths of stored record files, skipping temp files and non-JSON entries.
    fn record_files(&self) -> Result<Vec<PathBuf>> {
        if !self.records_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.records_dir)
            .map_err(|e| HifdhError::storage(&self.records_dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HifdhError::storage(&self.records_dir, e))?;
            let path = entry.path();

            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, id: &str) -> Result<Option<MemorizationRecord>> {
        let path = self.record_path(id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| HifdhError::storage(&path, e))?;
        let record: MemorizationRecord = serde_json::from_str(&content)
            .map_err(|e| HifdhError::serde(format!("{}: {}", path.display(), e)))?;

        Ok(Some(record))
    }

    fn put(&self, record: &MemorizationRecord) -> Result<()> {
        self.atomic_write(record)
    }

    fn insert(&self, record: &MemorizationRecord) -> Result<()> {
        let final_path = self.record_path(&record.id);

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&final_path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => HifdhError::duplicate_record(&record.id),
                _ => HifdhError::storage(&final_path, e),
            })?;

        if let Err(e) = self.atomic_write(record) {
            if let Err(cleanup) = fs::remove_file(&final_path) {
                warn!(
                    "Failed to release claimed record id {}: {}",
                    record.id, cleanup
                );
            }
            return Err(e);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<MemorizationRecord>> {
        let mut records = Vec::new();

        for path in self.record_files()? {
            let content = fs::read_to_string(&path).map_err(|e| HifdhError::storage(&path, e))?;
            match serde_json::from_str::<MemorizationRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        sort_by_id(&mut records);
        Ok(records)
    }

    fn next_id(&self) -> Result<String> {
        let highest = self
            .record_files()?
            .iter()
            .filter_map(|p| p.file_stem())
            .filter_map(|stem| parse_record_id(&stem.to_string_lossy()))
            .max();
        id_after(highest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::{sample_record, test_record_store_crud};
    use tempfile::TempDir;

    fn create_test_store() -> (FileRecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_record_store_crud() {
        let (store, _dir) = create_test_store();
        test_record_store_crud(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("records");

        assert!(!records_path.exists());

        let _store = FileRecordStore::with_dir(&records_path).unwrap();

        assert!(records_path.is_dir());
    }

    #[test]
    fn test_for_project_uses_hifdh_dir() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::for_project(dir.path()).unwrap();
        assert!(store.dir().ends_with(".hifdh/records"));
    }

    #[test]
    fn test_record_path() {
        let (store, _dir) = create_test_store();
        assert!(store.record_path("r0001").ends_with("r0001.json"));
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (store, _dir) = create_test_store();
        store.put(&sample_record("r0001")).unwrap();
        assert!(!store.temp_path("r0001").exists());
    }

    #[test]
    fn test_list_ignores_temp_files() {
        let (store, dir) = create_test_store();
        store.put(&sample_record("r0001")).unwrap();
        fs::write(dir.path().join(".r0002.json.tmp"), "{}").unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "r0001");
        assert_eq!(store.next_id().unwrap(), "r0002");
    }

    #[test]
    fn test_list_skips_invalid_json() {
        let (store, dir) = create_test_store();
        store.put(&sample_record("r0001")).unwrap();
        fs::write(dir.path().join("r0002.json"), "not valid json").unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_get_invalid_json_is_error() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join("r0003.json"), "{").unwrap();

        let err = store.get("r0003").unwrap_err();
        assert!(matches!(err, HifdhError::Serde { .. }));
    }

    #[test]
    fn test_next_id_after_gap() {
        let (store, _dir) = create_test_store();
        store.put(&sample_record("r0001")).unwrap();
        store.put(&sample_record("r0007")).unwrap();
        assert_eq!(store.next_id().unwrap(), "r0008");
    }

    #[test]
    fn test_next_id_at_end_of_sequence() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join("r4294967295.json"), "{}").unwrap();

        let err = store.next_id().unwrap_err();
        assert!(matches!(err, HifdhError::StageInvariantViolation { .. }));
        assert!(err.to_string().contains("4294967295"));
    }

    #[test]
    fn test_insert_from_two_stores_keeps_first_record() {
        let dir = TempDir::new().unwrap();
        let first = FileRecordStore::with_dir(dir.path()).unwrap();
        let second = FileRecordStore::with_dir(dir.path()).unwrap();

        // Both writers see the same free id
        let id = first.next_id().unwrap();
        assert_eq!(second.next_id().unwrap(), id);

        first
            .insert(&sample_record(&id).with_note("first lesson"))
            .unwrap();
        let err = second
            .insert(&sample_record(&id).with_note("second lesson"))
            .unwrap_err();
        assert!(matches!(err, HifdhError::DuplicateRecord { .. }));

        let stored = second.get(&id).unwrap().unwrap();
        assert_eq!(stored.note.as_deref(), Some("first lesson"));
        assert_eq!(second.next_id().unwrap(), "r0002");
        assert!(!first.temp_path(&id).exists());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileRecordStore::with_dir(dir.path()).unwrap();
            store.put(&sample_record("r0001").with_note("revise tajweed")).unwrap();
        }
        let store = FileRecordStore::with_dir(dir.path()).unwrap();
        let record = store.get("r0001").unwrap().unwrap();
        assert_eq!(record.note.as_deref(), Some("revise tajweed"));
    }
}

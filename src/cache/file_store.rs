//! File Store Module
//!
//! Filesystem-backed store: one record file per key under a root directory,
//! with staleness taken from the file's modification time.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tracing::{debug, instrument};

use crate::cache::entry;
use crate::cache::store::{validate_name, Freshness, Store};
use crate::cache::value::Value;
use crate::error::{CacheError, Result};

/// Distinguishes temp files of concurrent writers within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// == File Store ==
/// Stores each record at `<root>/<name>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the record path for `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

impl Store for FileStore {
    #[instrument(skip(self))]
    fn read(&self, name: &str) -> Result<Value> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(CacheError::NotFound(name.to_string()));
        }

        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        entry::decode(&contents)
    }

    #[instrument(skip(self, value))]
    fn write(&self, name: &str, value: &Value) -> Result<()> {
        let path = self.path_for(name)?;
        let contents = entry::encode(value)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically (write to temp, then rename)
        let temp_path = Self::temp_path_for(&path);
        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(&contents)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp_path, &path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(bytes = contents.len(), path = ?path, "Record written");
        Ok(())
    }

    fn check_fresh(&self, name: &str, validity_secs: u64) -> Result<Freshness> {
        let path = self.path_for(name)?;
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Freshness::NotFound),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Ok(Freshness::NotFound);
        }

        let modified = metadata.modified()?;
        if entry::is_fresh(modified, SystemTime::now(), validity_secs) {
            Ok(Freshness::Fresh)
        } else {
            Ok(Freshness::Stale)
        }
    }

    #[instrument(skip(self))]
    fn invalidate(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Ok(());
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = ?path, "Record removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn age_record(store: &FileStore, name: &str, secs: u64) {
        let file = File::options()
            .write(true)
            .open(store.path_for(name).unwrap())
            .unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("test", &Value::from("test-value")).unwrap();
        assert_eq!(store.read("test").unwrap(), Value::from("test-value"));
        assert!(dir.path().join("test").is_file());
    }

    #[test]
    fn test_read_missing() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(store.read("missing"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_write_creates_root_recursively() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b");
        let store = FileStore::new(&root);

        store.write("nested/key", &Value::Int(1)).unwrap();
        assert!(root.join("nested").join("key").is_file());
        assert_eq!(store.read("nested/key").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_overwrite_replaces_record() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("key", &Value::Int(1)).unwrap();
        age_record(&store, "key", 100);
        assert_eq!(store.check_fresh("key", 50).unwrap(), Freshness::Stale);

        store.write("key", &Value::Int(2)).unwrap();
        assert_eq!(store.read("key").unwrap(), Value::Int(2));
        assert_eq!(store.check_fresh("key", 50).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("key", &Value::Int(1)).unwrap();
        store.write("key", &Value::Int(2)).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("key")]);
    }

    #[test]
    fn test_check_fresh_states() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.check_fresh("key", 60).unwrap(), Freshness::NotFound);

        store.write("key", &Value::Null).unwrap();
        assert_eq!(store.check_fresh("key", 60).unwrap(), Freshness::Fresh);

        age_record(&store, "key", 120);
        assert_eq!(store.check_fresh("key", 60).unwrap(), Freshness::Stale);
        assert_eq!(store.check_fresh("key", 121).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn test_check_fresh_ignores_directories() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("group/key", &Value::Null).unwrap();
        assert_eq!(store.check_fresh("group", 60).unwrap(), Freshness::NotFound);
        assert!(matches!(store.read("group"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_check_fresh_does_not_decode() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        fs::write(dir.path().join("garbage"), b"not a record").unwrap();
        assert_eq!(store.check_fresh("garbage", 60).unwrap(), Freshness::Fresh);
        assert!(matches!(store.read("garbage"), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("key", &Value::Int(1)).unwrap();
        store.invalidate("key").unwrap();
        assert_eq!(store.check_fresh("key", 60).unwrap(), Freshness::NotFound);

        store.invalidate("key").unwrap();
        store.invalidate("never-written").unwrap();
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("root"));

        assert!(matches!(
            store.write("../outside", &Value::Null),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            store.check_fresh("", 60),
            Err(CacheError::InvalidKey(_))
        ));
    }
}

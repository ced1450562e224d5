//! Memory Store Module
//!
//! In-process store holding encoded records, for tests and for embedding a
//! cache that does not need to outlive the process.

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::cache::entry;
use crate::cache::store::{validate_name, Freshness, Store};
use crate::cache::value::Value;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct StoredRecord {
    /// Encoded record bytes, same format as on disk
    contents: Vec<u8>,
    /// Last write time
    modified: SystemTime,
}

// == Memory Store ==
/// A [`Store`] backed by a map. Records are kept encoded so reads go through
/// the same serialization round-trip as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the modification time of an existing record.
    pub fn set_modified(&self, name: &str, modified: SystemTime) -> Result<()> {
        match self.records.write().get_mut(name) {
            Some(record) => {
                record.modified = modified;
                Ok(())
            }
            None => Err(CacheError::NotFound(name.to_string())),
        }
    }

    /// Returns true if a record exists for `name`, fresh or not.
    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(name)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn read(&self, name: &str) -> Result<Value> {
        validate_name(name)?;
        let records = self.records.read();
        let record = records
            .get(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        entry::decode(&record.contents)
    }

    fn write(&self, name: &str, value: &Value) -> Result<()> {
        validate_name(name)?;
        let record = StoredRecord {
            contents: entry::encode(value)?,
            modified: SystemTime::now(),
        };
        self.records.write().insert(name.to_string(), record);
        Ok(())
    }

    fn check_fresh(&self, name: &str, validity_secs: u64) -> Result<Freshness> {
        validate_name(name)?;
        let freshness = match self.records.read().get(name) {
            None => Freshness::NotFound,
            Some(record) if entry::is_fresh(record.modified, SystemTime::now(), validity_secs) => {
                Freshness::Fresh
            }
            Some(_) => Freshness::Stale,
        };
        Ok(freshness)
    }

    fn invalidate(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.records.write().remove(name);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_write_and_read() {
        let store = MemoryStore::new();

        store.write("key1", &Value::from("value1")).unwrap();
        assert_eq!(store.read("key1").unwrap(), Value::from("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_read_nonexistent() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read("nonexistent"),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_overwrite() {
        let store = MemoryStore::new();

        store.write("key1", &Value::from("value1")).unwrap();
        store.write("key1", &Value::from("value2")).unwrap();

        assert_eq!(store.read("key1").unwrap(), Value::from("value2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_freshness() {
        let store = MemoryStore::new();
        assert_eq!(store.check_fresh("key1", 60).unwrap(), Freshness::NotFound);

        store.write("key1", &Value::Int(1)).unwrap();
        assert_eq!(store.check_fresh("key1", 60).unwrap(), Freshness::Fresh);

        store
            .set_modified("key1", SystemTime::now() - Duration::from_secs(61))
            .unwrap();
        assert_eq!(store.check_fresh("key1", 60).unwrap(), Freshness::Stale);
    }

    #[test]
    fn test_store_set_modified_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_modified("key1", SystemTime::now()),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_invalidate() {
        let store = MemoryStore::new();

        store.write("key1", &Value::Int(1)).unwrap();
        store.invalidate("key1").unwrap();
        assert!(!store.contains("key1"));

        // Absent keys are not an error
        store.invalidate("key1").unwrap();
    }
}

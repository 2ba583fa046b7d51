use super::StorageBackend;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory backend. Clones share the same map, so a test can keep a probe
/// while the store owns the boxed original.
#[derive(Clone)]
pub struct MockStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
    write_count: Arc<Mutex<usize>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fail_reads: Arc::new(Mutex::new(false)),
            fail_writes: Arc::new(Mutex::new(false)),
            write_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_read_failure(self) -> Self {
        *self.fail_reads.lock().unwrap() = true;
        self
    }

    pub fn set_write_failure(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn get_write_count(&self) -> usize {
        *self.write_count.lock().unwrap()
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MockStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(Error::Storage(format!("Mock read failure for {}", key)));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::Storage(format!("Mock quota exceeded for {}", key)));
        }
        *self.write_count.lock().unwrap() += 1;

        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_storage_set_and_get() {
        let storage = MockStorage::new();
        storage.set("k", "v").unwrap();

        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(storage.get_write_count(), 1);
    }

    #[test]
    fn test_mock_storage_clones_share_state() {
        let storage = MockStorage::new();
        let probe = storage.clone();
        storage.set("k", "v").unwrap();

        assert_eq!(probe.get_raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_mock_storage_injected_failures() {
        let storage = MockStorage::new().with_entry("k", "v").with_read_failure();
        assert!(storage.get("k").is_err());

        storage.set_write_failure(true);
        let err = storage.set("k", "w").unwrap_err();
        assert!(err.to_string().contains("quota"));
        assert_eq!(storage.get_raw("k").as_deref(), Some("v"));
    }
}

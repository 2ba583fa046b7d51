//! Saved prompt history
//!
//! A bounded, most-recent-first list of rendered prompts persisted through a
//! [`StorageBackend`]. Persistence is best effort: unreadable or corrupt data
//! loads as an empty history and failed writes are logged, never returned.

use crate::models::{HistoryEntry, NewHistoryEntry, DEFAULT_HISTORY_LIMIT};
use crate::storage::StorageBackend;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const HISTORY_KEY: &str = "prompt-history";
pub const HISTORY_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredHistoryRef<'a> {
    version: u32,
    entries: &'a [HistoryEntry],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Versioned {
        version: u32,
        entries: Vec<HistoryEntry>,
    },
    // Layout written before the version marker existed.
    Unversioned(Vec<HistoryEntry>),
}

/// Narrows [`HistoryStore::filter`] results.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the scenario name or content.
    pub query: Option<String>,
    pub favorites_only: bool,
}

impl HistoryFilter {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        if self.favorites_only && !entry.favorite {
            return false;
        }
        match self.query.as_deref().map(str::to_lowercase) {
            Some(query) if !query.is_empty() => {
                entry.scenario_name.to_lowercase().contains(&query)
                    || entry.content.to_lowercase().contains(&query)
            }
            _ => true,
        }
    }
}

pub struct HistoryStore {
    backend: Box<dyn StorageBackend>,
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl HistoryStore {
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        Self::with_capacity(backend, DEFAULT_HISTORY_LIMIT)
    }

    /// Open with room for `capacity` entries; a capacity of zero is raised to one.
    pub fn with_capacity(backend: Box<dyn StorageBackend>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = load_entries(backend.as_ref());
        entries.truncate(capacity);
        info!("Loaded {} history entries", entries.len());

        Self {
            backend,
            entries,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent first.
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn filter(&self, filter: &HistoryFilter) -> Vec<&HistoryEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    pub fn add(&mut self, new: NewHistoryEntry) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            scenario_id: new.scenario_id,
            scenario_name: new.scenario_name,
            content: new.content,
            form_data: new.form_data,
            created_at: Utc::now(),
            favorite: false,
        };

        self.entries.insert(0, entry.clone());
        if self.entries.len() > self.capacity {
            let dropped = self.entries.len() - self.capacity;
            self.entries.truncate(self.capacity);
            debug!("Dropped {} oldest history entries", dropped);
        }

        info!("Saved history entry {} ({})", entry.id, entry.scenario_name);
        self.persist();
        entry
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;

        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Flip the favorite flag. Returns the new state, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.favorite = !entry.favorite;
        let favorite = entry.favorite;

        self.persist();
        Some(favorite)
    }

    fn persist(&self) {
        let document = StoredHistoryRef {
            version: HISTORY_FORMAT_VERSION,
            entries: &self.entries,
        };

        let result = serde_json::to_string(&document)
            .map_err(crate::Error::from)
            .and_then(|json| self.backend.set(HISTORY_KEY, &json));

        if let Err(e) = result {
            warn!("Could not persist history: {}. Keeping it in memory.", e);
        }
    }
}

fn load_entries(backend: &dyn StorageBackend) -> Vec<HistoryEntry> {
    let raw = match backend.get(HISTORY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Could not read history: {}. Starting empty.", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<StoredHistory>(&raw) {
        Ok(StoredHistory::Versioned { version, entries })
            if version == HISTORY_FORMAT_VERSION =>
        {
            entries
        }
        Ok(StoredHistory::Versioned { version, .. }) => {
            warn!(
                "History format version {} is not supported. Starting empty.",
                version
            );
            Vec::new()
        }
        Ok(StoredHistory::Unversioned(entries)) => {
            info!("Migrating {} unversioned history entries", entries.len());
            entries
        }
        Err(e) => {
            warn!("History data is corrupt: {}. Starting empty.", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, FormValues};
    use crate::storage::MockStorage;

    fn new_entry(content: &str) -> NewHistoryEntry {
        let mut form_data = FormValues::new();
        form_data.insert("topic".to_string(), FieldValue::from(content));
        NewHistoryEntry {
            scenario_id: "lesson-plan-course".to_string(),
            scenario_name: "课程教案".to_string(),
            content: content.to_string(),
            form_data,
        }
    }

    #[test]
    fn test_add_prepends_and_assigns_unique_ids() {
        let mut store = HistoryStore::open(Box::new(MockStorage::new()));
        let first = store.add(new_entry("one"));
        let second = store.add(new_entry("two"));

        assert_ne!(first.id, second.id);
        assert!(!first.favorite);
        let contents: Vec<_> = store.list().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "one"]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut store = HistoryStore::open(Box::new(MockStorage::new()));
        for i in 0..51 {
            store.add(new_entry(&format!("entry {}", i)));
            assert!(store.list().len() <= 50);
        }

        assert_eq!(store.list().len(), 50);
        assert_eq!(store.list()[0].content, "entry 50");
        assert_eq!(store.list()[49].content, "entry 1");
    }

    #[test]
    fn test_toggle_favorite_twice_restores_state() {
        let mut store = HistoryStore::open(Box::new(MockStorage::new()));
        let entry = store.add(new_entry("x"));

        assert_eq!(store.toggle_favorite(&entry.id), Some(true));
        assert!(store.get(&entry.id).unwrap().favorite);
        assert_eq!(store.toggle_favorite(&entry.id), Some(false));
        assert!(!store.get(&entry.id).unwrap().favorite);
    }

    #[test]
    fn test_toggle_unknown_id_is_a_no_op() {
        let storage = MockStorage::new();
        let mut store = HistoryStore::open(Box::new(storage.clone()));
        store.add(new_entry("x"));
        let writes = storage.get_write_count();

        assert_eq!(store.toggle_favorite("missing"), None);
        assert_eq!(storage.get_write_count(), writes);
        assert!(!store.list()[0].favorite);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = HistoryStore::open(Box::new(MockStorage::new()));
        let a = store.add(new_entry("a"));
        store.add(new_entry("b"));

        assert!(store.remove(&a.id));
        assert!(!store.remove(&a.id));
        assert_eq!(store.list().len(), 1);

        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_persists_versioned_document_and_reloads() {
        let storage = MockStorage::new();
        let mut store = HistoryStore::open(Box::new(storage.clone()));
        let entry = store.add(new_entry("saved"));
        store.toggle_favorite(&entry.id);

        let raw = storage.get_raw(HISTORY_KEY).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["entries"][0]["scenarioId"], "lesson-plan-course");
        assert_eq!(doc["entries"][0]["formData"]["topic"], "saved");
        assert_eq!(doc["entries"][0]["favorite"], true);

        let reopened = HistoryStore::open(Box::new(storage));
        assert_eq!(reopened.list(), store.list());
    }

    #[test]
    fn test_unversioned_array_is_migrated() {
        let legacy = r#"[{
            "id": "1700000000000",
            "scenarioId": "exam-subjective",
            "scenarioName": "主观题出题",
            "content": "请出题",
            "formData": {"subject": "物流管理", "tags": ["a", "b"]},
            "createdAt": "2024-01-05T06:03:09.123Z",
            "favorite": true
        }]"#;
        let storage = MockStorage::new().with_entry(HISTORY_KEY, legacy);
        let store = HistoryStore::open(Box::new(storage));

        assert_eq!(store.list().len(), 1);
        let entry = &store.list()[0];
        assert_eq!(entry.id, "1700000000000");
        assert!(entry.favorite);
        assert_eq!(
            entry.form_data["tags"],
            FieldValue::Multi(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_corrupt_or_unreadable_history_starts_empty() {
        let corrupt = MockStorage::new().with_entry(HISTORY_KEY, "{not json");
        assert!(HistoryStore::open(Box::new(corrupt)).list().is_empty());

        let future =
            MockStorage::new().with_entry(HISTORY_KEY, r#"{"version": 9, "entries": []}"#);
        assert!(HistoryStore::open(Box::new(future)).list().is_empty());

        let unreadable = MockStorage::new().with_read_failure();
        assert!(HistoryStore::open(Box::new(unreadable)).list().is_empty());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let storage = MockStorage::new();
        storage.set_write_failure(true);
        let mut store = HistoryStore::open(Box::new(storage.clone()));

        store.add(new_entry("kept"));
        assert_eq!(store.list().len(), 1);
        assert!(storage.get_raw(HISTORY_KEY).is_none());
    }

    #[test]
    fn test_filter_by_query_and_favorites() {
        let mut store = HistoryStore::open(Box::new(MockStorage::new()));
        let a = store.add(new_entry("Warehouse layout"));
        store.add(new_entry("Cold chain"));
        store.toggle_favorite(&a.id);

        let by_query = store.filter(&HistoryFilter {
            query: Some("WAREHOUSE".to_string()),
            favorites_only: false,
        });
        assert_eq!(by_query.len(), 1);

        let by_name = store.filter(&HistoryFilter {
            query: Some("教案".to_string()),
            favorites_only: false,
        });
        assert_eq!(by_name.len(), 2);

        let favorites = store.filter(&HistoryFilter {
            query: None,
            favorites_only: true,
        });
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, a.id);
    }

    #[test]
    fn test_reopen_with_smaller_capacity_truncates() {
        let storage = MockStorage::new();
        let mut store = HistoryStore::open(Box::new(storage.clone()));
        for i in 0..5 {
            store.add(new_entry(&i.to_string()));
        }

        let smaller = HistoryStore::with_capacity(Box::new(storage), 2);
        assert_eq!(smaller.capacity(), 2);
        let contents: Vec<_> = smaller.list().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["4", "3"]);
    }

    #[test]
    fn test_zero_capacity_still_keeps_latest_entry() {
        let mut store = HistoryStore::with_capacity(Box::new(MockStorage::new()), 0);
        assert_eq!(store.capacity(), 1);

        store.add(new_entry("first"));
        let latest = store.add(new_entry("second"));
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get(&latest.id).map(|e| e.content.as_str()), Some("second"));
    }
}

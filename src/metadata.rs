//! Side-channel metadata, persisted separately from artifact content.
//!
//! Records are keyed by the artifact's relative path (trash entries carry
//! the `Trash/` prefix). The lifecycle is deliberately independent of the
//! content file: a record follows its artifact across moves via
//! [`MetadataStore::relocate`] and survives the file's deletion, so tags
//! attached to a note are still there if the note ever comes back.
//!
//! The whole store serializes as one JSON document, rewritten on every
//! save cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata attached to one artifact.
///
/// `tags` is the structured part; anything else found in the persisted
/// document is kept verbatim in `extra` so foreign fields round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// All metadata records of a binder, keyed by relative path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    records: BTreeMap<String, MetadataRecord>,
}

impl MetadataStore {
    pub fn get(&self, key: &str) -> Option<&MetadataRecord> {
        self.records.get(key)
    }

    /// Fetch the record for `key`, creating an empty one if absent.
    pub fn upsert(&mut self, key: &str) -> &mut MetadataRecord {
        self.records.entry(key.to_string()).or_default()
    }

    /// Re-key a record after its artifact moved. A missing source record
    /// is a no-op; an existing record at the destination is replaced.
    pub fn relocate(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some(record) = self.records.remove(from) {
            self.records.insert(to.to_string(), record);
        }
    }

    /// Duplicate a record under a second key, leaving the source in place.
    pub fn copy(&mut self, from: &str, to: &str) {
        if let Some(record) = self.records.get(from).cloned() {
            self.records.insert(to.to_string(), record);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_then_get() {
        let mut store = MetadataStore::default();
        assert!(store.get("A/B/c.txt").is_none());

        store.upsert("A/B/c.txt").tags.push("urgent".to_string());
        assert_eq!(store.get("A/B/c.txt").unwrap().tags, vec!["urgent"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_relocate_moves_record() {
        let mut store = MetadataStore::default();
        store.upsert("A/B/c.txt").tags.push("keep".to_string());

        store.relocate("A/B/c.txt", "Trash/A/B/c.txt");
        assert!(!store.contains("A/B/c.txt"));
        assert_eq!(store.get("Trash/A/B/c.txt").unwrap().tags, vec!["keep"]);
    }

    #[test]
    fn test_relocate_missing_source_is_noop() {
        let mut store = MetadataStore::default();
        store.relocate("nope", "elsewhere");
        assert!(store.is_empty());
    }

    #[test]
    fn test_copy_leaves_source() {
        let mut store = MetadataStore::default();
        store.upsert("A/B/old.txt").tags.push("t".to_string());

        store.copy("A/B/old.txt", "A/B/new.txt");
        assert_eq!(store.get("A/B/old.txt").unwrap().tags, vec!["t"]);
        assert_eq!(store.get("A/B/new.txt").unwrap().tags, vec!["t"]);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = r#"{
            "A/B/c.txt": { "tags": ["x"], "color": "red", "stars": 3 }
        }"#;
        let store: MetadataStore = serde_json::from_str(raw).unwrap();
        let record = store.get("A/B/c.txt").unwrap();
        assert_eq!(record.tags, vec!["x"]);
        assert_eq!(
            record.extra.get("color"),
            Some(&serde_json::Value::String("red".to_string()))
        );

        let encoded = serde_json::to_string(&store).unwrap();
        assert!(encoded.contains("\"color\""));
        assert!(encoded.contains("\"stars\""));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut store = MetadataStore::default();
        store.upsert("A/B/c.txt");
        let encoded = serde_json::to_string(&store).unwrap();
        // keyed directly by path, no wrapper field
        assert!(encoded.starts_with("{\"A/B/c.txt\""));
    }
}

//! Keyed query cache shared by mutations and background refetches.
//!
//! Regions are addressed by `RegionKey` and hold the JSON rows of one
//! logical list query. Every operation here is a single synchronous block
//! under the region's map entry lock, so no caller ever observes a torn
//! intermediate state of another caller's change.

use dashmap::DashMap;
use serde_json::Value;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Resource kind segment of a region key; doubles as the URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Resource {
    Students,
    Categories,
    BehaviorLogs,
    AcademicLogs,
}

/// Addresses one logical list query, e.g. "organization X's academic logs".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub org_id: Uuid,
    pub resource: Resource,
}

impl RegionKey {
    pub fn new(org_id: Uuid, resource: Resource) -> Self {
        Self { org_id, resource }
    }
}

#[derive(Debug, Default)]
struct RegionState {
    entries: Vec<Value>,
    stale: bool,
}

/// Immutable capture of a region's entries taken before a speculative
/// write. Restoring puts back exactly what was captured: same entries,
/// same order, same field values.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    key: RegionKey,
    entries: Vec<Value>,
}

impl RegionSnapshot {
    pub fn key(&self) -> RegionKey {
        self.key
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }
}

/// Process-wide store for fetched rows, owned by the client session and
/// handed to collaborators explicitly.
#[derive(Debug, Default)]
pub struct QueryCache {
    regions: DashMap<RegionKey, RegionState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rows of a region; `None` when never fetched or written.
    pub fn read(&self, key: &RegionKey) -> Option<Vec<Value>> {
        self.regions.get(key).map(|r| r.entries.clone())
    }

    /// Capture the region as it is right now.
    pub fn snapshot(&self, key: &RegionKey) -> RegionSnapshot {
        RegionSnapshot {
            key: *key,
            entries: self.read(key).unwrap_or_default(),
        }
    }

    /// Replace the region's rows with authoritative data and clear
    /// staleness.
    pub fn write(&self, key: RegionKey, entries: Vec<Value>) {
        let mut region = self.regions.entry(key).or_default();
        region.entries = entries;
        region.stale = false;
    }

    /// Put a region back exactly as a snapshot captured it.
    pub fn restore(&self, snapshot: RegionSnapshot) {
        let mut region = self.regions.entry(snapshot.key).or_default();
        region.entries = snapshot.entries;
    }

    /// Mark a region stale so the background refetch refreshes it.
    pub fn invalidate(&self, key: &RegionKey) {
        let mut region = self.regions.entry(*key).or_default();
        region.stale = true;
    }

    pub fn is_stale(&self, key: &RegionKey) -> bool {
        self.regions.get(key).map(|r| r.stale).unwrap_or(false)
    }

    /// Keys of every region currently marked stale.
    pub fn stale_regions(&self) -> Vec<RegionKey> {
        self.regions
            .iter()
            .filter(|r| r.stale)
            .map(|r| *r.key())
            .collect()
    }

    /// Insert a row at the front of the region (newest-first lists).
    pub fn insert_first(&self, key: &RegionKey, entry: Value) {
        let mut region = self.regions.entry(*key).or_default();
        region.entries.insert(0, entry);
    }

    /// Merge-patch (RFC 7386) the row with the given id. Returns whether a
    /// row was found.
    pub fn merge_entry(&self, key: &RegionKey, id: &str, patch: &Value) -> bool {
        let mut region = self.regions.entry(*key).or_default();
        for entry in &mut region.entries {
            if entry_id(entry) == Some(id) {
                json_patch::merge(entry, patch);
                return true;
            }
        }
        false
    }

    /// Remove the row with the given id. Returns whether a row was found.
    pub fn remove_entry(&self, key: &RegionKey, id: &str) -> bool {
        let mut region = self.regions.entry(*key).or_default();
        let before = region.entries.len();
        region.entries.retain(|e| entry_id(e) != Some(id));
        region.entries.len() != before
    }

    /// Swap the row with `old_id` for `entry` in place, keeping its
    /// position. Returns whether a row was found.
    pub fn replace_entry(&self, key: &RegionKey, old_id: &str, entry: Value) -> bool {
        let mut region = self.regions.entry(*key).or_default();
        for slot in &mut region.entries {
            if entry_id(slot) == Some(old_id) {
                *slot = entry;
                return true;
            }
        }
        false
    }
}

/// The `id` field of a cached row, when present.
pub fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn key() -> RegionKey {
        RegionKey::new(Uuid::new_v4(), Resource::Students)
    }

    #[test]
    fn test_snapshot_restore_is_exact() {
        let cache = QueryCache::new();
        let key = key();
        cache.write(
            key,
            vec![json!({"id": "a", "name": "Ada"}), json!({"id": "b", "name": "Bo"})],
        );

        let snapshot = cache.snapshot(&key);
        cache.insert_first(&key, json!({"id": "c"}));
        cache.merge_entry(&key, "a", &json!({"name": "Changed"}));
        cache.remove_entry(&key, "b");

        cache.restore(snapshot);
        assert_eq!(
            cache.read(&key).unwrap(),
            vec![json!({"id": "a", "name": "Ada"}), json!({"id": "b", "name": "Bo"})]
        );
    }

    #[test]
    fn test_write_clears_staleness() {
        let cache = QueryCache::new();
        let key = key();
        cache.invalidate(&key);
        assert!(cache.is_stale(&key));
        assert_eq!(cache.stale_regions(), vec![key]);

        cache.write(key, vec![]);
        assert!(!cache.is_stale(&key));
        assert!(cache.stale_regions().is_empty());
    }

    #[test]
    fn test_merge_entry_patches_only_target_row() {
        let cache = QueryCache::new();
        let key = key();
        cache.write(key, vec![json!({"id": "a", "note": "x"}), json!({"id": "b", "note": "y"})]);

        assert!(cache.merge_entry(&key, "b", &json!({"note": "z"})));
        assert_eq!(
            cache.read(&key).unwrap(),
            vec![json!({"id": "a", "note": "x"}), json!({"id": "b", "note": "z"})]
        );
        assert!(!cache.merge_entry(&key, "missing", &json!({})));
    }

    #[test]
    fn test_replace_entry_keeps_position() {
        let cache = QueryCache::new();
        let key = key();
        cache.write(key, vec![json!({"id": "temp-1"}), json!({"id": "b"})]);

        assert!(cache.replace_entry(&key, "temp-1", json!({"id": "srv-42"})));
        let rows = cache.read(&key).unwrap();
        assert_eq!(entry_id(&rows[0]), Some("srv-42"));
        assert_eq!(entry_id(&rows[1]), Some("b"));
    }

    #[test]
    fn test_resource_path_segment() {
        assert_eq!(Resource::BehaviorLogs.to_string(), "behavior-logs");
        assert_eq!(Resource::Students.to_string(), "students");
    }
}

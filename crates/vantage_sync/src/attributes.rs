//! # Attribute Store & Snapshot Diff
//!
//! Named, dynamically typed entity attributes plus the change log that lets
//! each client receive only the keys that changed since it last looked.
//!
//! ## Change Log
//!
//! ```text
//! version:    1        2        3        4
//! change:   set hp   set name  set hp  unset name
//!
//! log:      hp -> 3, name -> 4          (latest version per key)
//! client A: watermark 2  => diff = [hp, name]   watermark -> 4
//! client B: never seen   => diff = [hp, name]   watermark -> 4
//! client A: again        => diff = []
//! ```
//!
//! The mapping, the log and the watermarks share one lock, so a `set`
//! can never slip between a diff's read of the log and its watermark bump.
//!
//! A removed key stays in the log only until every tracked client's
//! watermark has passed it. Clients that show up later never had the key,
//! so they are not told it was removed.

use std::collections::HashMap;

use parking_lot::Mutex;
use vantage_shared::Vec3;

use crate::client::ClientId;

/// Closed set of attribute value kinds the engine can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// 3D vector.
    Vec3(Vec3),
}

impl AttributeValue {
    /// Short name of the value kind, for logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Vec3(_) => "vec3",
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

/// Types that can be read back out of an [`AttributeValue`].
///
/// Reads are strict: an `Int` is not a `Float` and vice versa.
pub trait FromAttribute: Sized {
    /// Extracts `Self` if `value` holds this kind.
    fn from_attribute(value: &AttributeValue) -> Option<Self>;
}

impl FromAttribute for bool {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromAttribute for i64 {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromAttribute for f64 {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromAttribute for String {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromAttribute for Vec<u8> {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Bytes(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromAttribute for Vec3 {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// Keys changed since a client's previous diff, oldest change first.
///
/// Single use: the client's watermark already moved when this was produced,
/// so dropping it without sending means those keys are not offered again
/// until they change.
#[derive(Debug)]
pub struct ChangedKeys {
    keys: std::vec::IntoIter<String>,
}

impl ChangedKeys {
    /// Returns the number of keys not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there is nothing left to consume.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.len() == 0
    }
}

impl Iterator for ChangedKeys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for ChangedKeys {}

/// Everything behind the attribute lock.
#[derive(Debug, Default)]
struct AttributeTable {
    /// Live attribute values.
    values: HashMap<String, AttributeValue>,
    /// Latest change version per key, including not yet observed removals.
    changes: HashMap<String, u64>,
    /// Version of the most recent change.
    version: u64,
    /// Log version each client has already observed.
    watermarks: HashMap<ClientId, u64>,
}

impl AttributeTable {
    /// Drops removals every tracked client has already observed.
    fn prune_removed(&mut self) {
        if self.changes.len() == self.values.len() {
            return;
        }
        let floor = self.watermarks.values().copied().min().unwrap_or(u64::MAX);
        let values = &self.values;
        self.changes
            .retain(|key, version| values.contains_key(key) || *version > floor);
    }

    fn record(&mut self, key: &str) {
        self.version += 1;
        let version = self.version;
        match self.changes.get_mut(key) {
            Some(slot) => *slot = version,
            None => {
                self.changes.insert(key.to_owned(), version);
            }
        }
    }
}

/// Locked attribute mapping with a per-key change log.
#[derive(Debug, Default)]
pub struct AttributeStore {
    inner: Mutex<AttributeTable>,
}

impl AttributeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value` and records the change.
    ///
    /// Returns the previous value, if any.
    pub fn set(&self, key: &str, value: impl Into<AttributeValue>) -> Option<AttributeValue> {
        let mut table = self.inner.lock();
        let previous = table.values.insert(key.to_owned(), value.into());
        table.record(key);
        previous
    }

    /// Removes `key` and records the change.
    ///
    /// Removing an absent key is a no-op and records nothing.
    pub fn unset(&self, key: &str) -> Option<AttributeValue> {
        let mut table = self.inner.lock();
        let removed = table.values.remove(key)?;
        table.record(key);
        table.prune_removed();
        Some(removed)
    }

    /// Returns a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.inner.lock().values.get(key).cloned()
    }

    /// Returns the value under `key` if it holds kind `T`.
    ///
    /// Absence and kind mismatch both yield `None`.
    #[must_use]
    pub fn get_as<T: FromAttribute>(&self, key: &str) -> Option<T> {
        self.inner.lock().values.get(key).and_then(T::from_attribute)
    }

    /// Returns true if `key` currently holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().values.contains_key(key)
    }

    /// Returns the number of live attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    /// Returns true if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }

    /// Returns the version of the most recent change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Returns the keys changed since `client` last asked, and marks them seen.
    ///
    /// A client with no watermark gets every key ever recorded, removals
    /// included. Asking twice with no change in between yields nothing.
    pub fn diff_since(&self, client: ClientId) -> ChangedKeys {
        let mut table = self.inner.lock();
        let seen = table.watermarks.get(&client).copied().unwrap_or(0);

        let mut changed: Vec<(u64, &String)> = table
            .changes
            .iter()
            .filter(|(_, version)| **version > seen)
            .map(|(key, version)| (*version, key))
            .collect();
        // Versions are unique per key, so this order is total.
        changed.sort_unstable_by_key(|(version, _)| *version);
        let keys: Vec<String> = changed.into_iter().map(|(_, key)| key.clone()).collect();

        let now = table.version;
        table.watermarks.insert(client, now);
        table.prune_removed();
        ChangedKeys {
            keys: keys.into_iter(),
        }
    }

    /// Drops everything remembered about `client`.
    ///
    /// Its next diff starts from scratch. Returns false if it was unknown.
    pub fn forget_client(&self, client: ClientId) -> bool {
        let mut table = self.inner.lock();
        let known = table.watermarks.remove(&client).is_some();
        table.prune_removed();
        known
    }

    /// Returns the number of keys in the change log, live or removed.
    #[must_use]
    pub fn logged_keys(&self) -> usize {
        self.inner.lock().changes.len()
    }

    /// Returns the number of clients with a watermark.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.inner.lock().watermarks.len()
    }

    /// Copies the current value of each key, `None` where the key was removed.
    ///
    /// Lets the encoder work on owned data after the lock is released.
    #[must_use]
    pub fn snapshot<I, K>(&self, keys: I) -> Vec<(String, Option<AttributeValue>)>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let table = self.inner.lock();
        keys.into_iter()
            .map(|key| {
                let key = key.into();
                let value = table.values.get(&key).cloned();
                (key, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ClientId = ClientId(1);
    const B: ClientId = ClientId(2);

    #[test]
    fn test_set_get_unset() {
        let store = AttributeStore::new();
        assert!(store.set("hp", 100_i64).is_none());
        assert_eq!(store.get("hp"), Some(AttributeValue::Int(100)));

        let previous = store.set("hp", 90_i64);
        assert_eq!(previous, Some(AttributeValue::Int(100)));

        assert_eq!(store.unset("hp"), Some(AttributeValue::Int(90)));
        assert!(store.get("hp").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_typed_read_mismatch_is_absent() {
        let store = AttributeStore::new();
        store.set("hp", 100_i64);
        store.set("name", "wyrm");

        assert_eq!(store.get_as::<i64>("hp"), Some(100));
        assert_eq!(store.get_as::<f64>("hp"), None);
        assert_eq!(store.get_as::<String>("name"), Some("wyrm".to_string()));
        assert_eq!(store.get_as::<bool>("name"), None);
        assert_eq!(store.get_as::<i64>("missing"), None);
    }

    #[test]
    fn test_unset_absent_records_nothing() {
        let store = AttributeStore::new();
        assert!(store.unset("ghost").is_none());
        assert_eq!(store.version(), 0);
        assert_eq!(store.diff_since(A).len(), 0);
    }

    #[test]
    fn test_second_diff_is_empty() {
        let store = AttributeStore::new();
        store.set("hp", 100_i64);
        store.set("name", "wyrm");

        let first: Vec<_> = store.diff_since(A).collect();
        assert_eq!(first, vec!["hp".to_string(), "name".to_string()]);

        assert!(store.diff_since(A).is_empty());
    }

    #[test]
    fn test_diff_only_reports_new_changes() {
        let store = AttributeStore::new();
        store.set("hp", 100_i64);
        store.set("name", "wyrm");
        let _ = store.diff_since(A).count();

        store.set("hp", 50_i64);
        let diff: Vec<_> = store.diff_since(A).collect();
        assert_eq!(diff, vec!["hp".to_string()]);
    }

    #[test]
    fn test_diff_orders_by_latest_change() {
        let store = AttributeStore::new();
        store.set("a", 1_i64);
        store.set("b", 2_i64);
        store.set("a", 3_i64);

        let diff: Vec<_> = store.diff_since(A).collect();
        assert_eq!(diff, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_clients_are_independent() {
        let store = AttributeStore::new();
        store.set("hp", 100_i64);
        let _ = store.diff_since(A).count();

        store.set("mana", 10_i64);

        let a: Vec<_> = store.diff_since(A).collect();
        let b: Vec<_> = store.diff_since(B).collect();
        assert_eq!(a, vec!["mana".to_string()]);
        assert_eq!(b, vec!["hp".to_string(), "mana".to_string()]);
    }

    #[test]
    fn test_removal_is_reported() {
        let store = AttributeStore::new();
        store.set("buff", true);
        let _ = store.diff_since(A).count();

        store.unset("buff");
        let diff: Vec<_> = store.diff_since(A).collect();
        assert_eq!(diff, vec!["buff".to_string()]);

        let snapshot = store.snapshot(diff);
        assert_eq!(snapshot, vec![("buff".to_string(), None)]);
    }

    #[test]
    fn test_forget_client_resets_watermark() {
        let store = AttributeStore::new();
        store.set("hp", 100_i64);
        let _ = store.diff_since(A).count();
        assert_eq!(store.tracked_clients(), 1);

        assert!(store.forget_client(A));
        assert!(!store.forget_client(A));
        assert_eq!(store.tracked_clients(), 0);

        let diff: Vec<_> = store.diff_since(A).collect();
        assert_eq!(diff, vec!["hp".to_string()]);
    }

    #[test]
    fn test_snapshot_clones_values() {
        let store = AttributeStore::new();
        store.set("pos", Vec3::new(1.0, 2.0, 3.0));
        let snapshot = store.snapshot(["pos", "missing"]);
        assert_eq!(
            snapshot,
            vec![
                ("pos".to_string(), Some(AttributeValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))),
                ("missing".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_removal_pruned_once_everyone_saw_it() {
        let store = AttributeStore::new();
        store.set("buff", true);
        store.set("hp", 1_i64);
        let _ = store.diff_since(A).count();
        let _ = store.diff_since(B).count();

        store.unset("buff");
        assert_eq!(store.logged_keys(), 2);

        let a: Vec<_> = store.diff_since(A).collect();
        assert_eq!(a, vec!["buff".to_string()]);
        // B has not seen the removal yet.
        assert_eq!(store.logged_keys(), 2);

        let b: Vec<_> = store.diff_since(B).collect();
        assert_eq!(b, vec!["buff".to_string()]);
        assert_eq!(store.logged_keys(), 1);
    }

    #[test]
    fn test_new_client_not_told_about_unknown_removals() {
        let store = AttributeStore::new();
        store.set("buff", true);
        store.set("hp", 1_i64);
        let _ = store.diff_since(A).count();
        store.unset("buff");
        let _ = store.diff_since(A).count();

        let b: Vec<_> = store.diff_since(B).collect();
        assert_eq!(b, vec!["hp".to_string()]);
    }

    #[test]
    fn test_removal_with_no_clients_is_dropped() {
        let store = AttributeStore::new();
        store.set("buff", true);
        store.unset("buff");
        assert_eq!(store.logged_keys(), 0);
        assert!(store.diff_since(A).is_empty());
    }
}

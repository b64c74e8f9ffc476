//! In-memory entry storage backing the response cache.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::key::{CacheKey, Namespace};

/// A single cached response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
  /// Page-supplied fields, opaque to the cache
  pub payload: Map<String, Value>,
  /// Last successful population, `None` if never populated
  pub fetched_at: Option<DateTime<Utc>>,
  /// Total record count last observed by the dashboard
  pub record_count: Option<u64>,
}

impl CacheEntry {
  /// Whether this entry is younger than `max_age` at `now`.
  pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
    let Some(fetched_at) = self.fetched_at else {
      return false;
    };
    let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    (now - fetched_at).num_milliseconds() < max_age_ms
  }

  /// Look up a payload field. Explicit nulls count as missing.
  pub fn field(&self, name: &str) -> Option<&Value> {
    self.payload.get(name).filter(|v| !v.is_null())
  }

  /// Decode a payload field into a typed value.
  pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
    let value = self.field(name)?;
    match serde_json::from_value(value.clone()) {
      Ok(decoded) => Some(decoded),
      Err(e) => {
        tracing::warn!("Cached field '{}' has unexpected shape: {}", name, e);
        None
      }
    }
  }
}

/// Map of composite keys to entries.
#[derive(Debug, Clone)]
pub struct EntryStore {
  entries: HashMap<CacheKey, CacheEntry>,
}

impl EntryStore {
  /// Store in its canonical initial shape: one empty entry per known namespace.
  pub fn with_defaults() -> Self {
    let entries = Namespace::ALL
      .into_iter()
      .map(|ns| (CacheKey::new(ns), CacheEntry::default()))
      .collect();
    Self { entries }
  }

  pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// Merge `payload` into the entry for `key` and stamp it with `now`.
  pub fn merge(&mut self, key: &CacheKey, payload: Map<String, Value>, now: DateTime<Utc>) {
    let entry = self.entries.entry(key.clone()).or_default();
    entry.payload.extend(payload);
    entry.fetched_at = Some(now);
  }

  /// Entry for `key`, created empty (never fetched) if missing.
  pub fn entry_mut(&mut self, key: &CacheKey) -> &mut CacheEntry {
    self.entries.entry(key.clone()).or_default()
  }

  /// Remove the bare entry and every parameterized slot of `namespace`.
  pub fn remove_namespace(&mut self, namespace: Namespace) -> usize {
    let before = self.entries.len();
    self.entries.retain(|key, _| key.namespace() != namespace);
    before - self.entries.len()
  }

  pub fn reset(&mut self) {
    *self = Self::with_defaults();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

impl Default for EntryStore {
  fn default() -> Self {
    Self::with_defaults()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration as ChronoDuration, TimeZone};
  use serde_json::json;

  fn payload(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("payload must be an object"),
    }
  }

  #[test]
  fn test_defaults_cover_every_namespace() {
    let store = EntryStore::with_defaults();
    assert_eq!(store.len(), Namespace::ALL.len());
    for ns in Namespace::ALL {
      let entry = store.get(&CacheKey::new(ns)).expect("default entry");
      assert!(entry.payload.is_empty());
      assert!(entry.fetched_at.is_none());
    }
  }

  #[test]
  fn test_merge_keeps_unspecified_fields() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let key = CacheKey::new(Namespace::Dashboard);
    let mut store = EntryStore::with_defaults();

    store.merge(&key, payload(json!({"stats": 1, "transactions": []})), now);
    store.merge(&key, payload(json!({"stats": 2})), now);

    let entry = store.get(&key).unwrap();
    assert_eq!(entry.field("stats"), Some(&json!(2)));
    assert_eq!(entry.field("transactions"), Some(&json!([])));
  }

  #[test]
  fn test_merge_preserves_record_count() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let key = CacheKey::new(Namespace::Dashboard);
    let mut store = EntryStore::with_defaults();

    store.entry_mut(&key).record_count = Some(12);
    store.merge(&key, payload(json!({"stats": {}})), now);

    assert_eq!(store.get(&key).unwrap().record_count, Some(12));
  }

  #[test]
  fn test_remove_namespace_takes_parameterized_slots() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut store = EntryStore::with_defaults();
    let jan = CacheKey::with_params(Namespace::Reports, &json!({"month": 1}));
    let feb = CacheKey::with_params(Namespace::Reports, &json!({"month": 2}));
    store.merge(&jan, Map::new(), now);
    store.merge(&feb, Map::new(), now);

    assert_eq!(store.remove_namespace(Namespace::Reports), 3);
    assert!(store.get(&jan).is_none());
    assert!(store.get(&CacheKey::new(Namespace::Dashboard)).is_some());
  }

  #[test]
  fn test_is_fresh_boundary() {
    let fetched = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let entry = CacheEntry {
      fetched_at: Some(fetched),
      ..Default::default()
    };
    let max_age = Duration::from_secs(60);

    assert!(entry.is_fresh_at(fetched + ChronoDuration::milliseconds(59_999), max_age));
    assert!(!entry.is_fresh_at(fetched + ChronoDuration::seconds(60), max_age));
  }

  #[test]
  fn test_never_fetched_is_never_fresh() {
    let entry = CacheEntry::default();
    assert!(!entry.is_fresh_at(Utc::now(), Duration::MAX));
  }

  #[test]
  fn test_decode_ignores_null_fields() {
    let entry = CacheEntry {
      payload: payload(json!({"data": null})),
      ..Default::default()
    };
    assert!(entry.decode::<Vec<u32>>("data").is_none());
  }
}

//! The response cache handle shared by page controllers.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::graph::InvalidationGraph;
use super::key::{CacheKey, Namespace};
use super::storage::{CacheEntry, EntryStore};
use super::traits::{Clock, SystemClock};

/// Proof that a fetch for a key was started, used to drop out-of-order responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
  key: CacheKey,
  generation: u64,
}

#[derive(Debug)]
struct CacheState {
  store: EntryStore,
  next_generation: u64,
  /// Latest outstanding ticket generation per key
  in_flight: HashMap<CacheKey, u64>,
}

impl CacheState {
  fn clear_namespace(&mut self, namespace: Namespace) -> usize {
    self.in_flight.retain(|key, _| key.namespace() != namespace);
    self.store.remove_namespace(namespace)
  }
}

/// In-memory, per-session response cache.
///
/// Cloning yields another handle to the same store. Every operation locks the
/// store once and completes without suspending, so a single call is atomic but
/// a sequence of calls is not.
#[derive(Clone)]
pub struct ResponseCache {
  state: Arc<Mutex<CacheState>>,
  clock: Arc<dyn Clock>,
  graph: Arc<InvalidationGraph>,
}

impl ResponseCache {
  /// Create an empty cache on the wall clock with the default dependency graph.
  pub fn new() -> Self {
    Self::with_clock(SystemClock)
  }

  pub fn with_clock(clock: impl Clock + 'static) -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState {
        store: EntryStore::with_defaults(),
        next_generation: 0,
        in_flight: HashMap::new(),
      })),
      clock: Arc::new(clock),
      graph: Arc::new(InvalidationGraph::default()),
    }
  }

  fn state(&self) -> MutexGuard<'_, CacheState> {
    // A panic mid-operation leaves at worst a missing or stale entry
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Whether the entry for `key` was populated less than `max_age` ago.
  pub fn is_fresh(&self, key: impl Into<CacheKey>, max_age: Duration) -> bool {
    let key = key.into();
    let now = self.clock.now();
    let fresh = self
      .state()
      .store
      .get(&key)
      .is_some_and(|entry| entry.is_fresh_at(now, max_age));

    debug!(key = %key, fresh, "cache freshness check");
    fresh
  }

  /// Raw entry for `key`, fresh or not.
  pub fn get(&self, key: impl Into<CacheKey>) -> Option<CacheEntry> {
    let key = key.into();
    self.state().store.get(&key).cloned()
  }

  /// Merge `payload` into the entry for `key` and mark it fetched now.
  pub fn set(&self, key: impl Into<CacheKey>, payload: Map<String, Value>) {
    let key = key.into();
    let now = self.clock.now();
    debug!(key = %key, fields = payload.len(), "cache set");
    self.state().store.merge(&key, payload, now);
  }

  /// Drop one namespace (all of its parameterized slots), or reset everything.
  pub fn clear(&self, namespace: Option<Namespace>) {
    let mut state = self.state();
    match namespace {
      Some(ns) => {
        let removed = state.clear_namespace(ns);
        debug!(namespace = %ns, removed, "cache clear");
      }
      None => {
        state.store.reset();
        state.in_flight.clear();
        debug!("cache reset");
      }
    }
  }

  /// Clear `root` and everything that depends on it. Returns what was cleared.
  pub fn invalidate(&self, root: Namespace) -> Vec<Namespace> {
    let mut cleared = vec![root];
    cleared.extend(self.graph.dependents(root));

    let mut state = self.state();
    for &ns in &cleared {
      state.clear_namespace(ns);
    }
    debug!(root = %root, ?cleared, "cache invalidation cascade");
    cleared
  }

  /// Compare `new_count` with the last record count seen on the dashboard.
  ///
  /// On the first observation or on any change, stores the count, clears every
  /// namespace that depends on the dashboard and returns `true`. Otherwise returns
  /// `false` without touching anything.
  ///
  /// The count lives on the bare dashboard entry, so clearing the dashboard
  /// (directly or through a cascade) forgets it and the next call returns `true`.
  pub fn invalidate_if_count_changed(&self, new_count: u64) -> bool {
    let dashboard = CacheKey::new(Namespace::Dashboard);
    let mut state = self.state();

    let entry = state.store.entry_mut(&dashboard);
    if entry.record_count == Some(new_count) {
      return false;
    }
    let previous = entry.record_count.replace(new_count);

    let dependents = self.graph.dependents(Namespace::Dashboard);
    for &ns in &dependents {
      state.clear_namespace(ns);
    }
    debug!(?previous, new_count, cleared = ?dependents, "record count changed");
    true
  }

  /// Last record count seen by the dashboard.
  pub fn record_count(&self) -> Option<u64> {
    self
      .state()
      .store
      .get(&CacheKey::new(Namespace::Dashboard))
      .and_then(|entry| entry.record_count)
  }

  /// Forget the dashboard's record count so the next observation counts as a change.
  pub fn forget_record_count(&self) {
    let previous = self
      .state()
      .store
      .entry_mut(&CacheKey::new(Namespace::Dashboard))
      .record_count
      .take();
    debug!(?previous, "record count forgotten");
  }

  /// Register a fetch for `key`. Any earlier ticket for the same key is superseded.
  pub fn begin_fetch(&self, key: impl Into<CacheKey>) -> FetchTicket {
    let key = key.into();
    let mut state = self.state();
    state.next_generation += 1;
    let generation = state.next_generation;
    state.in_flight.insert(key.clone(), generation);
    FetchTicket { key, generation }
  }

  /// Store the response for `ticket` if it is still the latest fetch for its key
  /// and the key was not cleared meanwhile. Returns whether it was stored.
  pub fn complete_fetch(&self, ticket: FetchTicket, payload: Map<String, Value>) -> bool {
    let now = self.clock.now();
    let mut state = self.state();

    if state.in_flight.get(&ticket.key) != Some(&ticket.generation) {
      debug!(key = %ticket.key, generation = ticket.generation, "discarding superseded response");
      return false;
    }
    state.in_flight.remove(&ticket.key);
    state.store.merge(&ticket.key, payload, now);
    true
  }

  /// Retire `ticket` after a failed fetch. A newer ticket for the same key is kept.
  pub fn cancel_fetch(&self, ticket: FetchTicket) {
    let mut state = self.state();
    if state.in_flight.get(&ticket.key) == Some(&ticket.generation) {
      state.in_flight.remove(&ticket.key);
      debug!(key = %ticket.key, generation = ticket.generation, "fetch cancelled");
    }
  }

  #[cfg(test)]
  pub fn in_flight(&self) -> usize {
    self.state().in_flight.len()
  }
}

impl Default for ResponseCache {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for ResponseCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state();
    f.debug_struct("ResponseCache")
      .field("entries", &state.store.len())
      .field("in_flight", &state.in_flight.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::ManualClock;
  use chrono::Duration as ChronoDuration;
  use serde_json::json;

  fn payload(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("payload must be an object"),
    }
  }

  fn cache() -> (ResponseCache, ManualClock) {
    let clock = ManualClock::new();
    (ResponseCache::with_clock(clock.clone()), clock)
  }

  const MINUTE: Duration = Duration::from_secs(60);

  #[test]
  fn test_never_set_is_not_fresh() {
    let (cache, _) = cache();
    for ns in Namespace::ALL {
      assert!(!cache.is_fresh(ns, Duration::MAX));
    }
  }

  #[test]
  fn test_fresh_right_after_set() {
    let (cache, _) = cache();
    cache.set(Namespace::Statistics, payload(json!({"data": 1})));
    assert!(cache.is_fresh(Namespace::Statistics, Duration::from_millis(1)));
  }

  #[test]
  fn test_freshness_decays() {
    let (cache, clock) = cache();
    let max_age = Duration::from_millis(5_000);
    cache.set(Namespace::Transactions, payload(json!({"data": []})));

    clock.advance_ms(5_001);
    assert!(!cache.is_fresh(Namespace::Transactions, max_age));
  }

  #[test]
  fn test_set_refreshes_timestamp() {
    let (cache, clock) = cache();
    cache.set(Namespace::Reports, payload(json!({"data": 1})));
    clock.advance_ms(4 * 60_000);
    cache.set(Namespace::Reports, payload(json!({"data": 2})));
    clock.advance_ms(2 * 60_000);

    assert!(cache.is_fresh(Namespace::Reports, 5 * MINUTE));
  }

  #[test]
  fn test_clear_one_namespace_leaves_others() {
    let (cache, _) = cache();
    cache.set(Namespace::Transactions, payload(json!({"data": []})));
    cache.set(Namespace::Dashboard, payload(json!({"stats": {}})));

    cache.clear(Some(Namespace::Transactions));

    assert!(!cache.is_fresh(Namespace::Transactions, MINUTE));
    assert!(cache.get(Namespace::Transactions).is_none());
    assert!(cache.is_fresh(Namespace::Dashboard, MINUTE));
  }

  #[test]
  fn test_clear_all_resets_to_defaults() {
    let (cache, _) = cache();
    for ns in Namespace::ALL {
      cache.set(ns, payload(json!({"data": 1})));
    }
    cache.invalidate_if_count_changed(3);

    cache.clear(None);

    for ns in Namespace::ALL {
      assert!(!cache.is_fresh(ns, Duration::MAX));
      let entry = cache.get(ns).expect("default entry after reset");
      assert!(entry.payload.is_empty());
      assert!(entry.fetched_at.is_none());
    }
    assert_eq!(cache.record_count(), None);
  }

  #[test]
  fn test_count_change_sequence() {
    let (cache, _) = cache();
    assert!(cache.invalidate_if_count_changed(10));
    assert!(!cache.invalidate_if_count_changed(10));

    cache.set(Namespace::Transactions, payload(json!({"data": []})));
    cache.set(Namespace::Reports, payload(json!({"data": {}})));
    cache.set(Namespace::Statistics, payload(json!({"data": {}})));
    cache.set(Namespace::TransactionGroups, payload(json!({"data": []})));

    assert!(cache.invalidate_if_count_changed(11));
    assert!(!cache.is_fresh(Namespace::Transactions, MINUTE));
    assert!(!cache.is_fresh(Namespace::Reports, MINUTE));
    assert!(!cache.is_fresh(Namespace::Statistics, MINUTE));
    assert!(cache.is_fresh(Namespace::TransactionGroups, MINUTE));
    assert_eq!(cache.record_count(), Some(11));
  }

  #[test]
  fn test_unchanged_count_mutates_nothing() {
    let (cache, _) = cache();
    cache.invalidate_if_count_changed(4);
    cache.set(Namespace::Reports, payload(json!({"data": {}})));

    assert!(!cache.invalidate_if_count_changed(4));
    assert!(cache.is_fresh(Namespace::Reports, MINUTE));
  }

  #[test]
  fn test_zero_is_a_valid_first_count() {
    let (cache, _) = cache();
    assert!(cache.invalidate_if_count_changed(0));
    assert!(!cache.invalidate_if_count_changed(0));
  }

  #[test]
  fn test_count_survives_dashboard_set() {
    let (cache, _) = cache();
    cache.invalidate_if_count_changed(7);
    cache.set(Namespace::Dashboard, payload(json!({"stats": {}, "transactions": []})));
    assert!(!cache.invalidate_if_count_changed(7));
  }

  #[test]
  fn test_count_change_keeps_dashboard_fresh() {
    let (cache, _) = cache();
    cache.set(Namespace::Dashboard, payload(json!({"stats": {}})));
    cache.invalidate_if_count_changed(1);
    assert!(cache.is_fresh(Namespace::Dashboard, MINUTE));
  }

  #[test]
  fn test_parameterized_slots_are_independent() {
    let (cache, _) = cache();
    let jan = json!({"year": 2024, "month": 1});
    let feb = json!({"year": 2024, "month": 2});
    cache.set(
      CacheKey::with_params(Namespace::Reports, &jan),
      payload(json!({"data": "p1"})),
    );

    assert!(!cache.is_fresh(CacheKey::with_params(Namespace::Reports, &feb), MINUTE));
    assert!(cache.is_fresh(CacheKey::with_params(Namespace::Reports, &jan), MINUTE));
    assert!(!cache.is_fresh(Namespace::Reports, MINUTE));
  }

  #[test]
  fn test_dashboard_refresh_scenario() {
    let (cache, clock) = cache();
    let stats = json!({"total_income": 1000, "transaction_count": 3});
    cache.set(
      Namespace::Dashboard,
      payload(json!({"stats": stats.clone(), "transactions": []})),
    );

    clock.advance(ChronoDuration::minutes(1));

    assert!(cache.is_fresh(Namespace::Dashboard, 3 * MINUTE));
    let entry = cache.get(Namespace::Dashboard).unwrap();
    assert_eq!(entry.field("stats"), Some(&stats));
  }

  #[test]
  fn test_invalidate_transactions_cascade() {
    let (cache, _) = cache();
    for ns in Namespace::ALL {
      cache.set(ns, payload(json!({"data": 1})));
    }

    let cleared = cache.invalidate(Namespace::Transactions);

    assert_eq!(cleared.len(), 4);
    assert!(!cache.is_fresh(Namespace::Transactions, MINUTE));
    assert!(!cache.is_fresh(Namespace::Dashboard, MINUTE));
    assert!(!cache.is_fresh(Namespace::Statistics, MINUTE));
    assert!(!cache.is_fresh(Namespace::Reports, MINUTE));
    assert!(cache.is_fresh(Namespace::TransactionGroups, MINUTE));
  }

  #[test]
  fn test_latest_ticket_wins() {
    let (cache, _) = cache();
    let first = cache.begin_fetch(Namespace::Transactions);
    let second = cache.begin_fetch(Namespace::Transactions);

    assert!(cache.complete_fetch(second, payload(json!({"data": "new"}))));
    assert!(!cache.complete_fetch(first, payload(json!({"data": "old"}))));

    let entry = cache.get(Namespace::Transactions).unwrap();
    assert_eq!(entry.field("data"), Some(&json!("new")));
  }

  #[test]
  fn test_clear_retires_outstanding_tickets() {
    let (cache, _) = cache();
    let ticket = cache.begin_fetch(Namespace::Transactions);
    cache.invalidate(Namespace::Transactions);

    assert!(!cache.complete_fetch(ticket, payload(json!({"data": "stale"}))));
    assert!(!cache.is_fresh(Namespace::Transactions, MINUTE));
  }

  #[test]
  fn test_tickets_are_per_key() {
    let (cache, _) = cache();
    let jan = CacheKey::with_params(Namespace::Reports, &json!({"month": 1}));
    let feb = CacheKey::with_params(Namespace::Reports, &json!({"month": 2}));
    let t_jan = cache.begin_fetch(jan.clone());
    let t_feb = cache.begin_fetch(feb.clone());

    assert!(cache.complete_fetch(t_feb, Map::new()));
    assert!(cache.complete_fetch(t_jan, Map::new()));
    assert!(cache.is_fresh(jan, MINUTE));
    assert!(cache.is_fresh(feb, MINUTE));
  }

  #[test]
  fn test_cancel_fetch_retires_ticket() {
    let (cache, _) = cache();
    let ticket = cache.begin_fetch(Namespace::Statistics);
    assert_eq!(cache.in_flight(), 1);

    cache.cancel_fetch(ticket.clone());

    assert_eq!(cache.in_flight(), 0);
    assert!(!cache.complete_fetch(ticket, payload(json!({"data": 1}))));
    assert!(!cache.is_fresh(Namespace::Statistics, MINUTE));
  }

  #[test]
  fn test_cancel_fetch_keeps_newer_ticket() {
    let (cache, _) = cache();
    let first = cache.begin_fetch(Namespace::Reports);
    let second = cache.begin_fetch(Namespace::Reports);

    cache.cancel_fetch(first);

    assert_eq!(cache.in_flight(), 1);
    assert!(cache.complete_fetch(second, payload(json!({"data": 1}))));
  }

  #[test]
  fn test_clearing_dashboard_forgets_count() {
    let (cache, _) = cache();
    cache.invalidate_if_count_changed(5);

    cache.clear(Some(Namespace::Dashboard));

    assert_eq!(cache.record_count(), None);
    assert!(cache.invalidate_if_count_changed(5));
  }

  #[test]
  fn test_forget_record_count() {
    let (cache, _) = cache();
    cache.invalidate_if_count_changed(2);
    cache.set(Namespace::Dashboard, payload(json!({"stats": {}})));

    cache.forget_record_count();

    assert_eq!(cache.record_count(), None);
    assert!(cache.is_fresh(Namespace::Dashboard, MINUTE));
    assert!(cache.invalidate_if_count_changed(2));
  }

  #[test]
  fn test_clones_share_state() {
    let (cache, _) = cache();
    let other = cache.clone();
    other.set(Namespace::Reports, Map::new());
    assert!(cache.is_fresh(Namespace::Reports, MINUTE));
  }

  #[test]
  fn test_independent_instances() {
    let (a, _) = cache();
    let (b, _) = cache();
    a.set(Namespace::Reports, Map::new());
    assert!(!b.is_fresh(Namespace::Reports, MINUTE));
  }
}

//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Result of a page load, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(data: T, fetched_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      fetched_at,
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where page data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the API during this load
  Network,
  /// Served from a fresh cache entry
  Cache,
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
  use super::Clock;
  use chrono::{DateTime, Duration, TimeZone, Utc};
  use std::sync::{Arc, Mutex};

  /// Clock that only moves when told to.
  #[derive(Debug, Clone)]
  pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
  }

  impl ManualClock {
    pub fn new() -> Self {
      let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
      Self {
        now: Arc::new(Mutex::new(start)),
      }
    }

    pub fn advance(&self, by: Duration) {
      let mut now = self.now.lock().unwrap();
      *now += by;
    }

    pub fn advance_ms(&self, ms: i64) {
      self.advance(Duration::milliseconds(ms));
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
    }
  }
}

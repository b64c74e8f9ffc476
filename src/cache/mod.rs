//! Client-side response cache.
//!
//! This module memoizes API responses for the lifetime of one session:
//! - Entries are keyed by namespace, optionally narrowed by query parameters
//! - Freshness is a caller-supplied maximum age, checked against the fetch time
//! - Writes invalidate dependent namespaces through an explicit dependency graph
//! - Fetch tickets drop responses that arrive after a newer fetch or a clear
//!
//! Nothing is persisted and nothing is evicted by size.

mod graph;
mod key;
mod layer;
mod policy;
mod storage;
mod traits;

pub use key::{CacheKey, Namespace};
pub use layer::ResponseCache;
pub use policy::FreshnessPolicy;
pub use traits::CacheResult;

#[cfg(test)]
pub use traits::ManualClock;

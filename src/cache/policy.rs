//! How long each namespace stays fresh.

use std::collections::BTreeMap;
use std::time::Duration;

use super::key::Namespace;

/// Per-namespace maximum age.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessPolicy {
  max_ages: BTreeMap<Namespace, Duration>,
}

impl FreshnessPolicy {
  /// Default max age for a namespace.
  pub fn default_max_age(namespace: Namespace) -> Duration {
    match namespace {
      Namespace::Transactions => Duration::from_secs(3 * 60),
      Namespace::Dashboard
      | Namespace::Statistics
      | Namespace::Reports
      | Namespace::TransactionGroups => Duration::from_secs(5 * 60),
    }
  }

  /// Override the max age of one namespace.
  pub fn with_max_age(mut self, namespace: Namespace, max_age: Duration) -> Self {
    self.max_ages.insert(namespace, max_age);
    self
  }

  pub fn max_age(&self, namespace: Namespace) -> Duration {
    self
      .max_ages
      .get(&namespace)
      .copied()
      .unwrap_or_else(|| Self::default_max_age(namespace))
  }

  /// Build from `namespace -> seconds` overrides, as read from config.
  pub fn from_overrides(overrides: &BTreeMap<Namespace, u64>) -> Self {
    overrides
      .iter()
      .fold(Self::default(), |policy, (&ns, &secs)| {
        policy.with_max_age(ns, Duration::from_secs(secs))
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let policy = FreshnessPolicy::default();
    assert_eq!(policy.max_age(Namespace::Dashboard), Duration::from_secs(300));
    assert_eq!(policy.max_age(Namespace::Transactions), Duration::from_secs(180));
    assert_eq!(policy.max_age(Namespace::Statistics), Duration::from_secs(300));
    assert_eq!(policy.max_age(Namespace::Reports), Duration::from_secs(300));
    assert_eq!(
      policy.max_age(Namespace::TransactionGroups),
      Duration::from_secs(300)
    );
  }

  #[test]
  fn test_overrides() {
    let overrides = BTreeMap::from([(Namespace::Dashboard, 120)]);
    let policy = FreshnessPolicy::from_overrides(&overrides);
    assert_eq!(policy.max_age(Namespace::Dashboard), Duration::from_secs(120));
    assert_eq!(policy.max_age(Namespace::Reports), Duration::from_secs(300));
  }
}

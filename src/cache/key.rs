//! Namespaces and composite cache keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Logical cache bucket, one per page/resource type.
///
/// The string forms are a contract shared with every caller and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Namespace {
  #[serde(rename = "dashboard")]
  Dashboard,
  #[serde(rename = "transactions")]
  Transactions,
  #[serde(rename = "statistics")]
  Statistics,
  #[serde(rename = "reports")]
  Reports,
  #[serde(rename = "transactionGroups")]
  TransactionGroups,
}

impl Namespace {
  /// Every known namespace, in the order the store lays out its default shape.
  pub const ALL: [Namespace; 5] = [
    Namespace::Dashboard,
    Namespace::Statistics,
    Namespace::Transactions,
    Namespace::Reports,
    Namespace::TransactionGroups,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Namespace::Dashboard => "dashboard",
      Namespace::Transactions => "transactions",
      Namespace::Statistics => "statistics",
      Namespace::Reports => "reports",
      Namespace::TransactionGroups => "transactionGroups",
    }
  }
}

impl fmt::Display for Namespace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A namespace, optionally narrowed by a parameter object.
///
/// Two keys built from parameter objects with the same values are equal no matter
/// in which order the object fields were inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  namespace: Namespace,
  /// Canonical JSON of the parameters, if any
  params: Option<String>,
}

impl CacheKey {
  /// Key for the bare namespace.
  pub fn new(namespace: Namespace) -> Self {
    Self {
      namespace,
      params: None,
    }
  }

  /// Key for a namespace under specific query parameters.
  ///
  /// `Value::Null` is treated as "no parameters".
  pub fn with_params(namespace: Namespace, params: &Value) -> Self {
    let params = match params {
      Value::Null => None,
      other => Some(canonical_json(other)),
    };
    Self { namespace, params }
  }

  pub fn namespace(&self) -> Namespace {
    self.namespace
  }
}

impl From<Namespace> for CacheKey {
  fn from(namespace: Namespace) -> Self {
    CacheKey::new(namespace)
  }
}

impl From<&CacheKey> for CacheKey {
  fn from(key: &CacheKey) -> Self {
    key.clone()
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.params {
      Some(params) => write!(f, "{}_{}", self.namespace, params),
      None => write!(f, "{}", self.namespace),
    }
  }
}

/// Serialize a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
  let mut out = String::new();
  write_canonical(value, &mut out);
  out
}

fn write_canonical(value: &Value, out: &mut String) {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(&String, &Value)> = map.iter().collect();
      entries.sort_by(|a, b| a.0.cmp(b.0));

      out.push('{');
      for (i, (k, v)) in entries.into_iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        // Strings always serialize
        out.push_str(&Value::String(k.clone()).to_string());
        out.push(':');
        write_canonical(v, out);
      }
      out.push('}');
    }
    Value::Array(items) => {
      out.push('[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_canonical(item, out);
      }
      out.push(']');
    }
    scalar => out.push_str(&scalar.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_namespace_strings_are_stable() {
    assert_eq!(Namespace::Dashboard.as_str(), "dashboard");
    assert_eq!(Namespace::Transactions.as_str(), "transactions");
    assert_eq!(Namespace::Statistics.as_str(), "statistics");
    assert_eq!(Namespace::Reports.as_str(), "reports");
    assert_eq!(Namespace::TransactionGroups.as_str(), "transactionGroups");
  }

  #[test]
  fn test_namespace_deserializes_from_contract_string() {
    let ns: Namespace = serde_json::from_str(r#""transactionGroups""#).unwrap();
    assert_eq!(ns, Namespace::TransactionGroups);
    assert!(serde_json::from_str::<Namespace>(r#""groups""#).is_err());
  }

  #[test]
  fn test_bare_key_display() {
    assert_eq!(CacheKey::new(Namespace::Dashboard).to_string(), "dashboard");
  }

  #[test]
  fn test_param_key_display() {
    let key = CacheKey::with_params(Namespace::Reports, &json!({"year": 2024, "month": 1}));
    assert_eq!(key.to_string(), r#"reports_{"month":1,"year":2024}"#);
  }

  #[test]
  fn test_field_order_does_not_matter() {
    let mut a = serde_json::Map::new();
    a.insert("year".into(), json!(2024));
    a.insert("type".into(), json!("monthly"));
    let mut b = serde_json::Map::new();
    b.insert("type".into(), json!("monthly"));
    b.insert("year".into(), json!(2024));

    let ka = CacheKey::with_params(Namespace::Statistics, &Value::Object(a));
    let kb = CacheKey::with_params(Namespace::Statistics, &Value::Object(b));
    assert_eq!(ka, kb);
    assert_eq!(ka.to_string(), kb.to_string());
  }

  #[test]
  fn test_nested_objects_are_sorted() {
    let value = json!({"b": {"z": 1, "a": [ {"y": 2, "x": 1} ]}, "a": null});
    assert_eq!(
      canonical_json(&value),
      r#"{"a":null,"b":{"a":[{"x":1,"y":2}],"z":1}}"#
    );
  }

  #[test]
  fn test_different_params_are_different_keys() {
    let jan = CacheKey::with_params(Namespace::Reports, &json!({"year": 2024, "month": 1}));
    let feb = CacheKey::with_params(Namespace::Reports, &json!({"year": 2024, "month": 2}));
    assert_ne!(jan, feb);
  }

  #[test]
  fn test_null_params_is_bare_key() {
    assert_eq!(
      CacheKey::with_params(Namespace::Dashboard, &Value::Null),
      CacheKey::new(Namespace::Dashboard)
    );
  }
}

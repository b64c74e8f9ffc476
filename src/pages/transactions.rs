use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::PageLoader;
use crate::api::types::{Transaction, TransactionQuery, TransactionType};
use crate::api::{ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, Namespace};

impl<A: FinanceApi> PageLoader<A> {
  /// Load the full transaction list.
  pub async fn transactions(&self, force: bool) -> ApiResult<CacheResult<Vec<Transaction>>> {
    self
      .fetch(CacheKey::new(Namespace::Transactions), "data", force, || {
        let api = self.api.clone();
        async move { api.transactions(TransactionQuery::default()).await }
      })
      .await
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
  #[default]
  Date,
  /// By absolute value
  Amount,
  Description,
  Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortField {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortField::Date => "date",
      SortField::Amount => "amount",
      SortField::Description => "description",
      SortField::Type => "type",
    }
  }
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }
}

/// Client-side filters and ordering for the transaction list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
  /// Case-insensitive match on description, categories and user name
  pub search: String,
  pub kind: Option<TransactionType>,
  /// Matches either the plain or the expense category
  pub category: Option<String>,
  pub date_from: Option<NaiveDate>,
  pub date_to: Option<NaiveDate>,
  pub sort_by: SortField,
  pub order: SortOrder,
}

impl TransactionFilter {
  pub fn is_active(&self) -> bool {
    !self.search.is_empty()
      || self.kind.is_some()
      || self.category.is_some()
      || self.date_from.is_some()
      || self.date_to.is_some()
  }

  pub fn matches(&self, tx: &Transaction) -> bool {
    if !self.search.is_empty() {
      let needle = self.search.to_lowercase();
      let hit = [
        tx.description.as_deref(),
        tx.category.as_deref(),
        tx.expense_category.as_deref(),
        tx.user_name(),
      ]
      .into_iter()
      .flatten()
      .any(|field| field.to_lowercase().contains(&needle));
      if !hit {
        return false;
      }
    }

    if self.kind.is_some_and(|kind| kind != tx.kind) {
      return false;
    }

    if let Some(category) = &self.category {
      let same = tx.category.as_ref() == Some(category) || tx.expense_category.as_ref() == Some(category);
      if !same {
        return false;
      }
    }

    // Undated rows never pass a date bound
    if let Some(from) = self.date_from {
      if !tx.booking_date().is_some_and(|d| d >= from) {
        return false;
      }
    }
    if let Some(to) = self.date_to {
      if !tx.booking_date().is_some_and(|d| d <= to) {
        return false;
      }
    }

    true
  }

  /// Short description of the active filters and ordering, e.g. `expense, from 2024-03-01, amount asc`.
  pub fn summary(&self) -> String {
    let mut parts = Vec::new();
    if let Some(kind) = self.kind {
      parts.push(kind.as_str().to_string());
    }
    if let Some(category) = &self.category {
      parts.push(format!("category {}", category));
    }
    if let Some(from) = self.date_from {
      parts.push(format!("from {}", from));
    }
    if let Some(to) = self.date_to {
      parts.push(format!("to {}", to));
    }
    if self.sort_by != SortField::default() || self.order != SortOrder::default() {
      parts.push(format!("{} {}", self.sort_by.as_str(), self.order.as_str()));
    }
    parts.join(", ")
  }

  /// Filtered and sorted copy of `transactions`.
  pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
    let mut rows: Vec<Transaction> = transactions
      .iter()
      .filter(|tx| self.matches(tx))
      .cloned()
      .collect();

    rows.sort_by(|a, b| {
      let ordering = compare(self.sort_by, a, b);
      match self.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
      }
    });
    rows
  }
}

fn compare(field: SortField, a: &Transaction, b: &Transaction) -> Ordering {
  match field {
    SortField::Date => a.booking_date().cmp(&b.booking_date()),
    SortField::Amount => a
      .amount
      .abs()
      .partial_cmp(&b.amount.abs())
      .unwrap_or(Ordering::Equal),
    SortField::Description => a
      .description()
      .to_lowercase()
      .cmp(&b.description().to_lowercase()),
    SortField::Type => a.kind.as_str().cmp(b.kind.as_str()),
  }
}

/// Every plain and expense category in use, sorted and deduplicated.
pub fn unique_categories(transactions: &[Transaction]) -> Vec<String> {
  transactions
    .iter()
    .flat_map(|tx| [tx.category.as_deref(), tx.expense_category.as_deref()])
    .flatten()
    .filter(|c| !c.is_empty())
    .map(String::from)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::UserRef;
  use crate::cache::{FreshnessPolicy, ManualClock, ResponseCache};
  use crate::pages::fake::{tx, FakeApi};

  fn sample() -> Vec<Transaction> {
    let mut salary = tx(1, TransactionType::Income, 5_000_000.0, "2024-03-01", "");
    salary.description = Some("Gaji Maret".to_string());
    salary.category = Some("Gaji".to_string());
    let mut food = tx(2, TransactionType::Expense, -150_000.0, "2024-03-05", "Makan");
    food.user = Some(UserRef {
      id: Some(7),
      name: Some("Budi".to_string()),
    });
    let fuel = tx(3, TransactionType::Expense, 300_000.0, "2024-03-03", "Transport");
    vec![salary, food, fuel]
  }

  fn ids(rows: &[Transaction]) -> Vec<u64> {
    rows.iter().map(|t| t.id).collect()
  }

  #[test]
  fn test_default_sorts_newest_first() {
    let rows = TransactionFilter::default().apply(&sample());
    assert_eq!(ids(&rows), vec![2, 3, 1]);
  }

  #[test]
  fn test_search_covers_user_and_category() {
    let filter = TransactionFilter {
      search: "budi".to_string(),
      ..Default::default()
    };
    assert_eq!(ids(&filter.apply(&sample())), vec![2]);

    let filter = TransactionFilter {
      search: "TRANS".to_string(),
      ..Default::default()
    };
    // Every sample description contains "Transaksi" except the salary
    assert_eq!(ids(&filter.apply(&sample())), vec![2, 3]);
  }

  #[test]
  fn test_type_and_category_filters() {
    let filter = TransactionFilter {
      kind: Some(TransactionType::Expense),
      category: Some("Transport".to_string()),
      ..Default::default()
    };
    assert_eq!(ids(&filter.apply(&sample())), vec![3]);
    assert!(filter.is_active());
  }

  #[test]
  fn test_date_range_is_inclusive() {
    let filter = TransactionFilter {
      date_from: NaiveDate::from_ymd_opt(2024, 3, 3),
      date_to: NaiveDate::from_ymd_opt(2024, 3, 5),
      sort_by: SortField::Date,
      order: SortOrder::Asc,
      ..Default::default()
    };
    assert_eq!(ids(&filter.apply(&sample())), vec![3, 2]);
  }

  #[test]
  fn test_undated_rows_fail_date_bounds() {
    let mut rows = sample();
    rows[0].date = None;
    let filter = TransactionFilter {
      date_from: NaiveDate::from_ymd_opt(2000, 1, 1),
      ..Default::default()
    };
    assert_eq!(ids(&filter.apply(&rows)), vec![2, 3]);
  }

  #[test]
  fn test_amount_sort_uses_absolute_value() {
    let filter = TransactionFilter {
      sort_by: SortField::Amount,
      order: SortOrder::Asc,
      ..Default::default()
    };
    assert_eq!(ids(&filter.apply(&sample())), vec![2, 3, 1]);
  }

  #[test]
  fn test_summary() {
    assert_eq!(TransactionFilter::default().summary(), "");
    let filter = TransactionFilter {
      kind: Some(TransactionType::Expense),
      date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
      sort_by: SortField::Amount,
      order: SortOrder::Asc,
      ..Default::default()
    };
    assert_eq!(filter.summary(), "expense, from 2024-03-01, amount asc");
  }

  #[test]
  fn test_unique_categories() {
    assert_eq!(
      unique_categories(&sample()),
      vec!["Gaji", "Makan", "Transport"]
    );
  }

  #[tokio::test]
  async fn test_transactions_cached_for_three_minutes() {
    let api = FakeApi::default();
    api.state.lock().unwrap().transactions = sample();
    let clock = ManualClock::new();
    let pages = PageLoader::new(
      api.clone(),
      ResponseCache::with_clock(clock.clone()),
      FreshnessPolicy::default(),
    );

    assert!(!pages.transactions(false).await.unwrap().is_cached());
    clock.advance(chrono::Duration::minutes(2));
    let hit = pages.transactions(false).await.unwrap();
    assert!(hit.is_cached());
    assert_eq!(hit.data.len(), 3);

    clock.advance(chrono::Duration::minutes(2));
    assert!(!pages.transactions(false).await.unwrap().is_cached());
    assert_eq!(FakeApi::count(&api.transactions_calls), 2);
  }

  #[tokio::test]
  async fn test_failed_fetch_leaves_nothing_in_flight() {
    let api = FakeApi::default();
    {
      let mut state = api.state.lock().unwrap();
      state.transactions = sample();
      state.fail_reads = 1;
    }
    let pages = PageLoader::new(api.clone(), ResponseCache::new(), FreshnessPolicy::default());

    assert!(pages.transactions(false).await.is_err());
    assert_eq!(pages.cache().in_flight(), 0);

    let loaded = pages.transactions(false).await.unwrap();
    assert_eq!(loaded.data.len(), 3);
    assert!(pages.transactions(false).await.unwrap().is_cached());
  }
}

use futures::future::try_join;

use super::PageLoader;
use crate::api::types::{Transaction, TransactionGroup, TransactionQuery, TransactionType};
use crate::api::{ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, Namespace};

impl<A: FinanceApi> PageLoader<A> {
  pub async fn groups(&self, force: bool) -> ApiResult<CacheResult<Vec<TransactionGroup>>> {
    self
      .fetch(CacheKey::new(Namespace::TransactionGroups), "data", force, || {
        let api = self.api.clone();
        async move { api.transaction_groups().await }
      })
      .await
  }

  /// A group and its transactions. Always fetched live.
  pub async fn group_detail(&self, id: u64) -> ApiResult<GroupDetail> {
    let (group, transactions) = try_join(
      self.api.transaction_group(id),
      self.api.transactions(TransactionQuery::in_group(id)),
    )
    .await?;
    Ok(GroupDetail {
      group,
      transactions,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDetail {
  pub group: TransactionGroup,
  pub transactions: Vec<Transaction>,
}

impl GroupDetail {
  pub fn total_income(&self) -> f64 {
    self.total(TransactionType::Income)
  }

  pub fn total_expense(&self) -> f64 {
    self.total(TransactionType::Expense)
  }

  pub fn balance(&self) -> f64 {
    self.total_income() - self.total_expense()
  }

  fn total(&self, kind: TransactionType) -> f64 {
    self
      .transactions
      .iter()
      .filter(|t| t.kind == kind)
      .map(|t| t.amount)
      .sum()
  }
}

/// Groups of one type, or all when `kind` is `None`.
pub fn groups_of_kind<'a>(
  groups: &'a [TransactionGroup],
  kind: Option<&str>,
) -> Vec<&'a TransactionGroup> {
  groups
    .iter()
    .filter(|g| kind.map_or(true, |k| g.kind.as_deref() == Some(k)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;
  use crate::cache::{FreshnessPolicy, ManualClock, ResponseCache};
  use crate::pages::fake::{tx, FakeApi};

  fn group(id: u64, name: &str, kind: &str) -> TransactionGroup {
    TransactionGroup {
      id,
      name: name.to_string(),
      description: None,
      kind: Some(kind.to_string()),
      color: None,
      transactions_count: None,
    }
  }

  fn loader(api: &FakeApi) -> PageLoader<FakeApi> {
    PageLoader::new(
      api.clone(),
      ResponseCache::with_clock(ManualClock::new()),
      FreshnessPolicy::default(),
    )
  }

  #[tokio::test]
  async fn test_groups_are_cached() {
    let api = FakeApi::default();
    api.state.lock().unwrap().groups = vec![group(1, "Arisan", "income")];
    let pages = loader(&api);

    pages.groups(false).await.unwrap();
    let hit = pages.groups(false).await.unwrap();

    assert!(hit.is_cached());
    assert_eq!(hit.data[0].name, "Arisan");
    assert_eq!(FakeApi::count(&api.groups_calls), 1);
  }

  #[tokio::test]
  async fn test_group_detail_is_never_cached() {
    let api = FakeApi::default();
    {
      let mut state = api.state.lock().unwrap();
      state.groups = vec![group(4, "Renovasi", "expense")];
      let mut paint = tx(1, TransactionType::Expense, 300.0, "2024-05-01", "Cat");
      paint.transaction_group_id = Some(4);
      let mut refund = tx(2, TransactionType::Income, 50.0, "2024-05-02", "");
      refund.transaction_group_id = Some(4);
      let other = tx(3, TransactionType::Income, 999.0, "2024-05-02", "");
      state.transactions = vec![paint, refund, other];
    }
    let pages = loader(&api);

    let detail = pages.group_detail(4).await.unwrap();
    pages.group_detail(4).await.unwrap();

    assert_eq!(detail.transactions.len(), 2);
    assert_eq!(detail.total_expense(), 300.0);
    assert_eq!(detail.balance(), -250.0);
    assert_eq!(FakeApi::count(&api.transactions_calls), 2);
  }

  #[tokio::test]
  async fn test_missing_group() {
    let pages = loader(&FakeApi::default());
    assert!(matches!(
      pages.group_detail(42).await.unwrap_err(),
      ApiError::NotFound
    ));
  }

  #[test]
  fn test_groups_of_kind() {
    let groups = vec![group(1, "A", "income"), group(2, "B", "expense")];
    assert_eq!(groups_of_kind(&groups, Some("expense"))[0].id, 2);
    assert_eq!(groups_of_kind(&groups, None).len(), 2);
  }
}

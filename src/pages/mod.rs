//! Page controllers: cache-first loaders for each screen.
//!
//! Every cached page follows the same flow. A fresh entry is served as is,
//! anything else goes to the network and the response is stored through a
//! fetch ticket so that a clear issued meanwhile wins over a late response.

mod dashboard;
mod groups;
mod payroll;
mod reports;
mod statistics;
mod transactions;

pub use dashboard::DashboardData;
pub use groups::{groups_of_kind, GroupDetail};
pub use payroll::Payroll;
pub use reports::{export_csv, ReportPage, REPORT_PAGE_SIZE};
pub use statistics::{CategoryTotal, DailySummary, MonthlySummary, Statistics};
pub use transactions::{unique_categories, SortField, SortOrder, TransactionFilter};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use tracing::debug;

use crate::api::{ApiError, ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, FreshnessPolicy, ResponseCache};

/// Loads page data through the response cache.
#[derive(Clone)]
pub struct PageLoader<A> {
  api: A,
  cache: ResponseCache,
  policy: FreshnessPolicy,
}

impl<A: FinanceApi> PageLoader<A> {
  pub fn new(api: A, cache: ResponseCache, policy: FreshnessPolicy) -> Self {
    Self { api, cache, policy }
  }

  pub fn api(&self) -> &A {
    &self.api
  }

  pub fn cache(&self) -> &ResponseCache {
    &self.cache
  }

  /// Cached value of `field` under `key` if the entry is still fresh.
  fn cached<T: DeserializeOwned>(&self, key: &CacheKey, field: &str) -> Option<CacheResult<T>> {
    let max_age = self.policy.max_age(key.namespace());
    if !self.cache.is_fresh(key, max_age) {
      return None;
    }
    let entry = self.cache.get(key)?;
    let data = entry.decode(field)?;
    Some(CacheResult::from_cache(data, entry.fetched_at))
  }

  /// Serve `field` under `key` from the cache, or fetch and store it.
  async fn fetch<T, F, Fut>(
    &self,
    key: CacheKey,
    field: &str,
    force: bool,
    fetcher: F,
  ) -> ApiResult<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
  {
    if !force {
      if let Some(hit) = self.cached(&key, field) {
        debug!(key = %key, "serving page from cache");
        return Ok(hit);
      }
    }

    let ticket = self.cache.begin_fetch(&key);
    let data = match fetcher().await {
      Ok(data) => data,
      Err(e) => {
        self.cache.cancel_fetch(ticket);
        return Err(e);
      }
    };

    let mut payload = Map::new();
    payload.insert(field.to_string(), to_value(&data)?);
    if !self.cache.complete_fetch(ticket, payload) {
      debug!(key = %key, "response not cached, key was cleared or refetched");
    }

    Ok(CacheResult::from_network(data))
  }
}

fn to_value<T: Serialize>(data: &T) -> ApiResult<Value> {
  serde_json::to_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

/// In-memory `FinanceApi` used by page and mutation tests.
#[cfg(test)]
pub(crate) mod fake {
  use super::*;
  use crate::api::types::{
    DashboardStats, GroupForm, HayabusaPayment, HayabusaStats, PaymentForm, PaymentStatus, Report,
    ReportParams, Transaction, TransactionForm, TransactionGroup, TransactionQuery,
    TransactionType, User,
  };
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  #[derive(Default)]
  pub struct FakeState {
    pub stats: DashboardStats,
    pub transactions: Vec<Transaction>,
    pub report: Report,
    pub groups: Vec<TransactionGroup>,
    pub payroll: HayabusaStats,
    pub payments: Vec<HayabusaPayment>,
    pub hayabusa_users: Vec<User>,
    pub payment_forms: Vec<PaymentForm>,
    pub status_changes: Vec<(u64, PaymentStatus)>,
    pub fail_writes: bool,
    /// Number of upcoming `transactions` reads that fail
    pub fail_reads: usize,
    pub queries: Vec<TransactionQuery>,
    pub reports: Vec<ReportParams>,
  }

  #[derive(Clone, Default)]
  pub struct FakeApi {
    pub state: Arc<Mutex<FakeState>>,
    pub statistics_calls: Arc<AtomicUsize>,
    pub transactions_calls: Arc<AtomicUsize>,
    pub report_calls: Arc<AtomicUsize>,
    pub groups_calls: Arc<AtomicUsize>,
    pub payroll_calls: Arc<AtomicUsize>,
    pub writes: Arc<AtomicUsize>,
  }

  pub fn tx(id: u64, kind: TransactionType, amount: f64, date: &str, category: &str) -> Transaction {
    Transaction {
      id,
      description: Some(format!("Transaksi {}", id)),
      kind,
      amount,
      date: Some(date.to_string()),
      category: None,
      expense_category: Some(category.to_string()).filter(|c| !c.is_empty()),
      transaction_group_id: None,
      user: None,
      notes: None,
      created_at: Some(format!("{} 10:00:00", date)),
    }
  }

  impl FakeApi {
    pub fn with_count(count: u64) -> Self {
      let api = Self::default();
      api.set_count(count);
      api
    }

    pub fn set_count(&self, count: u64) {
      self.state.lock().unwrap().stats.transaction_count = count;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
      counter.load(Ordering::SeqCst)
    }

    fn write(&self) -> ApiResult<()> {
      self.writes.fetch_add(1, Ordering::SeqCst);
      if self.state.lock().unwrap().fail_writes {
        Err(ApiError::Server { status: 500 })
      } else {
        Ok(())
      }
    }
  }

  impl FinanceApi for FakeApi {
    async fn statistics(&self) -> ApiResult<DashboardStats> {
      self.statistics_calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.state.lock().unwrap().stats.clone())
    }

    async fn transactions(&self, query: TransactionQuery) -> ApiResult<Vec<Transaction>> {
      self.transactions_calls.fetch_add(1, Ordering::SeqCst);
      let mut state = self.state.lock().unwrap();
      state.queries.push(query.clone());
      if state.fail_reads > 0 {
        state.fail_reads -= 1;
        return Err(ApiError::Server { status: 503 });
      }
      let mut list: Vec<Transaction> = state
        .transactions
        .iter()
        .filter(|t| {
          query
            .transaction_group_id
            .map_or(true, |g| t.transaction_group_id == Some(g))
        })
        .cloned()
        .collect();
      if let Some(limit) = query.limit {
        list.truncate(limit as usize);
      }
      Ok(list)
    }

    async fn report(&self, params: ReportParams) -> ApiResult<Report> {
      self.report_calls.fetch_add(1, Ordering::SeqCst);
      let mut state = self.state.lock().unwrap();
      state.reports.push(params);
      Ok(state.report.clone())
    }

    async fn transaction_groups(&self) -> ApiResult<Vec<TransactionGroup>> {
      self.groups_calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.state.lock().unwrap().groups.clone())
    }

    async fn transaction_group(&self, id: u64) -> ApiResult<TransactionGroup> {
      self
        .state
        .lock()
        .unwrap()
        .groups
        .iter()
        .find(|g| g.id == id)
        .cloned()
        .ok_or(ApiError::NotFound)
    }

    async fn create_transaction(&self, _form: TransactionForm) -> ApiResult<()> {
      self.write()
    }

    async fn update_transaction(&self, _id: u64, _form: TransactionForm) -> ApiResult<()> {
      self.write()
    }

    async fn delete_transaction(&self, _id: u64) -> ApiResult<()> {
      self.write()
    }

    async fn create_group(&self, _form: GroupForm) -> ApiResult<()> {
      self.write()
    }

    async fn update_group(&self, _id: u64, _form: GroupForm) -> ApiResult<()> {
      self.write()
    }

    async fn delete_group(&self, _id: u64) -> ApiResult<()> {
      self.write()
    }

    async fn hayabusa_statistics(&self) -> ApiResult<HayabusaStats> {
      self.payroll_calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.state.lock().unwrap().payroll.clone())
    }

    async fn hayabusa_payments(&self) -> ApiResult<Vec<HayabusaPayment>> {
      self.payroll_calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.state.lock().unwrap().payments.clone())
    }

    async fn hayabusa_users(&self) -> ApiResult<Vec<User>> {
      Ok(self.state.lock().unwrap().hayabusa_users.clone())
    }

    async fn create_hayabusa_payment(&self, form: PaymentForm) -> ApiResult<()> {
      self.write()?;
      self.state.lock().unwrap().payment_forms.push(form);
      Ok(())
    }

    async fn update_hayabusa_payment_status(&self, id: u64, status: PaymentStatus) -> ApiResult<()> {
      self.write()?;
      self.state.lock().unwrap().status_changes.push((id, status));
      Ok(())
    }
  }
}

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::debug;

use super::{to_value, PageLoader};
use crate::api::types::{DashboardStats, Transaction, TransactionQuery};
use crate::api::{ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, Namespace};

/// Recent transactions shown on the dashboard
const RECENT_LIMIT: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
  pub stats: DashboardStats,
  pub recent: Vec<Transaction>,
}

impl<A: FinanceApi> PageLoader<A> {
  /// Load the dashboard.
  ///
  /// Stats are always refetched on a miss; the recent list only when the
  /// record count moved, the load is forced, or no list is cached yet.
  pub async fn dashboard(&self, force: bool) -> ApiResult<CacheResult<DashboardData>> {
    let key = CacheKey::new(Namespace::Dashboard);

    if !force {
      let max_age = self.policy.max_age(Namespace::Dashboard);
      if self.cache.is_fresh(&key, max_age) {
        if let Some(entry) = self.cache.get(&key) {
          if let Some(stats) = entry.decode::<DashboardStats>("stats") {
            let recent = entry.decode("transactions").unwrap_or_default();
            return Ok(CacheResult::from_cache(
              DashboardData { stats, recent },
              entry.fetched_at,
            ));
          }
        }
      }
    }

    let ticket = self.cache.begin_fetch(&key);
    let stats = match self.api.statistics().await {
      Ok(stats) => stats,
      Err(e) => {
        self.cache.cancel_fetch(ticket);
        return Err(e);
      }
    };
    let count_changed = self.cache.invalidate_if_count_changed(stats.transaction_count);

    let cached_recent = self
      .cache
      .get(&key)
      .and_then(|entry| entry.decode::<Vec<Transaction>>("transactions"));

    let recent = match cached_recent {
      Some(recent) if !count_changed && !force => {
        debug!("record count unchanged, reusing cached recent transactions");
        recent
      }
      _ => match self
        .api
        .transactions(TransactionQuery::recent(RECENT_LIMIT))
        .await
      {
        Ok(recent) => recent,
        Err(e) => {
          // The cached list predates the new count
          if count_changed {
            self.cache.forget_record_count();
          }
          self.cache.cancel_fetch(ticket);
          return Err(e);
        }
      },
    };

    let mut payload = Map::new();
    payload.insert("stats".to_string(), to_value(&stats)?);
    payload.insert("transactions".to_string(), to_value(&recent)?);
    self.cache.complete_fetch(ticket, payload);

    Ok(CacheResult::from_network(DashboardData { stats, recent }))
  }
}

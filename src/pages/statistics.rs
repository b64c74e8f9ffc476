use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::PageLoader;
use crate::api::types::{Report, ReportParams, Transaction, TransactionType};
use crate::api::{ApiError, ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, Namespace};

const TOP_CATEGORIES: usize = 5;
const DAILY_WINDOW: i64 = 7;
const UNCATEGORIZED: &str = "Lainnya";

pub const MONTH_NAMES: [&str; 12] = [
  "Januari",
  "Februari",
  "Maret",
  "April",
  "Mei",
  "Juni",
  "Juli",
  "Agustus",
  "September",
  "Oktober",
  "November",
  "Desember",
];

const MONTH_ABBREVIATIONS: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
  pub name: String,
  pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
  /// Indonesian month name
  pub month: String,
  pub income: f64,
  pub expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
  pub date: NaiveDate,
  pub income: f64,
  pub expense: f64,
  pub count: u32,
}

impl DailySummary {
  /// Short label such as `7 Feb`.
  pub fn label(&self) -> String {
    format!(
      "{} {}",
      self.date.day(),
      MONTH_ABBREVIATIONS[self.date.month0() as usize]
    )
  }
}

/// Figures derived from a period report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
  pub total_income: f64,
  pub total_expense: f64,
  pub net_income: f64,
  pub transaction_count: usize,
  pub top_categories: Vec<CategoryTotal>,
  pub monthly_trend: Vec<MonthlySummary>,
  pub daily: Vec<DailySummary>,
}

impl Statistics {
  /// Derive statistics from `report`, with the daily window ending at `today`.
  pub fn from_report(report: &Report, today: NaiveDate) -> Self {
    Self {
      total_income: report.income,
      total_expense: report.expenses,
      net_income: report.income - report.expenses,
      transaction_count: report.transactions.len(),
      top_categories: top_categories(&report.transactions),
      monthly_trend: monthly_trend(&report.transactions),
      daily: daily_summaries(&report.transactions, today),
    }
  }
}

impl<A: FinanceApi> PageLoader<A> {
  /// Load statistics for one period. The processed figures are what gets cached.
  pub async fn statistics(
    &self,
    params: ReportParams,
    force: bool,
  ) -> ApiResult<CacheResult<Statistics>> {
    let key = CacheKey::with_params(Namespace::Statistics, &params.cache_params());
    self
      .fetch(key, "data", force, || {
        let api = self.api.clone();
        async move {
          let report = api.report(params).await?;
          Ok::<_, ApiError>(Statistics::from_report(
            &report,
            Local::now().date_naive(),
          ))
        }
      })
      .await
  }
}

/// Largest expense categories by absolute amount.
fn top_categories(transactions: &[Transaction]) -> Vec<CategoryTotal> {
  let mut totals: HashMap<&str, f64> = HashMap::new();
  for tx in transactions.iter().filter(|t| t.kind == TransactionType::Expense) {
    let name = tx
      .expense_category
      .as_deref()
      .filter(|c| !c.is_empty())
      .unwrap_or(UNCATEGORIZED);
    *totals.entry(name).or_default() += tx.amount.abs();
  }

  let mut ranked: Vec<CategoryTotal> = totals
    .into_iter()
    .map(|(name, amount)| CategoryTotal {
      name: name.to_string(),
      amount,
    })
    .collect();
  ranked.sort_by(|a, b| {
    b.amount
      .total_cmp(&a.amount)
      .then_with(|| a.name.cmp(&b.name))
  });
  ranked.truncate(TOP_CATEGORIES);
  ranked
}

/// Income and expense per creation month, in calendar order.
fn monthly_trend(transactions: &[Transaction]) -> Vec<MonthlySummary> {
  let mut months: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
  for tx in transactions {
    let Some(created) = tx.created_date() else {
      continue;
    };
    let slot = months.entry(created.month0()).or_default();
    match tx.kind {
      TransactionType::Income => slot.0 += tx.amount,
      TransactionType::Expense => slot.1 += tx.amount.abs(),
    }
  }

  months
    .into_iter()
    .map(|(month0, (income, expense))| MonthlySummary {
      month: MONTH_NAMES[month0 as usize].to_string(),
      income,
      expense,
    })
    .collect()
}

/// One summary per day for the week ending at `today`, oldest first.
fn daily_summaries(transactions: &[Transaction], today: NaiveDate) -> Vec<DailySummary> {
  let mut days: Vec<DailySummary> = (0..DAILY_WINDOW)
    .rev()
    .map(|offset| DailySummary {
      date: today - Duration::days(offset),
      income: 0.0,
      expense: 0.0,
      count: 0,
    })
    .collect();

  for tx in transactions {
    let Some(created) = tx.created_date() else {
      continue;
    };
    if let Some(day) = days.iter_mut().find(|d| d.date == created) {
      day.count += 1;
      match tx.kind {
        TransactionType::Income => day.income += tx.amount,
        TransactionType::Expense => day.expense += tx.amount.abs(),
      }
    }
  }
  days
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{FreshnessPolicy, ManualClock, ResponseCache};
  use crate::pages::fake::{tx, FakeApi};

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_top_categories_ranked_and_capped() {
    let mut rows = vec![
      tx(1, TransactionType::Expense, -50.0, "2024-01-02", "Makan"),
      tx(2, TransactionType::Expense, 70.0, "2024-01-03", "Makan"),
      tx(3, TransactionType::Expense, 30.0, "2024-01-03", ""),
      tx(4, TransactionType::Income, 999.0, "2024-01-03", "Gaji"),
    ];
    for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
      rows.push(tx(10 + i as u64, TransactionType::Expense, 10.0 + i as f64, "2024-01-04", name));
    }

    let top = top_categories(&rows);
    assert_eq!(top.len(), 5);
    assert_eq!(top[0].name, "Makan");
    assert_eq!(top[0].amount, 120.0);
    assert_eq!(top[1].name, UNCATEGORIZED);
    assert!(top.iter().all(|c| c.name != "Gaji"));
    assert!(top.iter().all(|c| c.name != "A"));
  }

  #[test]
  fn test_monthly_trend_in_calendar_order() {
    let rows = vec![
      tx(1, TransactionType::Income, 100.0, "2024-03-10", ""),
      tx(2, TransactionType::Expense, -40.0, "2024-01-10", ""),
      tx(3, TransactionType::Income, 60.0, "2024-03-11", ""),
    ];
    let trend = monthly_trend(&rows);
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].month, "Januari");
    assert_eq!(trend[0].expense, 40.0);
    assert_eq!(trend[1].month, "Maret");
    assert_eq!(trend[1].income, 160.0);
  }

  #[test]
  fn test_daily_window() {
    let rows = vec![
      tx(1, TransactionType::Income, 100.0, "2024-02-07", ""),
      tx(2, TransactionType::Expense, 25.0, "2024-02-07", ""),
      tx(3, TransactionType::Income, 5.0, "2024-01-20", ""),
    ];
    let daily = daily_summaries(&rows, day(2024, 2, 7));

    assert_eq!(daily.len(), 7);
    assert_eq!(daily[0].date, day(2024, 2, 1));
    let last = daily.last().unwrap();
    assert_eq!(last.count, 2);
    assert_eq!((last.income, last.expense), (100.0, 25.0));
    assert_eq!(last.label(), "7 Feb");
    assert_eq!(daily.iter().map(|d| d.count).sum::<u32>(), 2);
  }

  #[test]
  fn test_from_report_totals() {
    let report = Report {
      income: 500.0,
      expenses: 200.0,
      transactions: vec![tx(1, TransactionType::Income, 500.0, "2024-02-01", "")],
    };
    let stats = Statistics::from_report(&report, day(2024, 2, 7));
    assert_eq!(stats.net_income, 300.0);
    assert_eq!(stats.transaction_count, 1);
  }

  #[tokio::test]
  async fn test_statistics_cache_processed_figures() {
    let api = FakeApi::default();
    api.state.lock().unwrap().report = Report {
      income: 10.0,
      expenses: 4.0,
      transactions: vec![],
    };
    let pages = PageLoader::new(
      api.clone(),
      ResponseCache::with_clock(ManualClock::new()),
      FreshnessPolicy::default(),
    );
    let period = ReportParams::monthly(2024, 2);

    pages.statistics(period, false).await.unwrap();
    let hit = pages.statistics(period, false).await.unwrap();

    assert!(hit.is_cached());
    assert_eq!(hit.data.net_income, 6.0);
    assert_eq!(FakeApi::count(&api.report_calls), 1);
    assert_eq!(api.state.lock().unwrap().reports[0], period);
  }
}

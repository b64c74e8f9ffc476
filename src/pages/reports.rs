use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};

use super::PageLoader;
use crate::api::types::{Report, ReportParams, ReportType, Transaction, TransactionType};
use crate::api::{ApiResult, FinanceApi};
use crate::cache::{CacheKey, CacheResult, Namespace};

/// Rows per report page
pub const REPORT_PAGE_SIZE: usize = 20;

impl<A: FinanceApi> PageLoader<A> {
  /// Load the report for one period. Each period is cached separately.
  pub async fn report(&self, params: ReportParams, force: bool) -> ApiResult<CacheResult<Report>> {
    let key = CacheKey::with_params(Namespace::Reports, &params.cache_params());
    self
      .fetch(key, "data", force, || {
        let api = self.api.clone();
        async move { api.report(params).await }
      })
      .await
  }
}

/// One page of report rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportPage<'a> {
  pub rows: &'a [Transaction],
  /// 1-based
  pub page: usize,
  pub total_pages: usize,
  /// 1-based index of the first row, 0 when empty
  pub first: usize,
  pub last: usize,
  pub total: usize,
}

impl<'a> ReportPage<'a> {
  /// Slice `rows` to `page`, clamped to the valid range.
  pub fn of(rows: &'a [Transaction], page: usize) -> Self {
    let total = rows.len();
    let total_pages = total.div_ceil(REPORT_PAGE_SIZE);
    let page = page.clamp(1, total_pages.max(1));
    let start = ((page - 1) * REPORT_PAGE_SIZE).min(total);
    let end = (start + REPORT_PAGE_SIZE).min(total);

    Self {
      rows: &rows[start..end],
      page,
      total_pages,
      first: if total == 0 { 0 } else { start + 1 },
      last: end,
      total,
    }
  }
}

/// Report rows as CSV, headers included.
pub fn report_csv(report: &Report) -> String {
  let mut lines = vec!["Tanggal,Deskripsi,Kategori,User,Tipe,Jumlah".to_string()];
  for tx in &report.transactions {
    let date = tx
      .booking_date()
      .map(|d| d.format("%-d/%-m/%Y").to_string())
      .unwrap_or_default();
    let kind = match tx.kind {
      TransactionType::Income => "Pemasukan",
      TransactionType::Expense => "Pengeluaran",
    };
    lines.push(format!(
      "{},{},{},{},{},{}",
      date,
      quote(tx.description()),
      quote(tx.display_category()),
      quote(tx.user_name().unwrap_or("-")),
      kind,
      tx.amount
    ));
  }
  lines.join("\n")
}

fn quote(field: &str) -> String {
  format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn csv_file_name(params: &ReportParams) -> String {
  match params.report_type {
    ReportType::Monthly => format!(
      "laporan_keuangan_monthly_{}_{}.csv",
      params.year, params.month
    ),
    ReportType::Yearly => format!("laporan_keuangan_yearly_{}.csv", params.year),
  }
}

/// Write the report CSV into `dir` and return the file path.
pub fn export_csv(report: &Report, params: &ReportParams, dir: &Path) -> Result<PathBuf> {
  if report.transactions.is_empty() {
    return Err(eyre!("No report rows to export"));
  }
  let path = dir.join(csv_file_name(params));
  std::fs::write(&path, report_csv(report))
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
  Ok(path)
}

//! REST API access for Vertinova Finance.

pub mod client;
pub mod error;
pub mod types;

use std::future::Future;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
use types::{
  DashboardStats, GroupForm, HayabusaPayment, HayabusaStats, PaymentForm, PaymentStatus, Report,
  ReportParams, Transaction, TransactionForm, TransactionGroup, TransactionQuery, User,
};

/// The calls page controllers and mutation handlers make against the backend.
pub trait FinanceApi: Clone + Send + Sync + 'static {
  /// Dashboard totals, including the overall transaction count
  fn statistics(&self) -> impl Future<Output = ApiResult<DashboardStats>> + Send;

  fn transactions(
    &self,
    query: TransactionQuery,
  ) -> impl Future<Output = ApiResult<Vec<Transaction>>> + Send;

  fn report(&self, params: ReportParams) -> impl Future<Output = ApiResult<Report>> + Send;

  fn transaction_groups(&self) -> impl Future<Output = ApiResult<Vec<TransactionGroup>>> + Send;

  fn transaction_group(&self, id: u64) -> impl Future<Output = ApiResult<TransactionGroup>> + Send;

  fn create_transaction(&self, form: TransactionForm)
    -> impl Future<Output = ApiResult<()>> + Send;

  fn update_transaction(
    &self,
    id: u64,
    form: TransactionForm,
  ) -> impl Future<Output = ApiResult<()>> + Send;

  fn delete_transaction(&self, id: u64) -> impl Future<Output = ApiResult<()>> + Send;

  fn create_group(&self, form: GroupForm) -> impl Future<Output = ApiResult<()>> + Send;

  fn update_group(&self, id: u64, form: GroupForm) -> impl Future<Output = ApiResult<()>> + Send;

  fn delete_group(&self, id: u64) -> impl Future<Output = ApiResult<()>> + Send;

  /// Payroll totals for the logged-in Hayabusa account
  fn hayabusa_statistics(&self) -> impl Future<Output = ApiResult<HayabusaStats>> + Send;

  fn hayabusa_payments(&self) -> impl Future<Output = ApiResult<Vec<HayabusaPayment>>> + Send;

  /// Accounts with the `hayabusa` role that payments can be made out to
  fn hayabusa_users(&self) -> impl Future<Output = ApiResult<Vec<User>>> + Send;

  fn create_hayabusa_payment(&self, form: PaymentForm)
    -> impl Future<Output = ApiResult<()>> + Send;

  fn update_hayabusa_payment_status(
    &self,
    id: u64,
    status: PaymentStatus,
  ) -> impl Future<Output = ApiResult<()>> + Send;
}

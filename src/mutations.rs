//! Write operations and the cache invalidation that follows them.

use tracing::info;

use crate::api::types::{GroupForm, PaymentForm, PaymentStatus, TransactionForm};
use crate::api::{ApiResult, FinanceApi};
use crate::cache::Namespace;
use crate::pages::PageLoader;

impl<A: FinanceApi> PageLoader<A> {
  pub async fn create_transaction(&self, form: TransactionForm) -> ApiResult<()> {
    self.api().create_transaction(form).await?;
    self.transactions_changed("created");
    Ok(())
  }

  pub async fn update_transaction(&self, id: u64, form: TransactionForm) -> ApiResult<()> {
    self.api().update_transaction(id, form).await?;
    self.transactions_changed("updated");
    Ok(())
  }

  pub async fn delete_transaction(&self, id: u64) -> ApiResult<()> {
    self.api().delete_transaction(id).await?;
    self.transactions_changed("deleted");
    Ok(())
  }

  pub async fn create_group(&self, form: GroupForm) -> ApiResult<()> {
    self.api().create_group(form).await?;
    self.groups_changed("created");
    Ok(())
  }

  pub async fn update_group(&self, id: u64, form: GroupForm) -> ApiResult<()> {
    self.api().update_group(id, form).await?;
    self.groups_changed("updated");
    Ok(())
  }

  pub async fn delete_group(&self, id: u64) -> ApiResult<()> {
    self.api().delete_group(id).await?;
    self.groups_changed("deleted");
    Ok(())
  }

  pub async fn create_payment(&self, form: PaymentForm) -> ApiResult<()> {
    self.api().create_hayabusa_payment(form).await?;
    self.payroll_changed("created");
    Ok(())
  }

  pub async fn update_payment_status(&self, id: u64, status: PaymentStatus) -> ApiResult<()> {
    self.api().update_hayabusa_payment_status(id, status).await?;
    self.payroll_changed("status updated");
    Ok(())
  }

  fn transactions_changed(&self, action: &str) {
    let cleared = self.cache().invalidate(Namespace::Transactions);
    info!(action, ?cleared, "transaction written");
  }

  fn groups_changed(&self, action: &str) {
    let cleared = self.cache().invalidate(Namespace::TransactionGroups);
    info!(action, ?cleared, "transaction group written");
  }

  /// Payments are booked into the payroll group's transactions.
  fn payroll_changed(&self, action: &str) {
    let mut cleared = self.cache().invalidate(Namespace::Transactions);
    cleared.extend(self.cache().invalidate(Namespace::TransactionGroups));
    info!(action, ?cleared, "payroll payment written");
  }
}

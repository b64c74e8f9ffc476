use chrono::NaiveDate;
use futures::future::try_join;
use std::collections::BTreeMap;

use super::PageLoader;
use crate::api::types::{HayabusaPayment, HayabusaStats, PaymentForm, TransactionGroup};
use crate::api::{ApiError, ApiResult, FinanceApi};

/// The Hayabusa payroll screen: totals plus every payment, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payroll {
  pub stats: HayabusaStats,
  pub payments: Vec<HayabusaPayment>,
}

impl Payroll {
  /// Most recent payment, preferring the server's own pick.
  pub fn latest(&self) -> Option<&HayabusaPayment> {
    self
      .stats
      .recent_payments
      .first()
      .or_else(|| self.payments.first())
  }

  pub fn average_payment(&self) -> f64 {
    self.stats.total_income / self.payments.len().max(1) as f64
  }
}

impl<A: FinanceApi> PageLoader<A> {
  /// Load the payroll screen. Always fetched live.
  pub async fn payroll(&self) -> ApiResult<Payroll> {
    let (stats, payments) =
      try_join(self.api.hayabusa_statistics(), self.api.hayabusa_payments()).await?;
    Ok(Payroll { stats, payments })
  }

  /// Build a pending payment for `user_id`, booked under the payroll group.
  ///
  /// Checks the user against the Hayabusa accounts and picks the group from the
  /// (cached) group list.
  pub async fn prepare_payment(
    &self,
    user_id: u64,
    amount: f64,
    period: &str,
    date: NaiveDate,
  ) -> ApiResult<PaymentForm> {
    if amount <= 0.0 {
      return Err(invalid("amount", "Amount must be greater than 0"));
    }
    if period.trim().is_empty() {
      return Err(invalid("period", "Period is required"));
    }

    let (users, groups) = try_join(self.api.hayabusa_users(), self.groups(false)).await?;
    if !users.iter().any(|u| u.id == user_id) {
      return Err(invalid(
        "hayabusa_user_id",
        &format!("No Hayabusa account with id {}", user_id),
      ));
    }
    let group = payroll_group(&groups.data).ok_or_else(|| {
      invalid(
        "transaction_group_id",
        "No Simpaskor transaction group to book the payment under",
      )
    })?;

    Ok(PaymentForm::new(user_id, group.id, amount, period.trim(), date))
  }
}

/// The group payroll payments are booked under.
pub fn payroll_group(groups: &[TransactionGroup]) -> Option<&TransactionGroup> {
  groups
    .iter()
    .find(|g| g.name.to_lowercase().contains("simpaskor"))
}

fn invalid(field: &str, message: &str) -> ApiError {
  ApiError::Validation {
    message: message.to_string(),
    errors: BTreeMap::from([(field.to_string(), vec![message.to_string()])]),
  }
}

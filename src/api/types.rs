//! Wire types for the Vertinova Finance REST API.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Standard `{ success, data, message }` response wrapper
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  #[serde(default = "default_true")]
  pub success: bool,
  pub data: Option<T>,
  pub message: Option<String>,
}

fn default_true() -> bool {
  true
}

/// Body of a 422 response
#[derive(Debug, Default, Deserialize)]
pub struct ValidationBody {
  pub message: Option<String>,
  #[serde(default)]
  pub errors: BTreeMap<String, Vec<String>>,
}

/// Body of any other error response
#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
  pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub name: String,
  pub email: String,
  pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
  pub user: User,
  pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
  Income,
  Expense,
}

impl TransactionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransactionType::Income => "income",
      TransactionType::Expense => "expense",
    }
  }
}

impl std::str::FromStr for TransactionType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "income" | "in" => Ok(TransactionType::Income),
      "expense" | "out" => Ok(TransactionType::Expense),
      other => Err(format!("unknown transaction type: {}", other)),
    }
  }
}

/// Who recorded a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
  pub id: Option<u64>,
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  pub id: u64,
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind: TransactionType,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub amount: f64,
  /// Booking date, `YYYY-MM-DD` (sometimes with a time part)
  pub date: Option<String>,
  pub category: Option<String>,
  pub expense_category: Option<String>,
  pub transaction_group_id: Option<u64>,
  pub user: Option<UserRef>,
  pub notes: Option<String>,
  /// `YYYY-MM-DD HH:MM:SS`
  pub created_at: Option<String>,
}

impl Transaction {
  /// Booking date parsed from its first ten characters.
  pub fn booking_date(&self) -> Option<NaiveDate> {
    self.date.as_deref().and_then(parse_date_prefix)
  }

  /// Creation date parsed from its first ten characters.
  pub fn created_date(&self) -> Option<NaiveDate> {
    self.created_at.as_deref().and_then(parse_date_prefix)
  }

  pub fn description(&self) -> &str {
    self.description.as_deref().unwrap_or("")
  }

  pub fn user_name(&self) -> Option<&str> {
    self.user.as_ref().and_then(|u| u.name.as_deref())
  }

  /// Category shown in lists: expense category first, then the plain one.
  pub fn display_category(&self) -> &str {
    self
      .expense_category
      .as_deref()
      .or(self.category.as_deref())
      .unwrap_or("-")
  }
}

fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
  let prefix = s.get(..10)?;
  NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Totals shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
  #[serde(deserialize_with = "lenient_f64")]
  pub total_income: f64,
  #[serde(deserialize_with = "lenient_f64")]
  pub total_expense: f64,
  #[serde(deserialize_with = "lenient_f64")]
  pub balance: f64,
  pub transaction_count: u64,
}

/// Period report as returned by `/transactions/reports`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
  #[serde(deserialize_with = "lenient_f64")]
  pub income: f64,
  #[serde(deserialize_with = "lenient_f64")]
  pub expenses: f64,
  pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
  Monthly,
  Yearly,
}

impl ReportType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReportType::Monthly => "monthly",
      ReportType::Yearly => "yearly",
    }
  }
}

/// Period selection for reports and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportParams {
  pub report_type: ReportType,
  pub year: i32,
  /// 1-12; only sent to the API for monthly reports
  pub month: u32,
}

impl ReportParams {
  pub fn monthly(year: i32, month: u32) -> Self {
    Self {
      report_type: ReportType::Monthly,
      year,
      month,
    }
  }

  pub fn yearly(year: i32) -> Self {
    Self {
      report_type: ReportType::Yearly,
      year,
      month: 1,
    }
  }

  /// Parameters identifying this period in the response cache.
  pub fn cache_params(&self) -> Value {
    json!({
      "type": self.report_type.as_str(),
      "year": self.year,
      "month": self.month,
    })
  }

  /// Query string pairs for the API.
  pub fn query(&self) -> Vec<(&'static str, String)> {
    let mut query = vec![
      ("type", self.report_type.as_str().to_string()),
      ("year", self.year.to_string()),
    ];
    if self.report_type == ReportType::Monthly {
      query.push(("month", self.month.to_string()));
    }
    query
  }
}

impl fmt::Display for ReportParams {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.report_type {
      ReportType::Monthly => write!(f, "{:04}-{:02}", self.year, self.month),
      ReportType::Yearly => write!(f, "{:04}", self.year),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionGroup {
  pub id: u64,
  pub name: String,
  pub description: Option<String>,
  /// "income", "expense" or "both"
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub color: Option<String>,
  pub transactions_count: Option<u64>,
}

/// Filters for `GET /transactions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transaction_group_id: Option<u64>,
}

impl TransactionQuery {
  pub fn recent(limit: u32) -> Self {
    Self {
      limit: Some(limit),
      ..Default::default()
    }
  }

  pub fn in_group(group_id: u64) -> Self {
    Self {
      transaction_group_id: Some(group_id),
      ..Default::default()
    }
  }
}

/// Body for creating or updating a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionForm {
  pub description: String,
  #[serde(rename = "type")]
  pub kind: TransactionType,
  pub amount: f64,
  pub date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transaction_group_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expense_category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl TransactionForm {
  pub fn new(kind: TransactionType, amount: f64, description: &str, date: NaiveDate) -> Self {
    Self {
      description: description.to_string(),
      kind,
      amount,
      date: date.format("%Y-%m-%d").to_string(),
      category: None,
      transaction_group_id: None,
      expense_category: None,
      notes: None,
    }
  }

  /// Form prefilled from an existing transaction, for edits.
  pub fn from_transaction(tx: &Transaction) -> Self {
    Self {
      description: tx.description().to_string(),
      kind: tx.kind,
      amount: tx.amount,
      date: tx
        .date
        .as_deref()
        .and_then(|d| d.get(..10))
        .unwrap_or_default()
        .to_string(),
      category: tx.category.clone(),
      transaction_group_id: tx.transaction_group_id,
      expense_category: tx.expense_category.clone(),
      notes: tx.notes.clone(),
    }
  }
}

/// Body for creating or updating a transaction group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupForm {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind: String,
  pub color: String,
}

impl GroupForm {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      description: None,
      kind: "income".to_string(),
      color: "#3B82F6".to_string(),
    }
  }
}

/// Lifecycle of a Hayabusa payroll payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Cancelled,
  /// Any status this client does not know, kept as sent
  #[serde(untagged)]
  Other(String),
}

impl PaymentStatus {
  pub fn as_str(&self) -> &str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Paid => "paid",
      PaymentStatus::Cancelled => "cancelled",
      PaymentStatus::Other(s) => s,
    }
  }
}

impl std::str::FromStr for PaymentStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "pending" => Ok(PaymentStatus::Pending),
      "paid" => Ok(PaymentStatus::Paid),
      "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
      other => Err(format!("unknown payment status: {}", other)),
    }
  }
}

/// Group a payment was booked under
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
  pub id: Option<u64>,
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HayabusaPayment {
  pub id: u64,
  pub hayabusa_user_id: Option<u64>,
  pub transaction_group: Option<GroupRef>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub amount: f64,
  /// `YYYY-MM-DD`, sometimes with a time part
  pub payment_date: Option<String>,
  /// Free-form pay period, e.g. "Maret 2024"
  pub period: Option<String>,
  pub description: Option<String>,
  pub status: PaymentStatus,
}

impl HayabusaPayment {
  pub fn paid_on(&self) -> Option<NaiveDate> {
    self.payment_date.as_deref().and_then(parse_date_prefix)
  }

  /// Group name, falling back to the payroll group everyone books under.
  pub fn group_name(&self) -> &str {
    self
      .transaction_group
      .as_ref()
      .and_then(|g| g.name.as_deref())
      .unwrap_or("Simpaskor")
  }

  pub fn period(&self) -> &str {
    self.period.as_deref().unwrap_or("-")
  }
}

/// Payroll totals for the logged-in Hayabusa account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HayabusaStats {
  #[serde(deserialize_with = "lenient_f64")]
  pub total_income: f64,
  pub pending_payments: u64,
  pub recent_payments: Vec<HayabusaPayment>,
}

/// Body for `POST /hayabusa/payments`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentForm {
  pub hayabusa_user_id: u64,
  pub transaction_group_id: u64,
  pub amount: f64,
  pub payment_date: String,
  pub period: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub status: PaymentStatus,
}

impl PaymentForm {
  /// A pending payment dated `date`.
  pub fn new(user_id: u64, group_id: u64, amount: f64, period: &str, date: NaiveDate) -> Self {
    Self {
      hayabusa_user_id: user_id,
      transaction_group_id: group_id,
      amount,
      payment_date: date.format("%Y-%m-%d").to_string(),
      period: period.to_string(),
      description: None,
      status: PaymentStatus::Pending,
    }
  }
}

/// Accept numbers, numeric strings and null; anything unparseable becomes 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  let value: Option<Value> = Option::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
    _ => 0.0,
  })
}

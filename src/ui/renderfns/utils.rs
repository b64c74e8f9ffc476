use ratatui::prelude::Color;

use crate::api::types::TransactionType;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a transaction type
pub fn kind_color(kind: TransactionType) -> Color {
  match kind {
    TransactionType::Income => Color::Green,
    TransactionType::Expense => Color::Red,
  }
}

/// Display color for a signed total
pub fn balance_color(amount: f64) -> Color {
  if amount < 0.0 {
    Color::Red
  } else {
    Color::Green
  }
}

//! Available commands, autocomplete and argument parsing

use chrono::NaiveDate;

use crate::api::types::{PaymentStatus, TransactionType};
use crate::format::parse_amount;
use crate::pages::{SortField, SortOrder};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Argument hint shown in the overlay, if the command takes any
  pub usage: Option<&'static str>,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home"],
    description: "Balance and latest activity",
    usage: None,
  },
  Command {
    name: "transactions",
    aliases: &["t", "tx"],
    description: "Browse all transactions",
    usage: None,
  },
  Command {
    name: "reports",
    aliases: &["r", "report"],
    description: "Period report",
    usage: None,
  },
  Command {
    name: "statistics",
    aliases: &["s", "stats"],
    description: "Categories and trends for the period",
    usage: None,
  },
  Command {
    name: "groups",
    aliases: &["g", "group-list"],
    description: "Transaction groups",
    usage: None,
  },
  Command {
    name: "payroll",
    aliases: &["payments", "hayabusa"],
    description: "Hayabusa payroll payments",
    usage: None,
  },
  Command {
    name: "refresh",
    aliases: &["reload"],
    description: "Reload the current view from the server",
    usage: None,
  },
  Command {
    name: "add",
    aliases: &["new"],
    description: "Record a transaction",
    usage: Some("<income|expense> <amount> <description>"),
  },
  Command {
    name: "amount",
    aliases: &["edit"],
    description: "Change the selected transaction's amount",
    usage: Some("<amount>"),
  },
  Command {
    name: "group",
    aliases: &["newgroup"],
    description: "Create a transaction group",
    usage: Some("<name>"),
  },
  Command {
    name: "pay",
    aliases: &["payment"],
    description: "Record a pending Hayabusa payment",
    usage: Some("<user-id> <amount> <period>"),
  },
  Command {
    name: "mark",
    aliases: &["status"],
    description: "Set the selected payment's status",
    usage: Some("<paid|pending|cancelled>"),
  },
  Command {
    name: "filter",
    aliases: &["f"],
    description: "Narrow transaction lists",
    usage: Some("<income|expense|all|category [name]|from <date>|to <date>|clear>"),
  },
  Command {
    name: "sort",
    aliases: &["order"],
    description: "Order transaction lists",
    usage: Some("<date|amount|description|type> [asc|desc]"),
  },
  Command {
    name: "period",
    aliases: &["p"],
    description: "Period for reports and statistics",
    usage: Some("<yyyy> [mm]"),
  },
  Command {
    name: "export",
    aliases: &["csv"],
    description: "Export the current report as CSV",
    usage: None,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit vertinova",
    usage: None,
  },
];

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  Dashboard,
  Transactions,
  Reports,
  Statistics,
  Groups,
  Payroll,
  Refresh,
  Add {
    kind: TransactionType,
    amount: f64,
    description: String,
  },
  Amount(f64),
  Group(String),
  Pay {
    user_id: u64,
    amount: f64,
    period: String,
  },
  Mark(PaymentStatus),
  Period {
    year: i32,
    month: Option<u32>,
  },
  Filter(FilterChange),
  Sort {
    field: SortField,
    order: SortOrder,
  },
  Export,
  Quit,
}

/// One change to the transaction list filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
  /// `None` shows both types
  Kind(Option<TransactionType>),
  /// `None` drops the category filter
  Category(Option<String>),
  From(NaiveDate),
  To(NaiveDate),
  Clear,
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  // Suggestions only cover the command word
  let input_lower = input.trim_start().to_lowercase();
  if input_lower.contains(char::is_whitespace) {
    return Vec::new();
  }

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn lookup(word: &str) -> Option<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == word || cmd.aliases.contains(&word.as_str()))
}

/// Parse a full command line such as `add expense 25.000 Makan siang`.
pub fn parse(input: &str) -> Result<Action, String> {
  let input = input.trim();
  let (word, rest) = match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  };
  let cmd = lookup(word).ok_or_else(|| format!("Unknown command: {}", word))?;

  let no_args = |action: Action| {
    if rest.is_empty() {
      Ok(action)
    } else {
      Err(format!("{} takes no arguments", cmd.name))
    }
  };

  match cmd.name {
    "dashboard" => no_args(Action::Dashboard),
    "transactions" => no_args(Action::Transactions),
    "reports" => no_args(Action::Reports),
    "statistics" => no_args(Action::Statistics),
    "groups" => no_args(Action::Groups),
    "payroll" => no_args(Action::Payroll),
    "refresh" => no_args(Action::Refresh),
    "export" => no_args(Action::Export),
    "quit" => no_args(Action::Quit),
    "add" => parse_add(rest),
    "amount" => {
      let amount = parse_positive_amount(rest)?;
      Ok(Action::Amount(amount))
    }
    "group" => {
      if rest.is_empty() {
        Err("Usage: group <name>".to_string())
      } else {
        Ok(Action::Group(rest.to_string()))
      }
    }
    "pay" => parse_pay(rest),
    "mark" => rest
      .parse::<PaymentStatus>()
      .map(Action::Mark)
      .map_err(|_| "Usage: mark <paid|pending|cancelled>".to_string()),
    "period" => parse_period(rest),
    "filter" => parse_filter(rest).map(Action::Filter),
    "sort" => parse_sort(rest),
    other => Err(format!("Unknown command: {}", other)),
  }
}

fn parse_add(args: &str) -> Result<Action, String> {
  const USAGE: &str = "Usage: add <income|expense> <amount> <description>";

  let mut parts = args.splitn(3, char::is_whitespace);
  let kind = parts
    .next()
    .filter(|s| !s.is_empty())
    .ok_or(USAGE)?
    .parse::<TransactionType>()?;
  let amount = parse_positive_amount(parts.next().ok_or(USAGE)?)?;
  let description = parts.next().map(str::trim).unwrap_or_default();
  if description.is_empty() {
    return Err(USAGE.to_string());
  }

  Ok(Action::Add {
    kind,
    amount,
    description: description.to_string(),
  })
}

fn parse_pay(args: &str) -> Result<Action, String> {
  const USAGE: &str = "Usage: pay <user-id> <amount> <period>";

  let mut parts = args.splitn(3, char::is_whitespace);
  let user_id = parts
    .next()
    .and_then(|id| id.parse::<u64>().ok())
    .ok_or(USAGE)?;
  let amount = parse_positive_amount(parts.next().ok_or(USAGE)?)?;
  let period = parts.next().map(str::trim).unwrap_or_default();
  if period.is_empty() {
    return Err(USAGE.to_string());
  }

  Ok(Action::Pay {
    user_id,
    amount,
    period: period.to_string(),
  })
}

fn parse_positive_amount(input: &str) -> Result<f64, String> {
  match parse_amount(input) {
    Some(amount) if amount > 0.0 => Ok(amount),
    Some(_) => Err("Amount must be greater than zero".to_string()),
    None => Err(format!("Invalid amount: '{}'", input)),
  }
}

fn parse_period(args: &str) -> Result<Action, String> {
  const USAGE: &str = "Usage: period <yyyy> [mm]";

  let mut parts = args.split_whitespace();
  let year = parts
    .next()
    .and_then(|y| y.parse::<i32>().ok())
    .filter(|y| (1970..=9999).contains(y))
    .ok_or(USAGE)?;
  let month = match parts.next() {
    Some(m) => Some(
      m.parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or("Month must be between 1 and 12")?,
    ),
    None => None,
  };
  if parts.next().is_some() {
    return Err(USAGE.to_string());
  }

  Ok(Action::Period { year, month })
}

fn parse_filter(args: &str) -> Result<FilterChange, String> {
  const USAGE: &str = "Usage: filter <income|expense|all|category [name]|from <date>|to <date>|clear>";

  let (word, rest) = match args.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (args, ""),
  };

  match word.to_lowercase().as_str() {
    "all" if rest.is_empty() => Ok(FilterChange::Kind(None)),
    "clear" if rest.is_empty() => Ok(FilterChange::Clear),
    "category" | "cat" => Ok(FilterChange::Category(
      Some(rest.to_string()).filter(|c| !c.is_empty()),
    )),
    "from" => parse_date(rest).map(FilterChange::From),
    "to" => parse_date(rest).map(FilterChange::To),
    kind if rest.is_empty() => kind
      .parse::<TransactionType>()
      .map(|k| FilterChange::Kind(Some(k)))
      .map_err(|_| USAGE.to_string()),
    _ => Err(USAGE.to_string()),
  }
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
  NaiveDate::parse_from_str(input, "%Y-%m-%d")
    .map_err(|_| format!("Invalid date '{}', expected yyyy-mm-dd", input))
}

fn parse_sort(args: &str) -> Result<Action, String> {
  const USAGE: &str = "Usage: sort <date|amount|description|type> [asc|desc]";

  let mut parts = args.split_whitespace();
  let field = match parts.next().map(str::to_lowercase).as_deref() {
    Some("date") => SortField::Date,
    Some("amount") => SortField::Amount,
    Some("description") | Some("desc") => SortField::Description,
    Some("type") => SortField::Type,
    _ => return Err(USAGE.to_string()),
  };
  let order = match parts.next().map(str::to_lowercase).as_deref() {
    None => SortOrder::default(),
    Some("asc") => SortOrder::Asc,
    Some("desc") => SortOrder::Desc,
    Some(_) => return Err(USAGE.to_string()),
  };
  if parts.next().is_some() {
    return Err(USAGE.to_string());
  }

  Ok(Action::Sort { field, order })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("transactions");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "transactions");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("s");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "statistics");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("rep");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "reports");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("hboa");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "dashboard");
  }

  #[test]
  fn test_no_suggestions_once_arguments_start() {
    assert!(get_suggestions("add income").is_empty());
  }

  #[test]
  fn test_parse_simple_commands() {
    assert_eq!(parse("groups"), Ok(Action::Groups));
    assert_eq!(parse("  Q "), Ok(Action::Quit));
    assert!(parse("groups now").is_err());
    assert!(parse("launch").is_err());
  }

  #[test]
  fn test_parse_add() {
    assert_eq!(
      parse("add expense 25.000 Makan siang"),
      Ok(Action::Add {
        kind: TransactionType::Expense,
        amount: 25_000.0,
        description: "Makan siang".to_string(),
      })
    );
    assert!(parse("add expense 25.000").is_err());
    assert!(parse("add gift 10 Kado").is_err());
    assert!(parse("add income -5 Bonus").is_err());
  }

  #[test]
  fn test_parse_amount_and_group() {
    assert_eq!(parse("amount 1.250.000"), Ok(Action::Amount(1_250_000.0)));
    assert!(parse("amount").is_err());
    assert_eq!(
      parse("group Dana Darurat"),
      Ok(Action::Group("Dana Darurat".to_string()))
    );
  }

  #[test]
  fn test_parse_period() {
    assert_eq!(
      parse("period 2024 3"),
      Ok(Action::Period {
        year: 2024,
        month: Some(3)
      })
    );
    assert_eq!(
      parse("p 2023"),
      Ok(Action::Period {
        year: 2023,
        month: None
      })
    );
    assert!(parse("period 2024 13").is_err());
    assert!(parse("period soon").is_err());
  }

  #[test]
  fn test_parse_filter() {
    assert_eq!(
      parse("filter expense"),
      Ok(Action::Filter(FilterChange::Kind(Some(TransactionType::Expense))))
    );
    assert_eq!(parse("f all"), Ok(Action::Filter(FilterChange::Kind(None))));
    assert_eq!(
      parse("filter category Makan Siang"),
      Ok(Action::Filter(FilterChange::Category(Some(
        "Makan Siang".to_string()
      ))))
    );
    assert_eq!(
      parse("filter category"),
      Ok(Action::Filter(FilterChange::Category(None)))
    );
    assert_eq!(
      parse("filter from 2024-03-01"),
      Ok(Action::Filter(FilterChange::From(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
      )))
    );
    assert!(parse("filter to 01/03/2024").is_err());
    assert!(parse("filter income now").is_err());
    assert!(parse("filter").is_err());
  }

  #[test]
  fn test_parse_sort() {
    assert_eq!(
      parse("sort amount asc"),
      Ok(Action::Sort {
        field: SortField::Amount,
        order: SortOrder::Asc
      })
    );
    assert_eq!(
      parse("sort type"),
      Ok(Action::Sort {
        field: SortField::Type,
        order: SortOrder::Desc
      })
    );
    assert!(parse("sort size").is_err());
    assert!(parse("sort date up").is_err());
  }

  #[test]
  fn test_parse_pay() {
    assert_eq!(
      parse("pay 9 1.500.000 Maret 2024"),
      Ok(Action::Pay {
        user_id: 9,
        amount: 1_500_000.0,
        period: "Maret 2024".to_string(),
      })
    );
    assert!(parse("pay 9 1.500.000").is_err());
    assert!(parse("pay dimas 100 Maret").is_err());
    assert!(parse("pay 9 0 Maret").is_err());
  }

  #[test]
  fn test_parse_mark() {
    assert_eq!(parse("mark paid"), Ok(Action::Mark(PaymentStatus::Paid)));
    assert_eq!(
      parse("status Cancelled"),
      Ok(Action::Mark(PaymentStatus::Cancelled))
    );
    assert!(parse("mark").is_err());
    assert!(parse("mark refunded").is_err());
  }

  #[test]
  fn test_payroll_aliases() {
    assert_eq!(parse("hayabusa"), Ok(Action::Payroll));
    assert_eq!(get_suggestions("pay")[0].name, "pay");
  }
}

//! Rupiah formatting and parsing.

/// Group digits with `.` as the thousands separator.
pub fn group_thousands(value: u64) -> String {
  let digits = value.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push('.');
    }
    out.push(ch);
  }
  out
}

/// `Rp 1.500.000`, negatives as `-Rp 1.500`. Rounded to whole rupiah.
pub fn rupiah(amount: f64) -> String {
  let amount = if amount.is_finite() { amount } else { 0.0 };
  let rounded = amount.round();
  let grouped = group_thousands(rounded.abs() as u64);
  if rounded < 0.0 {
    format!("-Rp {}", grouped)
  } else {
    format!("Rp {}", grouped)
  }
}

/// Short form for narrow columns: `Rp 1,5Jt`, `Rp 2,0M`, `Rp 950rb`.
pub fn rupiah_compact(amount: f64) -> String {
  let value = amount.abs();
  let sign = if amount < 0.0 { "-" } else { "" };
  let body = if value >= 1_000_000_000.0 {
    format!("{:.1}M", value / 1_000_000_000.0).replace('.', ",")
  } else if value >= 1_000_000.0 {
    format!("{:.1}Jt", value / 1_000_000.0).replace('.', ",")
  } else if value >= 1_000.0 {
    format!("{:.0}rb", value / 1_000.0)
  } else {
    format!("{:.0}", value)
  };
  format!("{}Rp {}", sign, body)
}

/// Parse user input such as `1.500.000`, `Rp 25.000` or `7500`.
///
/// Dots are thousands separators; a comma starts the decimal part.
pub fn parse_amount(input: &str) -> Option<f64> {
  let trimmed = input.trim();
  let trimmed = trimmed
    .strip_prefix("Rp")
    .or_else(|| trimmed.strip_prefix("rp"))
    .unwrap_or(trimmed)
    .trim_start_matches('.')
    .trim();
  if trimmed.is_empty() {
    return None;
  }

  let normalized: String = trimmed
    .chars()
    .filter(|c| *c != '.')
    .map(|c| if c == ',' { '.' } else { c })
    .collect();

  normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_group_thousands() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1000), "1.000");
    assert_eq!(group_thousands(1_500_000), "1.500.000");
  }

  #[test]
  fn test_rupiah() {
    assert_eq!(rupiah(1_500_000.0), "Rp 1.500.000");
    assert_eq!(rupiah(-1500.0), "-Rp 1.500");
    assert_eq!(rupiah(0.0), "Rp 0");
    assert_eq!(rupiah(999.6), "Rp 1.000");
    assert_eq!(rupiah(f64::NAN), "Rp 0");
  }

  #[test]
  fn test_rupiah_compact() {
    assert_eq!(rupiah_compact(1_500_000.0), "Rp 1,5Jt");
    assert_eq!(rupiah_compact(2_000_000_000.0), "Rp 2,0M");
    assert_eq!(rupiah_compact(-950_000.0), "-Rp 950rb");
    assert_eq!(rupiah_compact(500.0), "Rp 500");
  }

  #[test]
  fn test_parse_amount() {
    assert_eq!(parse_amount("1.500.000"), Some(1_500_000.0));
    assert_eq!(parse_amount("Rp 25.000"), Some(25_000.0));
    assert_eq!(parse_amount("Rp. 7.500"), Some(7_500.0));
    assert_eq!(parse_amount("12,5"), Some(12.5));
    assert_eq!(parse_amount("abc"), None);
    assert_eq!(parse_amount(""), None);
  }
}

use chrono::{DateTime, Local, Utc};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, server, breadcrumb and cache badge
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  api_url: &str,
  breadcrumb: &[String],
  cached_at: Option<DateTime<Utc>>,
) {
  let host = extract_host(api_url);

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", breadcrumb.join(" › ")),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if let Some(fetched) = cached_at {
    spans.push(Span::styled(
      format!(" cached {} ", fetched.with_timezone(&Local).format("%H:%M")),
      Style::default().fg(Color::Black).bg(Color::Green),
    ));
  }

  // Shortcuts - keys and brackets highlighted, descriptions dimmed
  spans.extend([
    Span::raw("  "),
    Span::styled("<:>", Style::default().fg(Color::Cyan)),
    Span::styled(" command", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("</>", Style::default().fg(Color::Cyan)),
    Span::styled(" search", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<r>", Style::default().fg(Color::Cyan)),
    Span::styled(" refresh", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<q>", Style::default().fg(Color::Cyan)),
    Span::styled(" back", Style::default().fg(Color::DarkGray)),
  ]);

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Host (and port) of the API url
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(
      extract_host("https://finance.example.com/api/"),
      "finance.example.com"
    );
    assert_eq!(extract_host("http://localhost:8000/api/"), "localhost:8000");
    assert_eq!(extract_host("finance.local"), "finance.local");
  }
}

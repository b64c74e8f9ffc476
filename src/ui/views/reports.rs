use super::transactions::draw_transactions;
use crate::api::types::{Report, ReportParams};
use crate::format::rupiah;
use crate::pages::ReportPage;
use crate::ui::renderfns::balance_color;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn draw_report(
  frame: &mut Frame,
  area: Rect,
  params: &ReportParams,
  report: Option<&Report>,
  page: usize,
  loading: bool,
) {
  let title = if loading {
    format!(" Report {} (loading...) ", params)
  } else {
    format!(" Report {} ", params)
  };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(5), // Summary
      Constraint::Min(3),    // Rows
      Constraint::Length(1), // Pagination
    ])
    .split(area);

  let summary_block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let Some(report) = report else {
    let paragraph = Paragraph::new("No report loaded. Use :period <yyyy> [mm] to pick a period.")
      .block(summary_block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let net = report.income - report.expenses;
  let label = Style::default().fg(Color::DarkGray);
  let summary = vec![
    Line::from(vec![
      Span::styled("Income:   ", label),
      Span::styled(rupiah(report.income), Style::default().fg(Color::Green)),
    ]),
    Line::from(vec![
      Span::styled("Expenses: ", label),
      Span::styled(rupiah(report.expenses), Style::default().fg(Color::Red)),
    ]),
    Line::from(vec![
      Span::styled("Net:      ", label),
      Span::styled(rupiah(net), Style::default().fg(balance_color(net)).bold()),
    ]),
  ];
  frame.render_widget(Paragraph::new(summary).block(summary_block), chunks[0]);

  let current = ReportPage::of(&report.transactions, page);
  let rows_block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  draw_transactions(frame, chunks[1], rows_block, current.rows, None, loading);

  let footer = if current.total == 0 {
    String::new()
  } else {
    format!(
      " Showing {}-{} of {}   page {}/{}   h/l: page   :export csv",
      current.first, current.last, current.total, current.page, current.total_pages
    )
  };
  frame.render_widget(
    Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
    chunks[2],
  );
}

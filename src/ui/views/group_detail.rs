use super::transactions::draw_transactions;
use crate::api::types::Transaction;
use crate::format::rupiah;
use crate::pages::GroupDetail;
use crate::ui::renderfns::balance_color;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn draw_group_detail(
  frame: &mut Frame,
  area: Rect,
  detail: &GroupDetail,
  visible: &[Transaction],
  selected: usize,
  loading: bool,
) {
  let group = &detail.group;
  let title = if loading {
    format!(" {} (loading...) ", group.name)
  } else {
    format!(" {} ", group.name)
  };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(5), // Totals
      Constraint::Min(3),    // Transactions
    ])
    .split(area);

  let label = Style::default().fg(Color::DarkGray);
  let balance = detail.balance();
  let header = vec![
    Line::from(vec![
      Span::styled("Income:  ", label),
      Span::styled(rupiah(detail.total_income()), Style::default().fg(Color::Green)),
      Span::styled("   Expense: ", label),
      Span::styled(rupiah(detail.total_expense()), Style::default().fg(Color::Red)),
    ]),
    Line::from(vec![
      Span::styled("Balance: ", label),
      Span::styled(rupiah(balance), Style::default().fg(balance_color(balance)).bold()),
    ]),
    Line::styled(group.description.clone().unwrap_or_default(), label),
  ];
  let header_block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  frame.render_widget(
    Paragraph::new(header)
      .block(header_block)
      .wrap(Wrap { trim: true }),
    chunks[0],
  );

  let list_block = Block::default()
    .title(format!(" Transactions ({}) ", visible.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  draw_transactions(frame, chunks[1], list_block, visible, Some(selected), loading);
}

use super::transactions::draw_transactions;
use crate::format::rupiah;
use crate::pages::DashboardData;
use crate::ui::renderfns::balance_color;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn draw_dashboard(frame: &mut Frame, area: Rect, data: Option<&DashboardData>, loading: bool) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(6), // Totals
      Constraint::Min(3),    // Recent activity
    ])
    .split(area);

  let title = if loading {
    " Dashboard (loading...) "
  } else {
    " Dashboard "
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let Some(data) = data else {
    let paragraph = Paragraph::new("Loading balance...")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let stats = &data.stats;
  let label = Style::default().fg(Color::DarkGray);
  let totals = vec![
    Line::from(vec![
      Span::styled("Balance:      ", label),
      Span::styled(
        rupiah(stats.balance),
        Style::default().fg(balance_color(stats.balance)).bold(),
      ),
    ]),
    Line::from(vec![
      Span::styled("Income:       ", label),
      Span::styled(rupiah(stats.total_income), Style::default().fg(Color::Green)),
    ]),
    Line::from(vec![
      Span::styled("Expense:      ", label),
      Span::styled(rupiah(stats.total_expense), Style::default().fg(Color::Red)),
    ]),
    Line::from(vec![
      Span::styled("Transactions: ", label),
      Span::raw(stats.transaction_count.to_string()),
    ]),
  ];
  frame.render_widget(Paragraph::new(totals).block(block), chunks[0]);

  let recent = Block::default()
    .title(" Latest transaction ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  draw_transactions(frame, chunks[1], recent, &data.recent, None, loading);
}

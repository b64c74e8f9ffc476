use crate::api::types::PaymentStatus;
use crate::format::rupiah;
use crate::pages::Payroll;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

fn status_color(status: &PaymentStatus) -> Color {
  match status {
    PaymentStatus::Paid => Color::Green,
    PaymentStatus::Pending => Color::Yellow,
    PaymentStatus::Cancelled => Color::Red,
    PaymentStatus::Other(_) => Color::Gray,
  }
}

pub fn draw_payroll(
  frame: &mut Frame,
  area: Rect,
  payroll: Option<&Payroll>,
  selected: usize,
  loading: bool,
) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(5), // Totals
      Constraint::Min(3),    // Payments
    ])
    .split(area);

  let title = if loading {
    " Payroll (loading...) "
  } else {
    " Payroll "
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let Some(payroll) = payroll else {
    let paragraph = Paragraph::new("Loading payments...")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let label = Style::default().fg(Color::DarkGray);
  let latest = payroll
    .latest()
    .map(|p| format!("{} ({}, {})", rupiah(p.amount), p.period(), p.status.as_str()))
    .unwrap_or_else(|| "-".to_string());
  let totals = vec![
    Line::from(vec![
      Span::styled("Total received: ", label),
      Span::styled(
        rupiah(payroll.stats.total_income),
        Style::default().fg(Color::Green).bold(),
      ),
      Span::styled("   Average: ", label),
      Span::raw(rupiah(payroll.average_payment())),
    ]),
    Line::from(vec![
      Span::styled("Pending:        ", label),
      Span::styled(
        payroll.stats.pending_payments.to_string(),
        Style::default().fg(Color::Yellow),
      ),
    ]),
    Line::from(vec![Span::styled("Latest:         ", label), Span::raw(latest)]),
  ];
  frame.render_widget(Paragraph::new(totals).block(block), chunks[0]);

  let list_block = Block::default()
    .title(format!(" Payments ({}) ", payroll.payments.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  if payroll.payments.is_empty() {
    let paragraph = Paragraph::new("No payments yet.")
      .block(list_block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, chunks[1]);
    return;
  }

  let items: Vec<ListItem> = payroll
    .payments
    .iter()
    .map(|payment| {
      let date = payment
        .paid_on()
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "-".to_string());
      let line = Line::from(vec![
        Span::styled(format!("{:<12}", date), Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(
          format!("{:<10}", payment.status.as_str()),
          Style::default().fg(status_color(&payment.status)),
        ),
        Span::raw(format!("{:<18}", truncate(payment.period(), 18))),
        Span::raw(format!("{:<16}", truncate(payment.group_name(), 16))),
        Span::styled(format!("{:>16}", rupiah(payment.amount)), Style::default().bold()),
        Span::raw("  "),
        Span::styled(
          truncate(payment.description.as_deref().unwrap_or(""), 30),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(list_block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));

  frame.render_stateful_widget(list, chunks[1], &mut state);
}

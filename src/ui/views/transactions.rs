use crate::api::types::Transaction;
use crate::format::rupiah;
use crate::ui::renderfns::{kind_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_transaction_list(
  frame: &mut Frame,
  area: Rect,
  transactions: &[Transaction],
  total: usize,
  selected: usize,
  search: &str,
  filter: Option<&str>,
  loading: bool,
) {
  let mut title = if loading {
    " Transactions (loading...) ".to_string()
  } else if search.is_empty() && filter.is_none() {
    format!(" Transactions ({}) ", total)
  } else if search.is_empty() {
    format!(" Transactions ({}/{}) ", transactions.len(), total)
  } else {
    format!(" Transactions [/{}] ({}/{}) ", search, transactions.len(), total)
  };
  if let Some(filter) = filter {
    title.push_str(&format!("[{}] ", filter));
  }

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  draw_transactions(frame, area, block, transactions, Some(selected), loading);
}

/// Transaction rows inside `block`, or an empty-state message.
pub(super) fn draw_transactions(
  frame: &mut Frame,
  area: Rect,
  block: Block,
  transactions: &[Transaction],
  selected: Option<usize>,
  loading: bool,
) {
  if transactions.is_empty() {
    let content = if loading { "" } else { "No transactions found." };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = transactions.iter().map(transaction_item).collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(selected);

  frame.render_stateful_widget(list, area, &mut state);
}

fn transaction_item(tx: &Transaction) -> ListItem<'static> {
  let date = tx
    .booking_date()
    .map(|d| d.format("%d/%m/%Y").to_string())
    .unwrap_or_else(|| "-".to_string());

  let line = Line::from(vec![
    Span::styled(format!("{:<10}", date), Style::default().fg(Color::Cyan)),
    Span::raw(" "),
    Span::styled(
      format!("{:<7}", tx.kind.as_str()),
      Style::default().fg(kind_color(tx.kind)),
    ),
    Span::raw(" "),
    Span::styled(
      format!("{:>16}", rupiah(tx.amount)),
      Style::default().fg(kind_color(tx.kind)),
    ),
    Span::raw("  "),
    Span::styled(
      format!("{:<16}", truncate(tx.display_category(), 16)),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw(" "),
    Span::raw(truncate(tx.description(), 50)),
    Span::styled(
      tx.user_name()
        .map(|name| format!("  @{}", name))
        .unwrap_or_default(),
      Style::default().fg(Color::DarkGray),
    ),
  ]);
  ListItem::new(line)
}

use crate::api::types::TransactionGroup;
use crate::pages::groups_of_kind;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_group_list(
  frame: &mut Frame,
  area: Rect,
  groups: &[TransactionGroup],
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Groups (loading...) ".to_string()
  } else {
    format!(
      " Groups ({}: {} income, {} expense) ",
      groups.len(),
      groups_of_kind(groups, Some("income")).len(),
      groups_of_kind(groups, Some("expense")).len()
    )
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if groups.is_empty() && !loading {
    let paragraph = Paragraph::new("No groups yet. Create one with :group <name>.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = groups
    .iter()
    .map(|group| {
      let kind = group.kind.as_deref().unwrap_or("-");
      let kind_color = match kind {
        "income" => Color::Green,
        "expense" => Color::Red,
        _ => Color::White,
      };
      let count = group
        .transactions_count
        .map(|n| format!("{} tx", n))
        .unwrap_or_default();

      let line = Line::from(vec![
        Span::styled(format!("{:<6}", group.id), Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(format!("{:<8}", kind), Style::default().fg(kind_color)),
        Span::raw(" "),
        Span::raw(format!("{:<28}", truncate(&group.name, 28))),
        Span::styled(format!("{:>8}", count), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
          truncate(group.description.as_deref().unwrap_or(""), 40),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));

  frame.render_stateful_widget(list, area, &mut state);
}

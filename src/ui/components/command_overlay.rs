use crate::commands::Command;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Draw the command overlay with autocomplete
pub fn draw_command_overlay(
  frame: &mut Frame,
  area: Rect,
  input: &str,
  suggestions: &[&Command],
  selected_suggestion: usize,
) {
  // Calculate overlay dimensions
  let width = (area.width * 70 / 100).clamp(30, 80).min(area.width);
  let suggestion_count = suggestions.len().min(8);
  let height = if suggestions.is_empty() {
    3 // Just input line with borders
  } else {
    3 + suggestion_count as u16 // Input + suggestions
  };

  // Position at top-left of content area with small margin
  let x = area.x + 1;
  let y = area.y + 1;

  let overlay_area = Rect::new(x, y, width, height.min(area.height.saturating_sub(1)));

  // Clear the area behind the overlay
  frame.render_widget(Clear, overlay_area);

  // Draw the border/block
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow))
    .title(" Command ");

  let inner = block.inner(overlay_area);
  frame.render_widget(block, overlay_area);

  if inner.height == 0 {
    return;
  }

  // Split inner area: input line + suggestions
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Input line
      Constraint::Min(0),    // Suggestions
    ])
    .split(inner);

  // Draw input line
  let input_line = Line::from(vec![
    Span::styled(":", Style::default().fg(Color::Yellow)),
    Span::raw(input),
    Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
  ]);
  let input_para = Paragraph::new(input_line);
  frame.render_widget(input_para, chunks[0]);

  // Draw suggestions if any
  if !suggestions.is_empty() && chunks[1].height > 0 {
    let items: Vec<ListItem> = suggestions
      .iter()
      .map(|cmd| {
        let mut spans = vec![Span::styled(
          format!("{:<14}", cmd.name),
          Style::default().fg(Color::Cyan),
        )];
        if let Some(usage) = cmd.usage {
          spans.push(Span::styled(
            format!("{} ", usage),
            Style::default().fg(Color::Yellow),
          ));
        }
        spans.push(Span::styled(
          cmd.description,
          Style::default().fg(Color::DarkGray),
        ));
        let line = Line::from(spans);
        ListItem::new(line)
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(selected_suggestion));

    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

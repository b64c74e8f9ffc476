use crate::api::types::ReportParams;
use crate::format::{rupiah, rupiah_compact};
use crate::pages::Statistics;
use crate::ui::renderfns::balance_color;
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

pub fn draw_statistics(
  frame: &mut Frame,
  area: Rect,
  params: &ReportParams,
  stats: Option<&Statistics>,
  loading: bool,
) {
  let title = if loading {
    format!(" Statistics {} (loading...) ", params)
  } else {
    format!(" Statistics {} ", params)
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let Some(stats) = stats else {
    let paragraph = Paragraph::new("No statistics loaded.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // Totals
      Constraint::Min(8),    // Categories + trend
      Constraint::Length(9), // Last 7 days
    ])
    .split(inner);

  let label = Style::default().fg(Color::DarkGray);
  let totals = Line::from(vec![
    Span::styled(" Income ", label),
    Span::styled(rupiah(stats.total_income), Style::default().fg(Color::Green)),
    Span::styled("   Expense ", label),
    Span::styled(rupiah(stats.total_expense), Style::default().fg(Color::Red)),
    Span::styled("   Net ", label),
    Span::styled(
      rupiah(stats.net_income),
      Style::default().fg(balance_color(stats.net_income)).bold(),
    ),
    Span::styled("   Count ", label),
    Span::raw(stats.transaction_count.to_string()),
  ]);
  frame.render_widget(Paragraph::new(totals), rows[0]);

  let middle = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
    .split(rows[1]);

  let categories: Vec<Line> = if stats.top_categories.is_empty() {
    vec![Line::styled("No expenses in this period.", label)]
  } else {
    stats
      .top_categories
      .iter()
      .enumerate()
      .map(|(i, c)| {
        Line::from(vec![
          Span::styled(format!("{}. ", i + 1), label),
          Span::styled(format!("{:<18}", c.name), Style::default().fg(Color::Yellow)),
          Span::raw(rupiah(c.amount)),
        ])
      })
      .collect()
  };
  frame.render_widget(
    Paragraph::new(categories).block(
      Block::default()
        .title(" Top expense categories ")
        .borders(Borders::ALL)
        .border_style(label),
    ),
    middle[0],
  );

  let trend: Vec<Line> = stats
    .monthly_trend
    .iter()
    .map(|m| {
      Line::from(vec![
        Span::styled(format!("{:<10}", m.month), Style::default().fg(Color::Cyan)),
        Span::styled(
          format!("+{:<14}", rupiah_compact(m.income)),
          Style::default().fg(Color::Green),
        ),
        Span::styled(
          format!("-{}", rupiah_compact(m.expense)),
          Style::default().fg(Color::Red),
        ),
      ])
    })
    .collect();
  frame.render_widget(
    Paragraph::new(trend).block(
      Block::default()
        .title(" Monthly trend ")
        .borders(Borders::ALL)
        .border_style(label),
    ),
    middle[1],
  );

  let groups: Vec<BarGroup> = stats
    .daily
    .iter()
    .map(|day| {
      let label = day.label();
      BarGroup::default()
        .label(Line::from(label))
        .bars(&[
          Bar::default()
            .value(day.income.max(0.0) as u64)
            .text_value(String::new())
            .style(Style::default().fg(Color::Green)),
          Bar::default()
            .value(day.expense.max(0.0) as u64)
            .text_value(format!("{}x", day.count))
            .style(Style::default().fg(Color::Red)),
        ])
    })
    .collect();

  let mut chart = BarChart::default()
    .block(
      Block::default()
        .title(" Last 7 days (income / expense) ")
        .borders(Borders::ALL)
        .border_style(label),
    )
    .bar_width(3)
    .bar_gap(0)
    .group_gap(2);
  for group in groups {
    chart = chart.data(group);
  }
  frame.render_widget(chart, rows[2]);
}

mod components;
mod renderfns;
mod views;

use crate::app::{App, Mode, StatusKind, ViewState};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.api_url(),
    &app.view_breadcrumb(),
    app.cached_at(),
  );

  // Draw current view
  if let Some(view) = app.current_view() {
    match view {
      ViewState::Dashboard { data, loading } => {
        views::dashboard::draw_dashboard(frame, chunks[1], data.as_ref(), *loading);
      }
      ViewState::Transactions {
        transactions,
        selected,
        loading,
      } => {
        let visible = app.visible_transactions();
        views::transactions::draw_transaction_list(
          frame,
          chunks[1],
          &visible,
          transactions.len(),
          *selected,
          app.search_filter(),
          app.filter_summary().as_deref(),
          *loading,
        );
      }
      ViewState::Reports {
        params,
        report,
        page,
        loading,
      } => {
        views::reports::draw_report(frame, chunks[1], params, report.as_ref(), *page, *loading);
      }
      ViewState::Statistics {
        params,
        stats,
        loading,
      } => {
        views::statistics::draw_statistics(frame, chunks[1], params, stats.as_ref(), *loading);
      }
      ViewState::Groups {
        groups,
        selected,
        loading,
      } => {
        views::groups::draw_group_list(frame, chunks[1], groups, *selected, *loading);
      }
      ViewState::Payroll {
        payroll,
        selected,
        loading,
      } => {
        views::payroll::draw_payroll(frame, chunks[1], payroll.as_deref(), *selected, *loading);
      }
      ViewState::GroupDetail {
        detail,
        selected,
        loading,
      } => {
        let visible = app.visible_transactions();
        views::group_detail::draw_group_detail(
          frame, chunks[1], detail, &visible, *selected, *loading,
        );
      }
    }
  }

  if *app.mode() == Mode::Command {
    components::draw_command_overlay(
      frame,
      chunks[1],
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }

  // Draw status bar
  draw_status_bar(frame, chunks[2], app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => match app.status() {
      Some(status) => {
        let color = match status.kind {
          StatusKind::Info => Color::Yellow,
          StatusKind::Success => Color::Green,
          StatusKind::Error => Color::Red,
        };
        (format!(" {}", status.text), Style::default().fg(color))
      }
      None => {
        let hint = " :command  /search  j/k:nav  Enter:open  d:delete  r:refresh  q:back  Ctrl-C:quit";
        (hint.to_string(), Style::default().fg(Color::DarkGray))
      }
    },
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
    Mode::Search => {
      let search = format!("/{}", app.search_filter());
      (search, Style::default().fg(Color::Cyan))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}

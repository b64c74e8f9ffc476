use crate::api::types::{
  GroupForm, HayabusaPayment, Report, ReportParams, Transaction, TransactionForm,
  TransactionGroup, User,
};
use crate::api::{ApiClient, ApiError};
use crate::cache::{CacheResult, ResponseCache};
use crate::commands::{self, Action, Command, FilterChange};
use crate::config::Config;
use crate::event::{Event, EventHandler, PageEvent};
use crate::format::rupiah;
use crate::pages::{
  export_csv, unique_categories, DashboardData, GroupDetail, PageLoader, Payroll, ReportPage,
  Statistics, TransactionFilter,
};
use crate::ui;
use chrono::{DateTime, Datelike, Local, Utc};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::future::Future;
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Status messages disappear after this long
const STATUS_TTL: Duration = Duration::from_secs(5);
/// The dashboard reloads itself when left open this long
const DASHBOARD_AUTO_REFRESH: Duration = Duration::from_secs(10 * 60);
/// Accounts with this role only see their payroll
const HAYABUSA_ROLE: &str = "hayabusa";

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
  pub text: String,
  pub kind: StatusKind,
  shown_at: Instant,
}

/// Something awaiting a `y` confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingDelete {
  Transaction(u64),
  Group(u64),
}

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  // Root views (set via : commands)
  Dashboard {
    data: Option<DashboardData>,
    loading: bool,
  },
  Transactions {
    transactions: Vec<Transaction>,
    selected: usize,
    loading: bool,
  },
  Reports {
    params: ReportParams,
    report: Option<Report>,
    page: usize,
    loading: bool,
  },
  Statistics {
    params: ReportParams,
    stats: Option<Statistics>,
    loading: bool,
  },
  Groups {
    groups: Vec<TransactionGroup>,
    selected: usize,
    loading: bool,
  },
  Payroll {
    payroll: Option<Box<Payroll>>,
    selected: usize,
    loading: bool,
  },

  // Detail views (pushed via Enter)
  GroupDetail {
    detail: Box<GroupDetail>,
    selected: usize,
    loading: bool,
  },
}

impl Default for ViewState {
  fn default() -> Self {
    ViewState::Dashboard {
      data: None,
      loading: true,
    }
  }
}

impl ViewState {
  fn payroll() -> Self {
    ViewState::Payroll {
      payroll: None,
      selected: 0,
      loading: true,
    }
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Search filter input (after pressing /)
  search_filter: String,

  /// Type, category, date and ordering for transaction lists (set via :filter and :sort)
  filter: TransactionFilter,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Application configuration
  config: Config,

  /// Logged in with the `hayabusa` role
  hayabusa: bool,

  /// Cache-backed page loaders and writes
  pages: PageLoader<ApiClient>,

  /// Period used by reports and statistics
  period: ReportParams,

  /// Fetch time of the cache entry the root view was served from
  cached_at: Option<DateTime<Utc>>,

  /// When the root view last finished loading
  last_loaded: Option<Instant>,

  status: Option<StatusMessage>,

  pending_delete: Option<PendingDelete>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,

  /// Printed after the terminal is restored
  exit_message: Option<String>,
}

impl App {
  pub fn new(config: Config, api: ApiClient, user: Option<&User>) -> Self {
    let (tx, _rx) = mpsc::unbounded_channel();
    let pages = PageLoader::new(api, ResponseCache::new(), config.freshness_policy());
    let today = Local::now().date_naive();
    let hayabusa = user.is_some_and(is_hayabusa);
    let root = if hayabusa {
      ViewState::payroll()
    } else {
      ViewState::default()
    };

    Self {
      view_stack: vec![root],
      mode: Mode::Normal,
      command_input: String::new(),
      search_filter: String::new(),
      filter: TransactionFilter::default(),
      selected_suggestion: 0,
      config,
      hayabusa,
      pages,
      period: ReportParams::monthly(today.year(), today.month()),
      cached_at: None,
      last_loaded: None,
      status: None,
      pending_delete: None,
      event_tx: tx,
      should_quit: false,
      exit_message: None,
    }
  }

  /// Run the UI until the user quits. Returns a message to print afterwards.
  pub async fn run(&mut self) -> Result<Option<String>> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load
    self.load_current(false);

    // Main loop
    let result = async {
      while !self.should_quit {
        terminal.draw(|frame| ui::draw(frame, self))?;

        if let Some(event) = events.next().await {
          self.handle_event(event);
        }
      }
      Ok::<_, color_eyre::Report>(())
    }
    .await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result?;
    Ok(self.exit_message.take())
  }

  /// Run `task` in the background and deliver its outcome as an event.
  fn spawn<F>(&self, task: F)
  where
    F: Future<Output = Result<PageEvent, ApiError>> + Send + 'static,
  {
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      let event = match task.await {
        Ok(page) => Event::Page(page),
        Err(e) => Event::Failed(e),
      };
      let _ = tx.send(event);
    });
  }

  /// (Re)load whatever the top view shows.
  fn load_current(&mut self, force: bool) {
    let pages = self.pages.clone();
    let Some(view) = self.view_stack.last_mut() else {
      return;
    };

    match view {
      ViewState::Dashboard { loading, .. } => {
        *loading = true;
        self.spawn(async move {
          pages
            .dashboard(force)
            .await
            .map(PageEvent::DashboardLoaded)
        });
      }
      ViewState::Transactions { loading, .. } => {
        *loading = true;
        self.spawn(async move {
          pages
            .transactions(force)
            .await
            .map(PageEvent::TransactionsLoaded)
        });
      }
      ViewState::Reports {
        params, loading, ..
      } => {
        *loading = true;
        let params = *params;
        self.spawn(async move {
          pages
            .report(params, force)
            .await
            .map(|result| PageEvent::ReportLoaded(params, result))
        });
      }
      ViewState::Statistics {
        params, loading, ..
      } => {
        *loading = true;
        let params = *params;
        self.spawn(async move {
          pages
            .statistics(params, force)
            .await
            .map(|result| PageEvent::StatisticsLoaded(params, result))
        });
      }
      ViewState::Groups { loading, .. } => {
        *loading = true;
        self.spawn(async move { pages.groups(force).await.map(PageEvent::GroupsLoaded) });
      }
      ViewState::Payroll { loading, .. } => {
        *loading = true;
        self.spawn(async move {
          pages
            .payroll()
            .await
            .map(|p| PageEvent::PayrollLoaded(Box::new(p)))
        });
      }
      ViewState::GroupDetail {
        detail, loading, ..
      } => {
        *loading = true;
        let id = detail.group.id;
        self.spawn(async move {
          pages
            .group_detail(id)
            .await
            .map(|d| PageEvent::GroupDetailLoaded(Box::new(d)))
        });
      }
    }
  }

  /// Replace the whole stack with a new root view and load it.
  fn switch_root(&mut self, view: ViewState) {
    self.view_stack = vec![view];
    self.cached_at = None;
    self.search_filter.clear();
    self.pending_delete = None;
    self.load_current(false);
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.on_tick(),
      Event::Page(page) => self.handle_page_event(page),
      Event::Failed(e) => self.handle_failure(e),
    }
  }

  fn on_tick(&mut self) {
    if self
      .status
      .as_ref()
      .is_some_and(|s| s.shown_at.elapsed() > STATUS_TTL && self.pending_delete.is_none())
    {
      self.status = None;
    }

    let idle_dashboard = matches!(
      self.view_stack.as_slice(),
      [ViewState::Dashboard { loading: false, .. }]
    );
    if idle_dashboard
      && self
        .last_loaded
        .is_some_and(|t| t.elapsed() > DASHBOARD_AUTO_REFRESH)
    {
      self.load_current(false);
    }
  }

  fn handle_failure(&mut self, e: ApiError) {
    if e.is_auth() {
      info!("Session ended: {}", e);
      self.exit_message = Some(e.to_string());
      self.should_quit = true;
      return;
    }

    error!("Request failed: {}", e);
    self.set_loading(false);
    // Prefer the message for the offending form field
    let text = [
      "amount",
      "description",
      "date",
      "type",
      "name",
      "hayabusa_user_id",
      "transaction_group_id",
      "period",
    ]
      .into_iter()
      .find_map(|field| e.field_error(field))
      .map(String::from)
      .unwrap_or_else(|| e.to_string());
    self.set_status(text, StatusKind::Error);
  }

  fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
    self.status = Some(StatusMessage {
      text: text.into(),
      kind,
      shown_at: Instant::now(),
    });
  }

  fn set_loading(&mut self, value: bool) {
    if let Some(view) = self.view_stack.last_mut() {
      match view {
        ViewState::Dashboard { loading, .. }
        | ViewState::Transactions { loading, .. }
        | ViewState::Reports { loading, .. }
        | ViewState::Statistics { loading, .. }
        | ViewState::Groups { loading, .. }
        | ViewState::Payroll { loading, .. }
        | ViewState::GroupDetail { loading, .. } => *loading = value,
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    if let Some(target) = self.pending_delete.take() {
      if key.code == KeyCode::Char('y') {
        self.confirm_delete(target);
      } else {
        self.set_status("Delete cancelled", StatusKind::Info);
      }
      return;
    }

    match key.code {
      // Quit
      KeyCode::Char('q') => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          self.search_filter.clear();
        } else {
          self.should_quit = true;
        }
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Left | KeyCode::Char('h') => self.change_page(-1),
      KeyCode::Right | KeyCode::Char('l') => self.change_page(1),
      KeyCode::Enter => self.enter_selected(),
      KeyCode::Esc => {
        if !self.search_filter.is_empty() {
          self.search_filter.clear();
        } else if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
        self.status = None;
      }

      // Actions
      KeyCode::Char('r') => self.load_current(true),
      KeyCode::Char('d') => self.request_delete(),

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }
      KeyCode::Char('/') => {
        self.mode = Mode::Search;
        self.search_filter.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        // Navigate autocomplete suggestions
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        // Navigate autocomplete suggestions backwards
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_filter.clear();
      }
      KeyCode::Enter => {
        // Apply filter and return to normal mode
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_filter.pop();
      }
      KeyCode::Char(c) => {
        self.search_filter.push(c);
      }
      _ => {}
    }
    self.clamp_selection();
  }

  fn execute_command(&mut self) {
    // A bare word may pick the highlighted suggestion; arguments are parsed as typed
    let input = self.command_input.trim().to_string();
    let suggestions = commands::get_suggestions(&input);
    let line = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      input
    };
    self.command_input.clear();

    if line.is_empty() {
      return;
    }

    match commands::parse(&line) {
      Ok(action) => self.run_action(action),
      Err(msg) => self.set_status(msg, StatusKind::Error),
    }
  }

  fn run_action(&mut self, action: Action) {
    if let Err(msg) = self.check_role(&action) {
      self.set_status(msg, StatusKind::Error);
      return;
    }

    match action {
      Action::Dashboard => self.switch_root(ViewState::Dashboard {
        data: None,
        loading: true,
      }),
      Action::Transactions => self.switch_root(ViewState::Transactions {
        transactions: Vec::new(),
        selected: 0,
        loading: true,
      }),
      Action::Reports => self.switch_root(ViewState::Reports {
        params: self.period,
        report: None,
        page: 1,
        loading: true,
      }),
      Action::Statistics => self.switch_root(ViewState::Statistics {
        params: self.period,
        stats: None,
        loading: true,
      }),
      Action::Groups => self.switch_root(ViewState::Groups {
        groups: Vec::new(),
        selected: 0,
        loading: true,
      }),
      Action::Payroll => self.switch_root(ViewState::payroll()),
      Action::Refresh => self.load_current(true),
      Action::Quit => self.should_quit = true,
      Action::Add {
        kind,
        amount,
        description,
      } => {
        let mut form = TransactionForm::new(kind, amount, &description, Local::now().date_naive());
        // Adding from a group detail files the transaction under that group
        if let Some(ViewState::GroupDetail { detail, .. }) = self.view_stack.last() {
          form.transaction_group_id = Some(detail.group.id);
        }
        let pages = self.pages.clone();
        self.spawn(async move {
          pages.create_transaction(form).await?;
          Ok(PageEvent::Saved(format!(
            "Added {} {}",
            kind.as_str(),
            rupiah(amount)
          )))
        });
      }
      Action::Amount(amount) => {
        let selected = self
          .selected_transaction()
          .map(|tx| (tx.id, TransactionForm::from_transaction(tx)));
        let Some((id, mut form)) = selected else {
          self.set_status("Select a transaction first", StatusKind::Error);
          return;
        };
        form.amount = amount;
        let pages = self.pages.clone();
        self.spawn(async move {
          pages.update_transaction(id, form).await?;
          Ok(PageEvent::Saved(format!("Amount set to {}", rupiah(amount))))
        });
      }
      Action::Group(name) => {
        let pages = self.pages.clone();
        self.spawn(async move {
          pages.create_group(GroupForm::new(&name)).await?;
          Ok(PageEvent::Saved(format!("Group '{}' created", name)))
        });
      }
      Action::Pay {
        user_id,
        amount,
        period,
      } => {
        let pages = self.pages.clone();
        self.spawn(async move {
          let form = pages
            .prepare_payment(user_id, amount, &period, Local::now().date_naive())
            .await?;
          pages.create_payment(form).await?;
          Ok(PageEvent::Saved(format!(
            "Payment of {} for {} recorded",
            rupiah(amount),
            period
          )))
        });
      }
      Action::Mark(status) => {
        let Some(id) = self.selected_payment().map(|p| p.id) else {
          self.set_status("Select a payment first", StatusKind::Error);
          return;
        };
        let pages = self.pages.clone();
        self.spawn(async move {
          let label = status.as_str().to_string();
          pages.update_payment_status(id, status).await?;
          Ok(PageEvent::Saved(format!("Payment marked {}", label)))
        });
      }
      Action::Period { year, month } => {
        self.period = match month {
          Some(month) => ReportParams::monthly(year, month),
          None => ReportParams::yearly(year),
        };
        let period = self.period;
        match self.view_stack.first_mut() {
          Some(ViewState::Reports {
            params,
            report,
            page,
            ..
          }) => {
            *params = period;
            *report = None;
            *page = 1;
            self.view_stack.truncate(1);
            self.load_current(false);
          }
          Some(ViewState::Statistics { params, stats, .. }) => {
            *params = period;
            *stats = None;
            self.view_stack.truncate(1);
            self.load_current(false);
          }
          _ => self.set_status(format!("Period set to {}", period), StatusKind::Info),
        }
      }
      Action::Filter(change) => self.change_filter(change),
      Action::Sort { field, order } => {
        self.filter.sort_by = field;
        self.filter.order = order;
        self.clamp_selection();
        self.set_status(
          format!("Sorted by {} {}", field.as_str(), order.as_str()),
          StatusKind::Info,
        );
      }
      Action::Export => self.export_report(),
    }
  }

  /// Hayabusa accounts are confined to their payroll, and only they get one.
  fn check_role(&self, action: &Action) -> Result<(), &'static str> {
    let payroll_action = matches!(
      action,
      Action::Payroll | Action::Pay { .. } | Action::Mark(_)
    );
    let shared = matches!(action, Action::Refresh | Action::Quit);
    match (self.hayabusa, payroll_action || shared) {
      (true, false) => Err("Not available for Hayabusa accounts"),
      (false, _) if payroll_action => Err("Payroll is only available to Hayabusa accounts"),
      _ => Ok(()),
    }
  }

  fn change_filter(&mut self, change: FilterChange) {
    let mut note = None;
    match change {
      FilterChange::Kind(kind) => self.filter.kind = kind,
      FilterChange::Category(category) => {
        if category.is_none() {
          let categories = unique_categories(&self.loaded_transactions());
          if !categories.is_empty() {
            note = Some(format!("Categories: {}", categories.join(", ")));
          }
        }
        self.filter.category = category;
      }
      FilterChange::From(date) => self.filter.date_from = Some(date),
      FilterChange::To(date) => self.filter.date_to = Some(date),
      FilterChange::Clear => {
        self.filter = TransactionFilter {
          sort_by: self.filter.sort_by,
          order: self.filter.order,
          ..Default::default()
        };
      }
    }
    self.clamp_selection();

    let text = note.unwrap_or_else(|| {
      if self.filter.is_active() {
        format!("Filter: {}", self.filter.summary())
      } else {
        "Filter cleared".to_string()
      }
    });
    self.set_status(text, StatusKind::Info);
  }

  fn export_report(&mut self) {
    let outcome = match self.view_stack.last() {
      Some(ViewState::Reports {
        params,
        report: Some(report),
        ..
      }) => std::env::current_dir()
        .map_err(|e| eyre!("Failed to resolve current directory: {}", e))
        .and_then(|dir| export_csv(report, params, &dir)),
      _ => Err(eyre!("Open a loaded report to export")),
    };

    match outcome {
      Ok(path) => self.set_status(format!("Exported {}", path.display()), StatusKind::Success),
      Err(e) => self.set_status(e.to_string(), StatusKind::Error),
    }
  }

  fn request_delete(&mut self) {
    let target = match self.view_stack.last() {
      Some(ViewState::Groups {
        groups, selected, ..
      }) => groups
        .get(*selected)
        .map(|g| (PendingDelete::Group(g.id), g.name.clone())),
      _ => self
        .selected_transaction()
        .map(|t| (PendingDelete::Transaction(t.id), t.description().to_string())),
    };

    if let Some((target, label)) = target {
      self.set_status(format!("Delete '{}'? (y/n)", label), StatusKind::Info);
      self.pending_delete = Some(target);
    }
  }

  fn confirm_delete(&mut self, target: PendingDelete) {
    let pages = self.pages.clone();
    self.spawn(async move {
      match target {
        PendingDelete::Transaction(id) => {
          pages.delete_transaction(id).await?;
          Ok(PageEvent::Saved("Transaction deleted".to_string()))
        }
        PendingDelete::Group(id) => {
          pages.delete_group(id).await?;
          Ok(PageEvent::Saved("Group deleted".to_string()))
        }
      }
    });
  }

  fn handle_page_event(&mut self, event: PageEvent) {
    match event {
      PageEvent::DashboardLoaded(result) => {
        let cached_at = cache_stamp(&result);
        if let Some(ViewState::Dashboard { data, loading }) = self.view_stack.first_mut() {
          *data = Some(result.data);
          *loading = false;
          self.loaded_root(cached_at);
        }
      }
      PageEvent::TransactionsLoaded(result) => {
        let cached_at = cache_stamp(&result);
        if let Some(ViewState::Transactions {
          transactions,
          loading,
          ..
        }) = self.view_stack.first_mut()
        {
          *transactions = result.data;
          *loading = false;
          self.loaded_root(cached_at);
        }
      }
      PageEvent::ReportLoaded(for_params, result) => {
        let cached_at = cache_stamp(&result);
        if let Some(ViewState::Reports {
          params,
          report,
          page,
          loading,
        }) = self.view_stack.first_mut()
        {
          if *params == for_params {
            let total = ReportPage::of(&result.data.transactions, *page).total_pages;
            *page = (*page).clamp(1, total.max(1));
            *report = Some(result.data);
            *loading = false;
            self.loaded_root(cached_at);
          }
        }
      }
      PageEvent::StatisticsLoaded(for_params, result) => {
        let cached_at = cache_stamp(&result);
        if let Some(ViewState::Statistics {
          params,
          stats,
          loading,
        }) = self.view_stack.first_mut()
        {
          if *params == for_params {
            *stats = Some(result.data);
            *loading = false;
            self.loaded_root(cached_at);
          }
        }
      }
      PageEvent::GroupsLoaded(result) => {
        let cached_at = cache_stamp(&result);
        if let Some(ViewState::Groups {
          groups, loading, ..
        }) = self.view_stack.first_mut()
        {
          *groups = result.data;
          *loading = false;
          self.loaded_root(cached_at);
        }
      }
      PageEvent::GroupDetailLoaded(loaded) => {
        if let Some(ViewState::GroupDetail {
          detail, loading, ..
        }) = self.view_stack.last_mut()
        {
          if detail.group.id == loaded.group.id {
            *detail = loaded;
            *loading = false;
            self.clamp_selection();
            return;
          }
        }
        // Opened from the group list
        if matches!(self.view_stack.last(), Some(ViewState::Groups { .. })) {
          self.set_loading(false);
          self.search_filter.clear();
          self.view_stack.push(ViewState::GroupDetail {
            detail: loaded,
            selected: 0,
            loading: false,
          });
          self.cached_at = None;
        }
      }
      PageEvent::PayrollLoaded(loaded) => {
        if let Some(ViewState::Payroll {
          payroll, loading, ..
        }) = self.view_stack.first_mut()
        {
          *payroll = Some(loaded);
          *loading = false;
          self.loaded_root(None);
        }
      }
      PageEvent::Saved(message) => {
        info!("{}", message);
        self.set_status(message, StatusKind::Success);
        // Invalidated entries are gone, so a normal load goes to the network
        self.load_current(false);
      }
    }
  }

  fn loaded_root(&mut self, cached_at: Option<DateTime<Utc>>) {
    if self.view_stack.len() == 1 {
      self.cached_at = cached_at;
    }
    self.last_loaded = Some(Instant::now());
    self.clamp_selection();
  }

  fn search(&self) -> TransactionFilter {
    TransactionFilter {
      search: self.search_filter.clone(),
      ..self.filter.clone()
    }
  }

  /// Every transaction the top view holds, before filtering.
  fn loaded_transactions(&self) -> Vec<Transaction> {
    match self.view_stack.last() {
      Some(ViewState::Transactions { transactions, .. }) => transactions.clone(),
      Some(ViewState::GroupDetail { detail, .. }) => detail.transactions.clone(),
      _ => Vec::new(),
    }
  }

  /// Transactions of the top view after the search filter, type/category/date filters and ordering.
  pub fn visible_transactions(&self) -> Vec<Transaction> {
    match self.view_stack.last() {
      Some(ViewState::Transactions { transactions, .. }) => self.search().apply(transactions),
      Some(ViewState::GroupDetail { detail, .. }) => self.search().apply(&detail.transactions),
      _ => Vec::new(),
    }
  }

  fn selected_transaction(&self) -> Option<&Transaction> {
    let (rows, selected) = match self.view_stack.last()? {
      ViewState::Transactions {
        transactions,
        selected,
        ..
      } => (transactions, *selected),
      ViewState::GroupDetail {
        detail, selected, ..
      } => (&detail.transactions, *selected),
      _ => return None,
    };
    let id = self.visible_transactions().get(selected)?.id;
    rows.iter().find(|t| t.id == id)
  }

  fn selected_payment(&self) -> Option<&HayabusaPayment> {
    match self.view_stack.last()? {
      ViewState::Payroll {
        payroll: Some(payroll),
        selected,
        ..
      } => payroll.payments.get(*selected),
      _ => None,
    }
  }

  fn visible_len(&self) -> usize {
    match self.view_stack.last() {
      Some(ViewState::Transactions { .. }) | Some(ViewState::GroupDetail { .. }) => {
        self.visible_transactions().len()
      }
      Some(ViewState::Groups { groups, .. }) => groups.len(),
      Some(ViewState::Payroll {
        payroll: Some(payroll),
        ..
      }) => payroll.payments.len(),
      _ => 0,
    }
  }

  fn clamp_selection(&mut self) {
    let len = self.visible_len();
    if let Some(
      ViewState::Transactions { selected, .. }
      | ViewState::Groups { selected, .. }
      | ViewState::Payroll { selected, .. }
      | ViewState::GroupDetail { selected, .. },
    ) = self.view_stack.last_mut()
    {
      *selected = (*selected).min(len.saturating_sub(1));
    }
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.visible_len();
    if let Some(
      ViewState::Transactions { selected, .. }
      | ViewState::Groups { selected, .. }
      | ViewState::Payroll { selected, .. }
      | ViewState::GroupDetail { selected, .. },
    ) = self.view_stack.last_mut()
    {
      if len > 0 {
        *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
      }
    }
  }

  fn change_page(&mut self, delta: i32) {
    if let Some(ViewState::Reports {
      report: Some(report),
      page,
      ..
    }) = self.view_stack.last_mut()
    {
      let total = ReportPage::of(&report.transactions, *page).total_pages.max(1);
      let next = (*page as i32 + delta).clamp(1, total as i32);
      *page = next as usize;
    }
  }

  fn enter_selected(&mut self) {
    if let Some(ViewState::Groups {
      groups,
      selected,
      loading,
    }) = self.view_stack.last_mut()
    {
      if let Some(group) = groups.get(*selected) {
        *loading = true;
        let id = group.id;
        let pages = self.pages.clone();
        self.spawn(async move {
          pages
            .group_detail(id)
            .await
            .map(|d| PageEvent::GroupDetailLoaded(Box::new(d)))
        });
      }
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn api_url(&self) -> &str {
    self.pages.api().base_url().as_str()
  }

  /// When the root view's cached data was fetched, if it came from the cache.
  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    self.cached_at.filter(|_| self.view_stack.len() == 1)
  }

  /// Active list filters, if any.
  pub fn filter_summary(&self) -> Option<String> {
    let summary = self.filter.summary();
    (!summary.is_empty()).then_some(summary)
  }

  pub fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}

fn is_hayabusa(user: &User) -> bool {
  user.role.as_deref() == Some(HAYABUSA_ROLE)
}

/// Fetch time to show when a result was served from the cache.
fn cache_stamp<T>(result: &CacheResult<T>) -> Option<DateTime<Utc>> {
  if result.is_cached() {
    result.fetched_at
  } else {
    None
  }
}

impl ViewState {
  /// Get the label for this view in the breadcrumb
  fn breadcrumb_label(&self) -> String {
    match self {
      ViewState::Dashboard { .. } => "Dashboard".to_string(),
      ViewState::Transactions { .. } => "Transactions".to_string(),
      ViewState::Reports { params, .. } => format!("Reports [{}]", params),
      ViewState::Statistics { params, .. } => format!("Statistics [{}]", params),
      ViewState::Groups { .. } => "Groups".to_string(),
      ViewState::Payroll { .. } => "Payroll".to_string(),
      ViewState::GroupDetail { detail, .. } => detail.group.name.clone(),
    }
  }
}

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::types::{Report, ReportParams, Transaction, TransactionGroup};
use crate::api::ApiError;
use crate::cache::CacheResult;
use crate::pages::{DashboardData, GroupDetail, Payroll, Statistics};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and status expiry
  Tick,
  /// A spawned load or write finished
  Page(PageEvent),
  /// A spawned load or write failed
  Failed(ApiError),
}

/// Results delivered by background tasks
#[derive(Debug)]
pub enum PageEvent {
  DashboardLoaded(CacheResult<DashboardData>),
  TransactionsLoaded(CacheResult<Vec<Transaction>>),
  ReportLoaded(ReportParams, CacheResult<Report>),
  StatisticsLoaded(ReportParams, CacheResult<Statistics>),
  GroupsLoaded(CacheResult<Vec<TransactionGroup>>),
  GroupDetailLoaded(Box<GroupDetail>),
  PayrollLoaded(Box<Payroll>),
  /// A write succeeded; the message is shown in the status bar
  Saved(String),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let input_tx = tx.clone();

    // Crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if input_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks to report back on
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

//! Persisted client storage for the login session.

mod schema;

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::api::types::User;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Token and user of the current login, kept across runs.
pub struct SessionStore {
  conn: Mutex<Connection>,
}

impl SessionStore {
  /// Open or create the store at the default location
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open or create the store at `path`
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open session store at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("vertinova").join("session.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  fn read(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM session WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read session value {}: {}", key, e))
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO session (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write session value {}: {}", key, e))?;
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM session WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete session value {}: {}", key, e))?;
    Ok(())
  }

  /// Stored bearer token
  pub fn token(&self) -> Result<Option<String>> {
    self.read(TOKEN_KEY)
  }

  /// Stored user. An undecodable user is removed and reported as absent.
  pub fn user(&self) -> Result<Option<User>> {
    let Some(raw) = self.read(USER_KEY)? else {
      return Ok(None);
    };

    match serde_json::from_str(&raw) {
      Ok(user) => Ok(Some(user)),
      Err(e) => {
        tracing::warn!("Discarding unreadable stored user: {}", e);
        self.delete(USER_KEY)?;
        Ok(None)
      }
    }
  }

  pub fn set_token(&self, token: &str) -> Result<()> {
    self.write(TOKEN_KEY, token)
  }

  pub fn set_user(&self, user: &User) -> Result<()> {
    let json = serde_json::to_string(user).map_err(|e| eyre!("Failed to serialize user: {}", e))?;
    self.write(USER_KEY, &json)
  }

  /// Persist a fresh login
  pub fn save(&self, token: &str, user: &User) -> Result<()> {
    self.set_token(token)?;
    self.set_user(user)
  }

  /// Forget the login
  pub fn clear(&self) -> Result<()> {
    self.delete(TOKEN_KEY)?;
    self.delete(USER_KEY)
  }
}

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{FreshnessPolicy, Namespace};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to "Vertinova Finance")
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Server root; requests go to `<url>/api/...`
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Email used when logging in with VERTINOVA_PASSWORD
  pub email: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      email: None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_api_url() -> String {
  "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Per-namespace max age overrides in seconds
  #[serde(default)]
  pub max_age_secs: BTreeMap<Namespace, u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter when RUST_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for log files (defaults to the data directory)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./vertinova.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/vertinova/config.yaml
  ///
  /// Without any file, defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("vertinova.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("vertinova").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("Vertinova Finance")
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn freshness_policy(&self) -> FreshnessPolicy {
    FreshnessPolicy::from_overrides(&self.cache.max_age_secs)
  }

  /// Pre-issued bearer token from VERTINOVA_TOKEN, if set.
  pub fn get_token() -> Option<String> {
    std::env::var("VERTINOVA_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Get the login password from environment variables.
  ///
  /// Checks VERTINOVA_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("VERTINOVA_PASSWORD").map_err(|_| {
      eyre!("Password not found. Set VERTINOVA_PASSWORD environment variable to log in.")
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, "http://localhost:8000");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.log.level, "info");
    assert_eq!(config.title(), "Vertinova Finance");
  }

  #[test]
  fn test_parse_full_config() {
    let yaml = r#"
api:
  url: https://finance.example.com
  email: owner@example.com
  timeout_secs: 10
title: Kas Toko
cache:
  max_age_secs:
    dashboard: 120
    transactionGroups: 600
log:
  level: debug
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.api.url, "https://finance.example.com");
    assert_eq!(config.api.email.as_deref(), Some("owner@example.com"));
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.title(), "Kas Toko");
    assert_eq!(config.log.level, "debug");

    let policy = config.freshness_policy();
    assert_eq!(policy.max_age(Namespace::Dashboard), Duration::from_secs(120));
    assert_eq!(
      policy.max_age(Namespace::TransactionGroups),
      Duration::from_secs(600)
    );
    assert_eq!(policy.max_age(Namespace::Transactions), Duration::from_secs(180));
  }

  #[test]
  fn test_unknown_namespace_is_rejected() {
    let yaml = "cache:\n  max_age_secs:\n    groups: 60\n";
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let result = Config::load(Some(Path::new("/nonexistent/vertinova.yaml")));
    assert!(result.is_err());
  }
}

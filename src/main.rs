mod api;
mod app;
mod cache;
mod commands;
mod config;
mod db;
mod event;
mod format;
mod logging;
mod mutations;
mod pages;
mod ui;

use api::types::User;
use api::{ApiClient, ApiError};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "vertinova")]
#[command(about = "A terminal client for Vertinova Finance")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/vertinova/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Email to log in with (password from VERTINOVA_PASSWORD)
  #[arg(short, long)]
  email: Option<String>,

  /// Server root, e.g. https://finance.example.com
  #[arg(short, long)]
  api_url: Option<String>,

  /// Log out and forget the stored session
  #[arg(long)]
  logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Command line overrides
  if let Some(url) = args.api_url {
    config.api.url = url;
  }
  if let Some(email) = args.email {
    config.api.email = Some(email);
  }

  let _log_guard = logging::init_logging(&config.log)?;

  let session = Arc::new(db::SessionStore::open()?);
  let client = ApiClient::new(&config, session.clone())?;

  if args.logout {
    if let Err(e) = client.logout().await {
      warn!("Remote logout failed: {}", e);
    }
    println!("Logged out.");
    return Ok(());
  }

  if let Some(token) = Config::get_token() {
    client.set_token(&token)?;
  }

  let user = match authenticate(&client, &config).await? {
    Some(user) => Some(user),
    None => session.user()?,
  };

  // Initialize and run the app
  let mut app = app::App::new(config, client, user.as_ref());
  if let Some(message) = app.run().await? {
    eprintln!("{}", message);
  }

  Ok(())
}

/// Make sure the client holds a working token, logging in when needed.
///
/// Returns the verified user, or `None` when the server could not be reached.
async fn authenticate(client: &ApiClient, config: &Config) -> Result<Option<User>> {
  if client.has_token() {
    match client.current_user().await {
      Ok(user) => {
        info!(user = %user.email, "Resumed session");
        return Ok(Some(user));
      }
      Err(e) if e.is_auth() => info!("Stored session is no longer valid"),
      // The UI reports connectivity problems per request
      Err(e) => {
        warn!("Could not verify session: {}", e);
        return Ok(None);
      }
    }
  }

  let email = config
    .api
    .email
    .as_deref()
    .ok_or_else(|| eyre!("Not logged in. Pass --email or set api.email in the config file."))?;
  let password = Config::get_password()?;

  match client.login(email, &password).await {
    Ok(user) => {
      info!(user = %user.email, "Logged in");
      Ok(Some(user))
    }
    Err(ApiError::Validation { message, .. }) | Err(ApiError::Status { message, .. }) => {
      Err(eyre!("Login failed: {}", message))
    }
    Err(e) => Err(eyre!("Login failed: {}", e)),
  }
}

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Log to a daily rolling file; the terminal belongs to the UI.
///
/// The returned guard flushes pending lines when dropped, so keep it alive
/// until the app exits.
pub fn init_logging(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = log_dir(config)?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "vertinova.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!("Logging initialized with level: {}", config.level);
  Ok(guard)
}

fn log_dir(config: &LogConfig) -> Result<PathBuf> {
  if let Some(dir) = &config.dir {
    return Ok(dir.clone());
  }
  let data_dir = dirs::data_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(data_dir.join("vertinova").join("logs"))
}

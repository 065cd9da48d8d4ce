//! Tracing setup: human-readable logs on stderr, optionally mirrored to a file.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding the log filter, e.g. `OHDEAR_LOG=ohdear_tasks=debug`.
pub const LOG_ENV: &str = "OHDEAR_LOG";

/// Initialize logging.
///
/// The filter comes from OHDEAR_LOG, then `default_level`, then `info`.
/// The returned guard must be held until exit so buffered file output is flushed.
pub fn init(default_level: Option<&str>, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(default_level.unwrap_or("info")))
    .map_err(|e| eyre!("Invalid log filter: {}", e))?;

  let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
  let registry = Registry::default().with(filter).with(stderr);

  match file {
    Some(path) => {
      let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;

      let appender = tracing_appender::rolling::never(directory, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

      registry
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      registry
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::storage::{ensure_state_dir, log_file_path};

const LOG_ENV: &str = "GURL_LOG";

/// Installs a file-backed tracing subscriber.
///
/// The terminal belongs to the UI, so events go to `gurl.log` in the state
/// directory. `GURL_LOG` overrides the configured level.
pub fn init(default_level: &str) -> Result<(), String> {
    let _ = ensure_state_dir()?;
    let path = log_file_path().ok_or("Could not resolve log file path")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))
}

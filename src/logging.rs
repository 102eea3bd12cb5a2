use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::TouchError;

/// Environment variable holding the log filter, e.g. `TOUCHMASTER_LOG=debug`
pub const LOG_ENV: &str = "TOUCHMASTER_LOG";

/// Send tracing output to `path`. The terminal belongs to the TUI.
pub fn init_file_logging(path: &Path) -> Result<(), TouchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| TouchError::Logging(e.to_string()))
}

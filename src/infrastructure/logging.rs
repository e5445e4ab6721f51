use crate::infrastructure::error::InfraError;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE_NAME: &str = "breaksync.log";
const DEFAULT_FILTER: &str = "info";

/// Local-time timestamps for both log layers.
struct LocalTimer;

impl fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Installs the global subscriber: stderr plus an append-only file in `logs_dir`.
///
/// `RUST_LOG` overrides the default `info` filter. Falls back to stderr only
/// when the log file cannot be opened.
pub fn init_logging(logs_dir: &Path) -> Result<(), InfraError> {
    fs::create_dir_all(logs_dir)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTimer);

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE_NAME))
        .ok();

    let result = match log_file {
        Some(file) => {
            let file_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_timer(LocalTimer)
                .with_ansi(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init(),
    };

    result.map_err(|error| InfraError::InvalidConfig(format!("logging already initialized: {error}")))
}

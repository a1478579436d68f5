//! Structured logging and tracing for Night Charger
//!
//! `init_logging` installs the process subscriber once at startup. Engine
//! components never look a logger up globally: each receives a
//! [`StructuredLogger`] by reference in its constructor and derives a
//! component-scoped child from it.

use crate::config::LoggingConfig;
use crate::error::{NightChargerError, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, info};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub mod level;
mod structured;

pub use level::parse_log_level;
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

// File writer guard lives as long as the process
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        if let Err(e) = install_subscriber(config) {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(NightChargerError::config(err.clone()));
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("night_charger={}", level.as_str().to_lowercase()))
    })
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("NIGHT_CHARGER_DISABLE_FILE_LOG").is_some()
}

fn install_subscriber(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = build_env_filter(level);

    let console_layer = config.console_output.then(|| {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if config.json_format {
            base.json().boxed()
        } else {
            base.boxed()
        }
    });

    let file_layer = match config.file.as_deref() {
        Some(file) if !should_use_console_only() => {
            // A path with an extension names a file; use its parent directory
            let p = Path::new(file);
            let dir = if p.extension().is_some() {
                p.parent().unwrap_or(p)
            } else {
                p
            };
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix("night-charger")
                .filename_suffix("log")
                .max_log_files(config.backup_count.max(1) as usize)
                .build(dir)
                .map_err(|e| {
                    NightChargerError::io(format!("Failed to create log file appender: {e}"))
                })?;
            let (writer, guard) = non_blocking(appender);
            let _ = LOG_GUARD.set(guard);

            let base = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false);
            Some(if config.json_format {
                base.json().boxed()
            } else {
                base.boxed()
            })
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| NightChargerError::config(format!("Failed to install subscriber: {e}")))?;

    info!(
        "Logging initialized - level: {}, file: {}",
        level,
        config.file.as_deref().unwrap_or("none")
    );
    Ok(())
}

//! Log output setup.
//!
//! Journald is preferred when the process runs under systemd; anywhere
//! else, log lines go to a daily file under the local data directory.
//! The `PIXARC_LOG` variable selects the level filter.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the background log writer alive. Hold it for the lifetime of
/// the process; dropping it flushes pending lines.
pub struct LogGuard {
    _file_writer: Option<WorkerGuard>,
}

fn level_filter() -> EnvFilter {
    EnvFilter::try_from_env("PIXARC_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pixarc")
        .join("logs")
}

pub fn init(log_dir: Option<PathBuf>) -> Result<LogGuard> {
    #[cfg(target_os = "linux")]
    if let Ok(journald) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(level_filter())
            .with(journald)
            .init();

        tracing::debug!("logging to journald");
        return Ok(LogGuard { _file_writer: None });
    }

    let dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "pixarc.log"));

    tracing_subscriber::registry()
        .with(level_filter())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    tracing::debug!("logging to {}", dir.display());
    Ok(LogGuard {
        _file_writer: Some(guard),
    })
}

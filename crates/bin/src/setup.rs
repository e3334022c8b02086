//! Process setup: logging and deployment environment.

use clap::ValueEnum;
use hobart::backtest::BacktestEnvironment;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` takes precedence over `level`.
pub(crate) fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Read `HOBART_PROJECT_ROOT` and `HOBART_NOTIFY_EMAIL`, loading `.env` first.
pub(crate) fn load_environment() -> BacktestEnvironment {
    dotenvy::dotenv().ok();
    BacktestEnvironment {
        project_root: std::env::var_os("HOBART_PROJECT_ROOT").map(PathBuf::from),
        notify_email: std::env::var("HOBART_NOTIFY_EMAIL")
            .ok()
            .filter(|email| !email.trim().is_empty()),
    }
}

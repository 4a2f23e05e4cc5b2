//! Process-wide tracing setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global subscriber is already installed")]
    AlreadyInitialized,
}

/// Installs the global subscriber and routes `log` records into it.
///
/// `filter` uses `EnvFilter` directive syntax. When `None`, `RUST_LOG` is
/// consulted and falls back to `info,patentflow=debug`.
pub fn init_logging(format: LogFormat, filter: Option<&str>) -> Result<(), LoggingError> {
    let env_filter = build_filter(filter)?;

    let result = match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            Registry::default()
                .with(env_filter)
                .with(fmt::layer().with_target(true)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            Registry::default()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true)),
        ),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)?;

    // The repository layer logs through `log`.
    tracing_log::LogTracer::init().map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(())
}

fn build_filter(filter: Option<&str>) -> Result<EnvFilter, LoggingError> {
    match filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
                filter: directives.to_string(),
                reason: e.to_string(),
            })
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,patentflow=debug"))),
    }
}

//! # Structured Logging
//!
//! Installs the `tracing` subscriber with a pretty or JSON format and
//! `RUST_LOG`-driven filtering. The library itself only emits events; the
//! embedding application decides whether and how they are printed.
//!
//! Output goes to stderr so stdout stays free for command output such as
//! resolved documents.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{BtcoError, BtcoResult};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for local development.
    #[default]
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) is JSON; anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

impl FromStr for LogFormat {
    type Err = BtcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(BtcoError::InvalidInput(format!("unknown log format '{other}'"))),
        }
    }
}

/// Install the global subscriber, failing if one is already set.
///
/// `default_level` applies when `RUST_LOG` is unset, e.g. `"info"` or
/// `"btco_protocol=debug"`:
///
/// ```text
/// RUST_LOG=btco_protocol::inscription=debug,btco_protocol=info
/// ```
pub fn try_init_logging(default_level: &str, format: LogFormat) -> BtcoResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };
    installed.map_err(|e| BtcoError::InvalidInput(format!("logging already initialized: {e}")))?;

    tracing::info!("logging initialized (format={:?})", format);
    Ok(())
}

/// Like [`try_init_logging`], but a second call is a no-op instead of an
/// error. Convenient in tests and examples.
pub fn init_logging(default_level: &str, format: LogFormat) {
    if try_init_logging(default_level, format).is_err() {
        tracing::debug!("logging was already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("whatever"), LogFormat::Pretty);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn second_initialization_is_harmless() {
        init_logging("warn", LogFormat::Pretty);
        init_logging("warn", LogFormat::Json);
        assert!(try_init_logging("warn", LogFormat::Json).is_err());
    }
}

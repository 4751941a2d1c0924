// crates/observability/src/lib.rs
//! Tracing setup shared by the jobcast binaries.
//!
//! Installs a `tracing_subscriber` registry with an `EnvFilter`, a stderr
//! formatter (pretty, compact or JSON) and, when a log directory is given, a
//! daily-rolling JSON file written through a non-blocking appender.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor explicit directives are set.
pub const DEFAULT_DIRECTIVES: &str = "info,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Explicit filter directives. Falls back to `RUST_LOG`, then
    /// [`DEFAULT_DIRECTIVES`].
    pub directives: Option<String>,
    /// Also write JSON logs to a daily-rolling file in this directory.
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            directives: None,
            log_dir: None,
            file_prefix: "jobcast.log".to_string(),
        }
    }
}

/// Keeps the file appender flushing. Hold it for the life of the process.
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the filter from explicit directives, `RUST_LOG`, or the default.
pub fn build_filter(directives: Option<&str>) -> Result<EnvFilter> {
    match directives {
        Some(d) => EnvFilter::try_new(d).with_context(|| format!("invalid log filter '{d}'")),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))),
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_tracing(config: &LogConfig) -> Result<TracingGuard> {
    let filter = build_filter(config.directives.as_deref())?;

    let stderr = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .pretty()
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .boxed(),
    };

    let (file, file_guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(format = %config.format, file_logging = config.log_dir.is_some(), "tracing initialised");

    Ok(TracingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_build_filter_explicit_directives() {
        assert!(build_filter(Some("debug,hyper=warn")).is_ok());
        assert!(build_filter(Some("jobcast=notalevel")).is_err());
    }

    #[test]
    fn test_init_tracing_with_file_then_reinit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            format: LogFormat::Compact,
            directives: Some("info".into()),
            log_dir: Some(dir.path().join("logs")),
            ..LogConfig::default()
        };

        let _guard = init_tracing(&config).expect("first init succeeds");
        assert!(dir.path().join("logs").is_dir());
        assert!(init_tracing(&config).is_err());
    }
}

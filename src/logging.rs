//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the level comes from the `-v` count.
//! `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_DIR` pick how and where events go.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    Compact,
    /// Multi-line, with source locations.
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily rolling file under `log_dir`.
    File,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub log_dir: PathBuf,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: &'static str,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            default_level: "info",
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_DIR`.
    /// Unrecognized values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            format: env_choice("LOG_FORMAT").unwrap_or(defaults.format),
            output: env_choice("LOG_OUTPUT").unwrap_or(defaults.output),
            log_dir: env::var_os("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            default_level: defaults.default_level,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.default_level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        self
    }
}

fn env_choice<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

/// Install the global subscriber. The returned guard flushes pending events
/// when dropped, so `main` holds it until exit.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level));

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).with_context(|| {
                format!("failed to create log directory {:?}", config.log_dir)
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(
                &config.log_dir,
                env!("CARGO_PKG_NAME"),
            ))
        }
    };

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(config.output == LogOutput::Stderr)
            .with_filter(filter)
            .boxed(),
    };
    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(format = %config.format, output = %config.output, "logging initialized");
    Ok(guard)
}

/// Span wrapping one subcommand run.
pub fn operation_span(name: &'static str) -> tracing::Span {
    tracing::info_span!(
        "operation",
        operation.name = name,
        tool = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION")
    )
}

/// Span wrapping the processing of one input document.
pub fn document_span(path: &Path) -> tracing::Span {
    tracing::info_span!("document", path = %path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("file".parse::<LogOutput>().ok(), Some(LogOutput::File));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        unsafe {
            env::set_var("LOG_FORMAT", "json");
            env::set_var("LOG_OUTPUT", "stdout");
            env::set_var("LOG_DIR", "/var/log/dcp");
        }

        let config = LoggingConfig::from_env();

        unsafe {
            env::remove_var("LOG_FORMAT");
            env::remove_var("LOG_OUTPUT");
            env::remove_var("LOG_DIR");
        }
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stdout);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/dcp"));
    }

    #[test]
    #[serial]
    fn unknown_env_values_keep_defaults() {
        unsafe {
            env::set_var("LOG_FORMAT", "yaml");
        }

        let config = LoggingConfig::from_env();

        unsafe {
            env::remove_var("LOG_FORMAT");
        }
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(LoggingConfig::default().default_level, "info");
        assert_eq!(LoggingConfig::default().with_verbosity(1).default_level, "debug");
        assert_eq!(LoggingConfig::default().with_verbosity(3).default_level, "trace");
    }
}

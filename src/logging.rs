//! Logging System
//!
//! Structured logging via `tracing`. Level, format, and destination come
//! from configuration with `ANCHORAGE_LOG*` environment overrides.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::SessionError;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: "text" or "json".
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: "stderr" or "file".
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file".
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Colored output (text format on a terminal only).
    #[serde(default = "default_color")]
    pub color: bool,

    /// Module-specific level directives, e.g. `anchorage::lifecycle=debug`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_file() -> PathBuf {
    PathBuf::from("anchorage.log")
}

fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: default_file(),
            color: default_color(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the global subscriber.
///
/// Precedence, highest first: `ANCHORAGE_LOG` / `ANCHORAGE_LOG_FORMAT` /
/// `ANCHORAGE_LOG_OUTPUT` environment variables, then the passed config,
/// then defaults. Logs go to stderr so CLI output stays clean on stdout.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), SessionError> {
    let filter = build_env_filter(config)?;
    let format = env_or(config, "ANCHORAGE_LOG_FORMAT", |c| c.format.clone(), default_format);
    let output = env_or(config, "ANCHORAGE_LOG_OUTPUT", |c| c.output.clone(), default_output);

    if format != "text" && format != "json" {
        return Err(SessionError::Config(format!(
            "invalid log format: {} (must be 'text' or 'json')",
            format
        )));
    }

    let base = Registry::default().with(filter);
    let use_color = config.map(|c| c.color).unwrap_or(true);

    match output.as_str() {
        "file" => {
            let path = config.map(|c| c.file.clone()).unwrap_or_else(default_file);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        SessionError::Config(format!("failed to create log directory: {}", e))
                    })?;
                }
            }
            let writer = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    SessionError::Config(format!("failed to open log file {:?}: {}", path, e))
                })?;
            if format == "json" {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(writer),
                )
                .init();
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            }
        }
        "stderr" => {
            if format == "json" {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stderr),
                )
                .init();
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(use_color)
                        .with_writer(std::io::stderr),
                )
                .init();
            }
        }
        other => {
            return Err(SessionError::Config(format!(
                "invalid log output: {} (must be 'stderr' or 'file')",
                other
            )));
        }
    }

    Ok(())
}

fn env_or(
    config: Option<&LoggingConfig>,
    var: &str,
    pick: impl Fn(&LoggingConfig) -> String,
    fallback: impl Fn() -> String,
) -> String {
    std::env::var(var)
        .ok()
        .or_else(|| config.map(&pick))
        .unwrap_or_else(fallback)
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, SessionError> {
    if let Ok(filter) = EnvFilter::try_from_env("ANCHORAGE_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(directive.parse().map_err(|e| {
                SessionError::Config(format!("invalid log directive '{}': {}", directive, e))
            })?);
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_log_text_to_stderr() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
        assert_eq!(config.output, "stderr");
        assert!(config.color);
    }

    #[test]
    fn module_directives_build_a_filter() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("anchorage::lifecycle".to_string(), "debug".to_string());
        assert!(build_env_filter(Some(&config)).is_ok());
    }

    #[test]
    fn bad_module_directive_is_rejected() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("an invalid module!".to_string(), "debug".to_string());
        assert!(build_env_filter(Some(&config)).is_err());
    }
}

//! Logging infrastructure for Watchpost.
//!
//! This module provides structured logging using the tracing ecosystem.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events pass the default filter.
const DEFAULT_TARGETS: [&str; 4] = ["wp_core", "wp_api", "wp_cli", "tower_http"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include thread IDs.
    pub include_thread_ids: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_spans: true,
            include_location: true,
            include_thread_ids: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }

    /// Builds a configuration from a level name such as `"debug"`.
    ///
    /// Unknown names fall back to `INFO`.
    pub fn from_level_name(level: &str, json_format: bool) -> Self {
        let level = level.parse::<Level>().unwrap_or(Level::INFO);
        let base = if json_format {
            Self::production()
        } else {
            Self::default()
        };
        Self { level, ..base }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        DEFAULT_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
///
/// `RUST_LOG` overrides the configured level when set. Calling this more
/// than once is a no-op.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

//! # wp-observability
//!
//! Logging and metrics infrastructure for Watchpost.
//!
//! This crate configures structured logging with `tracing-subscriber` and
//! registers the Prometheus metrics recorded by the API server.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{install_prometheus_recorder, register_metrics, MetricsError};

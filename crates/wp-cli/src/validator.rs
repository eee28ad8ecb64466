//! Startup validation of the Watchpost configuration.

use crate::config::{AppConfig, DEFAULT_JWT_SECRET};
use colored::Colorize;
use wp_core::auth::parse_ttl;
use wp_core::db::DbBackend;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent startup.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_auth(config, &mut result);
        Self::validate_rate_limit(config, &mut result);
        Self::validate_server(config, &mut result);
        Self::validate_database_url(config, &mut result);
        Self::validate_feed(config, &mut result);

        result
    }

    fn validate_auth(config: &AppConfig, result: &mut ValidationResult) {
        let secret = config.auth.jwt_secret.trim();
        if secret.is_empty() {
            result.add_error("auth.jwt_secret is empty. Set JWT_SECRET or auth.jwt_secret.");
        } else if secret == DEFAULT_JWT_SECRET {
            result.add_warning(
                "auth.jwt_secret is the development default. Set JWT_SECRET before deploying.",
            );
        }

        if let Err(e) = parse_ttl(&config.auth.token_ttl) {
            result.add_error(format!("auth.token_ttl: {}", e));
        }
    }

    fn validate_rate_limit(config: &AppConfig, result: &mut ValidationResult) {
        if config.rate_limit.requests == 0 {
            result.add_error("rate_limit.requests must be greater than 0");
        }
        if config.rate_limit.window_secs == 0 {
            result.add_error("rate_limit.window_secs must be greater than 0");
        }
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        if config.server.cors_origins.iter().any(|o| o == "*") {
            result.add_warning("CORS allows any origin (*).");
        }
        if config.server.cors_origins.is_empty() {
            result.add_warning("No CORS origins configured; browsers will be refused.");
        }
    }

    fn validate_database_url(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = DbBackend::from_url(&config.database.url) {
            result.add_error(format!("database.url: {}", e));
        }
    }

    fn validate_feed(config: &AppConfig, result: &mut ValidationResult) {
        if config.feed.simulate {
            result.add_warning(
                "Log feed simulator is enabled; the live feed includes synthetic entries.",
            );
            if config.feed.interval_ms == 0 {
                result.add_error("feed.interval_ms must be greater than 0 when simulating");
            }
        }
    }
}

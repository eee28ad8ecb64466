//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use wp_api::rate_limit::ApiRateLimiter;
use wp_api::{ApiServer, ApiServerConfig, AppState};
use wp_core::auth::parse_ttl;
use wp_core::db::{create_pool, ensure_admin_user, run_migrations};
use wp_core::feed::spawn_simulator;
use wp_core::{LogFeed, TokenService};
use wp_observability::metrics::install_prometheus_recorder;

use crate::config::AppConfig;

/// Builds the listen address from the server section.
pub fn bind_address(config: &AppConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })
}

/// Runs the API server until Ctrl+C or SIGTERM.
pub async fn run_server(config: AppConfig) -> Result<()> {
    println!("{} Starting Watchpost API Server...", "[server]".cyan());

    let redacted = config.redact_secrets();
    println!("  {} Database: {}", "→".green(), redacted.database.url);
    let db_pool = create_pool(&config.database.url)
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    println!("  {} Migrations complete", "✓".green());

    if let Some(admin) = ensure_admin_user(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to seed admin user")?
    {
        println!("  {} Created admin user {}", "✓".green(), admin.email.bold());
        if admin.generated {
            println!(
                "  {} Generated password (shown once): {}",
                "!".yellow(),
                admin.password.bold()
            );
        }
    }

    let ttl = parse_ttl(&config.auth.token_ttl).context("Invalid auth.token_ttl")?;
    let tokens = TokenService::new(&config.auth.jwt_secret, ttl);
    let feed = Arc::new(LogFeed::new(config.feed.history));

    let rate_limiter = ApiRateLimiter::new(
        config.rate_limit.requests,
        Duration::from_secs(config.rate_limit.window_secs),
    )
    .context("Invalid rate limit configuration")?;

    let mut state = AppState::new(db_pool, tokens, feed.clone()).with_rate_limiter(rate_limiter);
    match install_prometheus_recorder() {
        Ok(handle) => state = state.with_prometheus_handle(handle),
        Err(e) => warn!(error = %e, "Prometheus metrics disabled"),
    }

    let simulator = config.feed.simulate.then(|| {
        spawn_simulator(
            feed.clone(),
            Duration::from_millis(config.feed.interval_ms),
        )
    });

    let bind_address = bind_address(&config)?;
    let server_config = ApiServerConfig {
        bind_address,
        enable_swagger: config.server.enable_swagger,
        cors_origins: config.server.cors_origins.clone(),
    };

    println!();
    println!("{}", "Watchpost API Server".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!(
        "  {} {}",
        "Log simulator:".cyan(),
        if simulator.is_some() { "on" } else { "off" }
    );
    if config.server.enable_swagger {
        println!(
            "  {} http://{}/swagger-ui",
            "Swagger UI:".cyan(),
            bind_address
        );
    }

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  POST /api/v1/auth/login             - Obtain a token");
    println!("  GET  /api/v1/incidents              - List incidents");
    println!("  GET  /api/v1/threats                - List threats");
    println!("  GET  /api/v1/alerts                 - Alert inbox");
    println!("  GET  /api/v1/dashboard/metrics      - Dashboard summary");
    println!("  GET  /api/v1/logs/stream            - Live log WebSocket");
    println!("  GET  /health                        - Health check");
    println!("  GET  /metrics                       - Prometheus metrics");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let result = ApiServer::new(state, server_config)
        .run()
        .await
        .context("Server error");

    if let Some(handle) = simulator {
        handle.abort();
    }

    result?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 4100;
        assert_eq!(
            bind_address(&config).unwrap(),
            "127.0.0.1:4100".parse::<SocketAddr>().unwrap()
        );

        config.server.host = "not a host".to_string();
        assert!(bind_address(&config).is_err());
    }
}

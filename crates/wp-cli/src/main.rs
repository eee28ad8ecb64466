//! Watchpost CLI
//!
//! Command-line interface for the Watchpost SOC dashboard backend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use commands::run_server;
use config::AppConfig;
use validator::ConfigValidator;
use wp_observability::logging::{init_logging_with_config, LoggingConfig};

#[derive(Parser)]
#[command(name = "watchpost")]
#[command(version)]
#[command(about = "Security operations dashboard backend", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Database URL (sqlite:// or postgres://)
        #[arg(short, long)]
        database: Option<String>,

        /// Disable Swagger UI
        #[arg(long)]
        no_swagger: bool,

        /// Do not publish simulated log entries
        #[arg(long)]
        no_simulator: bool,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Validate configuration
    Validate,

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Score a description with the keyword threat heuristic
    Score {
        /// Incident description
        #[arg(required = true)]
        description: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;
    config.apply_env();

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging_with_config(LoggingConfig::from_level_name(
        level,
        config.logging.json || cli.format == OutputFormat::Json,
    ));

    if cli.verbose {
        eprintln!("Configuration: {}", config_path.display());
    }

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            no_swagger,
            no_simulator,
            validate_only,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(database) = database {
                config.database.url = database;
            }
            if no_swagger {
                config.server.enable_swagger = false;
            }
            if no_simulator {
                config.feed.simulate = false;
            }
            cmd_serve(config, validate_only).await
        }
        Commands::Validate => cmd_validate(&config, &config_path),
        Commands::Config { show_secrets } => cmd_config(&config, show_secrets, cli.format),
        Commands::Score { description } => cmd_score(&description.join(" "), cli.format),
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("io", "watchpost", "watchpost") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/watchpost.yaml")
    }
}

async fn cmd_serve(config: AppConfig, validate_only: bool) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    if validate_only {
        println!();
        println!(
            "{}",
            "Configuration is valid. Server can be started."
                .green()
                .bold()
        );
        return Ok(());
    }

    println!();
    run_server(config).await
}

fn cmd_validate(config: &AppConfig, config_path: &std::path::Path) -> Result<()> {
    println!(
        "{} {}",
        "Validating".cyan(),
        if config_path.exists() {
            config_path.display().to_string()
        } else {
            "defaults (no config file found)".to_string()
        }
    );

    let result = ConfigValidator::validate(config);
    result.print();

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let shown = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => print!("{}", serde_yaml::to_string(&shown)?),
    }
    Ok(())
}

fn cmd_score(description: &str, format: OutputFormat) -> Result<()> {
    let assessment = wp_core::assess(description);

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "severity": assessment.severity,
                "confidence": assessment.confidence,
                "rationale": assessment.rationale,
            }))?
        );
        return Ok(());
    }

    let severity = assessment.severity.to_string();
    let colored_severity = match assessment.severity {
        wp_core::Severity::Critical => severity.red().bold(),
        wp_core::Severity::High => severity.red(),
        wp_core::Severity::Medium => severity.yellow(),
        wp_core::Severity::Low | wp_core::Severity::Info => severity.green(),
    };

    println!("{} {}", "Severity:".bold(), colored_severity);
    println!("{} {:?}", "Confidence:".bold(), assessment.confidence);
    println!("{} {}", "Rationale:".bold(), assessment.rationale);
    Ok(())
}

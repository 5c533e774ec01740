//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Hydrosync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Hydrosync - EPANET / SWMM result exporter
#[derive(Parser, Debug)]
#[command(name = "hydrosync")]
#[command(version, about, long_about = None)]
#[command(author = "Hydrosync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hydrosync.toml", env = "HYDROSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HYDROSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export one simulation run to the report database or a FROST server
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Check connectivity of the configured targets
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::ExportTarget;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["hydrosync", "export"]);
        assert_eq!(cli.config, "hydrosync.toml");
        assert!(matches!(cli.command, Commands::Export(_)));
    }

    #[test]
    fn test_cli_parse_export_overrides() {
        let cli = Cli::parse_from([
            "hydrosync",
            "export",
            "--target",
            "frost",
            "--result-id",
            "run_7",
            "--topology",
            "net.json",
            "--results",
            "res.json",
            "--dry-run",
            "--start-time",
            "2024-03-01T06:00:00Z",
        ]);
        let Commands::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.target, Some(ExportTarget::Frost));
        assert_eq!(args.result_id.as_deref(), Some("run_7"));
        assert_eq!(args.topology.as_deref(), Some("net.json"));
        assert_eq!(args.results.as_deref(), Some("res.json"));
        assert!(args.dry_run);
        assert_eq!(args.start_time.as_deref(), Some("2024-03-01T06:00:00Z"));
    }

    #[test]
    fn test_cli_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["hydrosync", "export", "--target", "mongodb"]).is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["hydrosync", "--config", "custom.toml", "export"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["hydrosync", "--log-level", "debug", "export"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["hydrosync", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["hydrosync", "status"]);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["hydrosync", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}

//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Hydrosync configuration file.

use crate::config::{load_config, HydrosyncConfig};
use crate::core::export::ExportTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// `load_config` already validates, so a load failure covers both
    /// unreadable and invalid files.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);
        Ok(0)
    }
}

fn print_summary(config: &HydrosyncConfig) {
    println!("Configuration Summary:");
    println!("  Environment: {:?}", config.environment);
    println!("  Log Level: {}", config.application.log_level);
    println!("  Dry Run: {}", config.application.dry_run);
    println!("  Export Target: {}", config.export.target);
    println!(
        "  Result ID: {}",
        config.export.result_id.as_deref().unwrap_or("(from --result-id)")
    );

    match config.export.target {
        ExportTarget::Database => {
            if let Some(ref pg_config) = config.postgresql {
                use secrecy::ExposeSecret;
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .as_str()
                        .split('@')
                        .next_back()
                        .unwrap_or("***")
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  Round Decimals: {}", config.export.round_decimals);
            }
        }
        ExportTarget::Frost => {
            if let Some(ref frost) = config.frost {
                println!("  FROST Server: {}", frost.base_url);
                println!("  Batch Size: {}", config.export.batch_size);
                println!("  Max Workers: {}", config.export.max_workers);
                println!(
                    "  CRS: EPSG:{} -> EPSG:{}",
                    config.export.crs_from, config.export.crs_to
                );
            }
        }
    }

    println!(
        "  Topology: {}",
        config.input.topology_path.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Results: {}",
        config.input.results_path.as_deref().unwrap_or("(not set)")
    );
    println!();
}

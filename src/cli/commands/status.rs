//! Status command implementation
//!
//! This module implements the `status` command, which checks that every
//! configured export target is reachable.

use crate::adapters::database::{create_catalog, create_report_store};
use crate::config::load_config;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only check the report database
    #[arg(long, conflicts_with = "frost_only")]
    pub database_only: bool,

    /// Only check the FROST server
    #[arg(long)]
    pub frost_only: bool,
}

impl StatusArgs {
    /// Execute the status command
    ///
    /// Exit code 4 when any checked target is unreachable.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking target connectivity");

        println!("📊 Target Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let mut checked = 0;
        let mut unreachable = 0;

        if config.postgresql.is_some() && !self.frost_only {
            checked += 1;
            match create_report_store(&config).await {
                Ok(store) => match store.test_connection().await {
                    Ok(()) => println!("✅ Report database: {}", store.describe()),
                    Err(e) => {
                        unreachable += 1;
                        println!("❌ Report database: {}", store.describe());
                        println!("   Error: {e}");
                    }
                },
                Err(e) => {
                    unreachable += 1;
                    println!("❌ Report database: {e}");
                }
            }
        }

        if config.frost.is_some() && !self.database_only {
            checked += 1;
            match create_catalog(&config) {
                Ok(catalog) => match catalog.test_connection().await {
                    Ok(()) => println!("✅ FROST server: {}", catalog.describe()),
                    Err(e) => {
                        unreachable += 1;
                        println!("❌ FROST server: {}", catalog.describe());
                        println!("   Error: {e}");
                    }
                },
                Err(e) => {
                    unreachable += 1;
                    println!("❌ FROST server: {e}");
                }
            }
        }

        println!();
        if checked == 0 {
            println!("No export targets configured.");
            println!("Add a [postgresql] or [frost] section, or run 'hydrosync init'.");
            return Ok(0);
        }

        tracing::info!(checked, unreachable, "Connectivity check finished");
        Ok(if unreachable == 0 { 0 } else { 4 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs::default();
        assert!(!args.database_only);
        assert!(!args.frost_only);
    }

    #[tokio::test]
    async fn test_status_missing_config() {
        let args = StatusArgs::default();
        let code = args.execute("/nonexistent/hydrosync.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}

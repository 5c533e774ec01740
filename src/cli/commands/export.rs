//! Export command implementation
//!
//! This module implements the `export` command for publishing one simulation
//! run to the PostgreSQL report tables or a FROST server.

use crate::adapters::database::{create_catalog, create_report_store};
use crate::config::{load_config, HydrosyncConfig};
use crate::core::export::{ExportOrchestrator, ExportResources, ExportSummary, ExportTarget};
use crate::domain::{load_results, load_topology, ResultId};
use clap::Args;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Override the export target (database or frost)
    #[arg(long)]
    pub target: Option<ExportTarget>,

    /// Override the result identifier
    #[arg(long)]
    pub result_id: Option<String>,

    /// Override the topology document path
    #[arg(long)]
    pub topology: Option<String>,

    /// Override the result series document path
    #[arg(long)]
    pub results: Option<String>,

    /// Dry run mode - build and count, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Override the simulation start time (RFC 3339)
    #[arg(long)]
    pub start_time: Option<String>,
}

impl ExportArgs {
    /// Applies command-line overrides to a loaded configuration
    pub fn apply_overrides(&self, config: &mut HydrosyncConfig) {
        if let Some(target) = self.target {
            tracing::info!(target = %target, "Overriding export target from CLI");
            config.export.target = target;
        }
        if let Some(ref id) = self.result_id {
            config.export.result_id = Some(id.clone());
        }
        if let Some(ref path) = self.topology {
            config.input.topology_path = Some(path.clone());
        }
        if let Some(ref path) = self.results {
            config.input.results_path = Some(path.clone());
        }
        if let Some(ref start) = self.start_time {
            config.export.start_time = Some(start.clone());
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
    }

    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let result_id = match config.export.result_id.as_deref().map(ResultId::new) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                eprintln!("Invalid result id: {e}");
                return Ok(2);
            }
            None => {
                eprintln!("No result id given (use --result-id or export.result_id)");
                return Ok(2);
            }
        };

        let dry_run = config.application.dry_run;
        let options = match config.export.to_options(dry_run) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        };

        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - Nothing will be written");
            println!();
        }

        let resources = if dry_run {
            ExportResources::default()
        } else {
            match connect(&config).await {
                Ok(r) => r,
                Err(code) => return Ok(code),
            }
        };

        let topology = load_input(config.input.topology_path.as_deref(), "topology", |p| {
            load_topology(p)
        });
        let series = load_input(config.input.results_path.as_deref(), "results", |p| {
            load_results(p)
        });

        println!("🚀 Exporting {result_id} to {}...", config.export.target);
        println!();

        let orchestrator = ExportOrchestrator::new(resources);
        let summary = orchestrator
            .run(
                &result_id,
                config.export.target,
                series.as_ref(),
                topology.as_ref(),
                &options,
            )
            .await;

        print_summary(&summary);

        if summary.success {
            println!("✅ Export completed successfully!");
            Ok(0)
        } else {
            println!("❌ Export failed");
            Ok(1)
        }
    }
}

/// Opens the connection the configured target needs
///
/// Errors are printed and mapped to an exit code.
async fn connect(config: &HydrosyncConfig) -> Result<ExportResources, i32> {
    match config.export.target {
        ExportTarget::Database => {
            let store = create_report_store(config).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to create report store");
                eprintln!("Failed to initialize database: {e}");
                4
            })?;
            store.test_connection().await.map_err(|e| {
                tracing::error!(error = %e, "Database connection test failed");
                eprintln!("Cannot reach database {}: {e}", store.describe());
                4
            })?;
            Ok(ExportResources::default().with_report_store(store))
        }
        ExportTarget::Frost => {
            let catalog = create_catalog(config).map_err(|e| {
                tracing::error!(error = %e, "Failed to create FROST client");
                eprintln!("Failed to initialize FROST client: {e}");
                2
            })?;
            catalog.test_connection().await.map_err(|e| {
                tracing::error!(error = %e, "FROST connection test failed");
                eprintln!("Cannot reach {}: {e}", catalog.describe());
                4
            })?;
            Ok(ExportResources::default().with_catalog(catalog))
        }
    }
}

/// Loads one input document; a missing path or a bad document leaves it unloaded
fn load_input<T>(
    path: Option<&str>,
    what: &str,
    load: impl FnOnce(&str) -> crate::domain::Result<T>,
) -> Option<T> {
    let path = path?;
    match load(path) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(path = %path, input = what, error = %e, "Failed to load input");
            eprintln!("Failed to load {what} from {path}: {e}");
            None
        }
    }
}

fn print_summary(summary: &ExportSummary) {
    println!("📊 Export Summary:");
    println!("  Result ID: {}", summary.result_id);
    println!("  Target: {}", summary.target);

    if let Some(report) = &summary.relational {
        println!("  Node rows: {}", report.node_rows);
        println!("  Arc rows: {}", report.arc_rows);
        println!("  Reversed arcs: {}", report.reversed_arcs);
    }

    if let Some(report) = &summary.reconcile {
        println!("  Things created: {}", report.created);
        println!("  Things updated: {}", report.updated);
        println!("  Things obsoleted: {}", report.obsoleted);
        println!("  Skipped (no coordinates): {}", report.skipped);
        println!(
            "  Batches: {} ({} failed, {} failed operations)",
            report.batches, report.failed_batches, report.failed_operations
        );
    }

    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

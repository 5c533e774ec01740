//! Core business logic for Hydrosync.
//!
//! # Modules
//!
//! - [`units`] - display unit systems and conversion from canonical SI values
//! - [`engine`] - what each simulation engine publishes (variables, labels, geometry)
//! - [`geo`] - projected to geographic coordinate transforms
//! - [`export`] - relational export, observation-API reconciliation and orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use hydrosync::core::export::{ExportOptions, ExportOrchestrator, ExportResources, ExportTarget};
//! use hydrosync::domain::{load_results, load_topology, ResultId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let topology = load_topology("network.json")?;
//! let series = load_results("results.json")?;
//! let result_id = ResultId::new("run_2024_01")?;
//!
//! let options = ExportOptions {
//!     dry_run: true,
//!     ..ExportOptions::default()
//! };
//! let orchestrator = ExportOrchestrator::new(ExportResources::default());
//! let ok = orchestrator
//!     .export(&result_id, ExportTarget::Database, Some(&series), Some(&topology), &options)
//!     .await;
//!
//! println!("Exported: {ok}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod export;
pub mod geo;
pub mod units;

// Hydrosync - Hydraulic simulation result exporter
// Copyright (c) 2025 Hydrosync Contributors
// Licensed under the MIT License

//! # Hydrosync - EPANET / SWMM result export
//!
//! Hydrosync takes the time series produced by an EPANET or SWMM simulation run
//! and publishes them to two kinds of destination:
//!
//! - **PostgreSQL report tables** (`rpt_node`, `rpt_arc` and their statistics
//!   tables), with display-unit conversion, flow-direction normalisation and
//!   per-entity min/max/avg aggregation, all inside one transaction.
//! - **SensorThings API servers** (FROST), where every network element becomes a
//!   `Thing` with a location, one `Datastream` per result variable and the full
//!   observation sequence. Existing Things are reused by name, new ones are
//!   created, and Things that disappeared from the network are flagged obsolete.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Unit conversion, engine profiles, CRS transform and the export pipeline
//! - [`adapters`] - PostgreSQL and FROST integrations
//! - [`domain`] - Topology, result series, identifiers and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hydrosync::core::export::{ExportOptions, ExportOrchestrator, ExportResources, ExportTarget};
//! use hydrosync::domain::{load_results, load_topology, ResultId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let topology = load_topology("network.json")?;
//! let results = load_results("results.json")?;
//!
//! let orchestrator = ExportOrchestrator::new(ExportResources::default());
//! let ok = orchestrator
//!     .export(
//!         &ResultId::new("run_2025_01")?,
//!         ExportTarget::Frost,
//!         Some(&results),
//!         Some(&topology),
//!         &ExportOptions::default(),
//!     )
//!     .await;
//! println!("exported: {ok}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Internally every fallible operation returns [`domain::Result`]. The export
//! entry point itself never returns an error: failures are logged and reported
//! as `false`.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

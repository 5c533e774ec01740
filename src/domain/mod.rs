//! Domain models and types for Hydrosync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`ResultId`])
//! - **Network model** ([`NetworkTopology`], [`Node`], [`Link`])
//! - **Result data** ([`ResultSeries`], [`VariableTable`])
//! - **Error types** ([`HydroError`], [`FrostError`], [`UnitError`])
//! - **Result type alias** ([`Result`])
//!
//! # Building a topology
//!
//! ```rust
//! use hydrosync::domain::{EngineKind, Link, LinkKind, NetworkTopology, Node, NodeKind};
//!
//! let topology = NetworkTopology::builder(EngineKind::Epanet)
//!     .flow_units("LPS")
//!     .node(Node::new("J1", NodeKind::Junction).with_coordinates(430000.0, 4580000.0))
//!     .node(Node::new("R1", NodeKind::Reservoir).with_coordinates(430100.0, 4580000.0))
//!     .link(Link::new("P1", LinkKind::Pipe, "R1", "J1").with_length(100.0))
//!     .build()
//!     .unwrap();
//! assert_eq!(topology.links().len(), 1);
//! ```

pub mod errors;
pub mod ids;
pub mod loader;
pub mod result;
pub mod series;
pub mod topology;

pub use errors::{FrostError, HydroError, UnitError};
pub use ids::ResultId;
pub use loader::{load_results, load_topology};
pub use result::Result;
pub use series::{ResultSeries, VariableTable};
pub use topology::{
    Coordinate, EngineKind, Link, LinkKind, NetworkTopology, NetworkTopologyBuilder, Node,
    NodeKind,
};

//! Engine capability profiles
//!
//! The export pipeline is engine-agnostic. Everything that differs between
//! EPANET and SWMM (which variables exist, how entities are labelled, whether
//! the relational report tables exist) is supplied through [`EngineProfile`].

pub mod epanet;
pub mod swmm;

use crate::domain::{Coordinate, EngineKind, Link, NetworkTopology, Node};

pub use epanet::Epanet;
pub use swmm::Swmm;

/// Unit of measurement as published on a datastream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOfMeasurement {
    pub name: &'static str,
    pub symbol: &'static str,
    pub definition: &'static str,
}

/// One exported result variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpec {
    /// Variable name in the result series
    pub key: &'static str,
    /// Observed property name, shared across runs and engines
    pub name: &'static str,
    pub definition: &'static str,
    pub description: &'static str,
    pub unit: UnitOfMeasurement,
}

/// What an engine contributes to an export
pub trait EngineProfile: Send + Sync {
    /// Network type label ("EPANET" or "SWMM")
    fn network_type(&self) -> &'static str;

    fn node_variables(&self) -> &'static [VariableSpec];

    fn link_variables(&self) -> &'static [VariableSpec];

    /// Whether the relational report tables exist for this engine
    fn supports_relational(&self) -> bool;

    fn node_type_label(&self, node: &Node) -> &'static str {
        node.kind.label()
    }

    fn link_type_label(&self, link: &Link) -> &'static str {
        link.kind.label()
    }

    fn node_coordinates(&self, node: &Node) -> Option<Coordinate> {
        node.coordinates
    }

    /// Start node, vertices, end node. Empty when either end has no coordinates.
    fn link_path(&self, topology: &NetworkTopology, link: &Link) -> Vec<Coordinate> {
        let start = topology
            .node(&link.start_node)
            .and_then(|n| self.node_coordinates(n));
        let end = topology
            .node(&link.end_node)
            .and_then(|n| self.node_coordinates(n));

        match (start, end) {
            (Some(start), Some(end)) => {
                let mut path = Vec::with_capacity(link.vertices.len() + 2);
                path.push(start);
                path.extend(link.vertices.iter().copied());
                path.push(end);
                path
            }
            _ => Vec::new(),
        }
    }

    /// Every observed property this engine may publish
    fn all_variables(&self) -> Vec<&'static VariableSpec> {
        self.node_variables()
            .iter()
            .chain(self.link_variables().iter())
            .collect()
    }
}

/// Resolves the profile for an engine
pub fn profile_for(engine: EngineKind) -> &'static dyn EngineProfile {
    match engine {
        EngineKind::Epanet => &Epanet,
        EngineKind::Swmm => &Swmm,
    }
}

pub(crate) const UCUM: &str = "http://unitsofmeasure.org/ucum.html";

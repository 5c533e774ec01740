//! Network topology domain model
//!
//! A [`NetworkTopology`] is the static description of a simulated network:
//! its nodes and links with their coordinates and physical attributes. It is
//! built once when an input model is loaded and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Planar or geographic coordinate pair `(x, y)`
pub type Coordinate = (f64, f64);

/// Simulation engine that produced a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// EPANET pressurised water distribution networks
    Epanet,
    /// SWMM storm water / sewer networks
    Swmm,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Epanet => write!(f, "epanet"),
            EngineKind::Swmm => write!(f, "swmm"),
        }
    }
}

/// Node category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Junction,
    Reservoir,
    Tank,
    Outfall,
    Divider,
    Storage,
}

impl NodeKind {
    /// Display label used in remote entity descriptions
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Junction => "Junction",
            NodeKind::Reservoir => "Reservoir",
            NodeKind::Tank => "Tank",
            NodeKind::Outfall => "Outfall",
            NodeKind::Divider => "Divider",
            NodeKind::Storage => "Storage",
        }
    }
}

/// Link category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Pipe,
    Pump,
    Valve,
    Conduit,
    Orifice,
    Weir,
    Outlet,
}

impl LinkKind {
    /// Display label used in remote entity descriptions
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Pipe => "Pipe",
            LinkKind::Pump => "Pump",
            LinkKind::Valve => "Valve",
            LinkKind::Conduit => "Conduit",
            LinkKind::Orifice => "Orifice",
            LinkKind::Weir => "Weir",
            LinkKind::Outlet => "Outlet",
        }
    }
}

/// A network node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Elevation in canonical units (m)
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Coordinates in the network's projected CRS
    #[serde(default)]
    pub coordinates: Option<Coordinate>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            elevation: None,
            coordinates: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some((x, y));
        self
    }
}

/// A network link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub kind: LinkKind,
    pub start_node: String,
    pub end_node: String,
    /// Intermediate vertices between start and end node, in order
    #[serde(default)]
    pub vertices: Vec<Coordinate>,
    /// Length in canonical units (m)
    #[serde(default)]
    pub length: Option<f64>,
    /// Diameter in canonical units (m)
    #[serde(default)]
    pub diameter: Option<f64>,
}

impl Link {
    pub fn new(
        id: impl Into<String>,
        kind: LinkKind,
        start_node: impl Into<String>,
        end_node: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            start_node: start_node.into(),
            end_node: end_node.into(),
            vertices: Vec::new(),
            length: None,
            diameter: None,
        }
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn with_vertices(mut self, vertices: Vec<Coordinate>) -> Self {
        self.vertices = vertices;
        self
    }
}

/// On-disk shape of a topology document
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyDocument {
    pub engine: EngineKind,
    #[serde(default)]
    pub title: Option<String>,
    pub flow_units: String,
    #[serde(default)]
    pub start_clocktime: u64,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Static network description shared by both export targets
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TopologyDocument")]
pub struct NetworkTopology {
    engine: EngineKind,
    title: Option<String>,
    flow_units: String,
    start_clocktime: u64,
    source_file: Option<String>,
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<String, usize>,
    link_index: HashMap<String, usize>,
}

impl NetworkTopology {
    /// Creates a new builder
    pub fn builder(engine: EngineKind) -> NetworkTopologyBuilder {
        NetworkTopologyBuilder::new(engine)
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Declared flow unit system name (e.g. `GPM`, `LPS`)
    pub fn flow_units(&self) -> &str {
        &self.flow_units
    }

    /// Simulation clock time at t = 0, in seconds past midnight
    pub fn start_clocktime(&self) -> u64 {
        self.start_clocktime
    }

    /// Path of the input model this topology was read from
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.link_index.get(id).map(|&i| &self.links[i])
    }
}

impl TryFrom<TopologyDocument> for NetworkTopology {
    type Error = String;

    fn try_from(doc: TopologyDocument) -> Result<Self, Self::Error> {
        let mut builder = NetworkTopologyBuilder::new(doc.engine)
            .flow_units(doc.flow_units)
            .start_clocktime(doc.start_clocktime);
        builder.title = doc.title;
        builder.source_file = doc.source_file;
        builder.nodes = doc.nodes;
        builder.links = doc.links;
        builder.build()
    }
}

/// Builder for [`NetworkTopology`]
#[derive(Debug)]
pub struct NetworkTopologyBuilder {
    engine: EngineKind,
    title: Option<String>,
    flow_units: Option<String>,
    start_clocktime: u64,
    source_file: Option<String>,
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl NetworkTopologyBuilder {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            title: None,
            flow_units: None,
            start_clocktime: 0,
            source_file: None,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn flow_units(mut self, flow_units: impl Into<String>) -> Self {
        self.flow_units = Some(flow_units.into());
        self
    }

    pub fn start_clocktime(mut self, seconds: u64) -> Self {
        self.start_clocktime = seconds;
        self
    }

    pub fn source_file(mut self, path: impl Into<String>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Builds the topology
    ///
    /// # Errors
    ///
    /// Returns an error if the flow units are missing, an id is blank or
    /// duplicated, or a link references an unknown node.
    pub fn build(self) -> Result<NetworkTopology, String> {
        let flow_units = self.flow_units.ok_or("flow_units is required")?;

        let mut node_index = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                return Err(format!("node at position {i} has an empty id"));
            }
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(format!("duplicate node id '{}'", node.id));
            }
        }

        let mut link_index = HashMap::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            if link.id.trim().is_empty() {
                return Err(format!("link at position {i} has an empty id"));
            }
            if link_index.insert(link.id.clone(), i).is_some() {
                return Err(format!("duplicate link id '{}'", link.id));
            }
            for end in [&link.start_node, &link.end_node] {
                if !node_index.contains_key(end.as_str()) {
                    return Err(format!(
                        "link '{}' references unknown node '{}'",
                        link.id, end
                    ));
                }
            }
        }

        Ok(NetworkTopology {
            engine: self.engine,
            title: self.title,
            flow_units,
            start_clocktime: self.start_clocktime,
            source_file: self.source_file,
            nodes: self.nodes,
            links: self.links,
            node_index,
            link_index,
        })
    }
}

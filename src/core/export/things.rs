//! SensorThings entity assembly
//!
//! Turns the topology and result series into one [`ThingDraft`] per network
//! element: a reprojected location, and one datastream per variable that has
//! a column for that element, carrying every observation of the run.

use crate::adapters::frost::{EntityId, RemoteThing, OBSOLETE_PROPERTY};
use crate::core::engine::{EngineProfile, VariableSpec};
use crate::core::geo::CoordinateTransform;
use crate::core::units::round_to;
use crate::domain::{Coordinate, NetworkTopology, ResultSeries, VariableTable};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const OM_MEASUREMENT: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Geographic coordinates are published with 7 decimals (about 1 cm)
const COORDINATE_DECIMALS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Link,
}

/// Everything needed to create or refresh one Thing
#[derive(Debug, Clone, PartialEq)]
pub struct ThingDraft {
    pub name: String,
    pub kind: EntityKind,
    pub description: String,
    pub properties: Map<String, Value>,
    /// Location entity body
    pub location: Value,
    /// Datastream bodies, without the Thing link
    pub datastreams: Vec<Value>,
}

impl ThingDraft {
    /// GeoJSON geometry of the location
    pub fn geometry(&self) -> &Value {
        &self.location["location"]
    }

    /// Deep-insert body creating the Thing with its location and datastreams
    pub fn create_body(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "properties": self.properties,
            "Locations": [self.location],
            "Datastreams": self.datastreams,
        })
    }

    /// Patch body for an existing Thing
    ///
    /// Server-side properties are kept, ours win on conflict, and the Thing
    /// is always marked current.
    pub fn update_body(&self, existing: &RemoteThing) -> Value {
        let mut properties = existing.properties.clone();
        for (key, value) in &self.properties {
            properties.insert(key.clone(), value.clone());
        }
        properties.insert(OBSOLETE_PROPERTY.to_string(), Value::Bool(false));

        json!({
            "description": self.description,
            "properties": properties,
        })
    }

    pub fn location_changed(&self, existing: &RemoteThing) -> bool {
        existing.location.as_ref() != Some(self.geometry())
    }

    /// Datastream bodies linked to an existing Thing
    pub fn linked_datastreams(&self, thing: &EntityId) -> Vec<Value> {
        self.datastreams
            .iter()
            .map(|ds| {
                let mut ds = ds.clone();
                if let Value::Object(ref mut map) = ds {
                    map.insert("Thing".to_string(), thing.reference());
                }
                ds
            })
            .collect()
    }
}

/// Output of [`ThingAssembler::assemble`]
#[derive(Debug, Default)]
pub struct Assembly {
    pub things: Vec<ThingDraft>,
    /// Elements left out because they have no usable coordinates
    pub skipped: Vec<String>,
}

/// Builds Thing drafts for one run
pub struct ThingAssembler<'a> {
    profile: &'a dyn EngineProfile,
    topology: &'a NetworkTopology,
    series: &'a ResultSeries,
    transform: &'a CoordinateTransform,
    sensor: &'a EntityId,
    observed_properties: &'a HashMap<String, EntityId>,
    start_time: DateTime<Utc>,
    result_time: DateTime<Utc>,
}

impl<'a> ThingAssembler<'a> {
    pub fn new(
        profile: &'a dyn EngineProfile,
        topology: &'a NetworkTopology,
        series: &'a ResultSeries,
        transform: &'a CoordinateTransform,
        sensor: &'a EntityId,
        observed_properties: &'a HashMap<String, EntityId>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            profile,
            topology,
            series,
            transform,
            sensor,
            observed_properties,
            start_time,
            result_time: Utc::now(),
        }
    }

    /// Overrides the result time stamped on every observation
    pub fn with_result_time(mut self, result_time: DateTime<Utc>) -> Self {
        self.result_time = result_time;
        self
    }

    pub fn assemble(&self) -> Assembly {
        let mut assembly = Assembly::default();

        for node in self.topology.nodes() {
            let type_label = self.profile.node_type_label(node);
            let geometry = self
                .profile
                .node_coordinates(node)
                .and_then(|c| self.project(&[c]))
                .map(|p| json!({"type": "Point", "coordinates": p[0]}));

            let Some(geometry) = geometry else {
                tracing::warn!(node_id = %node.id, "Node has no usable coordinates, skipping");
                assembly.skipped.push(node.id.clone());
                continue;
            };

            let datastreams = self.datastreams(
                &node.id,
                type_label,
                self.profile.node_variables(),
                |key| self.series.node_variable(key),
            );
            assembly.things.push(self.draft(
                &node.id,
                EntityKind::Node,
                type_label,
                geometry,
                datastreams,
            ));
        }

        for link in self.topology.links() {
            let type_label = self.profile.link_type_label(link);
            let path = self.profile.link_path(self.topology, link);
            let geometry = if path.len() < 2 {
                None
            } else {
                self.project(&path)
                    .map(|p| json!({"type": "LineString", "coordinates": p}))
            };

            let Some(geometry) = geometry else {
                tracing::warn!(link_id = %link.id, "Link has no usable geometry, skipping");
                assembly.skipped.push(link.id.clone());
                continue;
            };

            let datastreams = self.datastreams(
                &link.id,
                type_label,
                self.profile.link_variables(),
                |key| self.series.link_variable(key),
            );
            assembly.things.push(self.draft(
                &link.id,
                EntityKind::Link,
                type_label,
                geometry,
                datastreams,
            ));
        }

        tracing::debug!(
            things = assembly.things.len(),
            skipped = assembly.skipped.len(),
            "Assembled things"
        );
        assembly
    }

    fn project(&self, path: &[Coordinate]) -> Option<Vec<[f64; 2]>> {
        match self.transform.transform_path(path) {
            Ok(projected) => Some(
                projected
                    .into_iter()
                    .map(|(x, y)| {
                        [
                            round_to(x, COORDINATE_DECIMALS),
                            round_to(y, COORDINATE_DECIMALS),
                        ]
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Coordinate transform failed");
                None
            }
        }
    }

    fn draft(
        &self,
        id: &str,
        kind: EntityKind,
        type_label: &str,
        geometry: Value,
        datastreams: Vec<Value>,
    ) -> ThingDraft {
        let network = self.profile.network_type();
        let type_key = match kind {
            EntityKind::Node => "node_type",
            EntityKind::Link => "link_type",
        };

        let mut properties = Map::new();
        properties.insert(type_key.to_string(), Value::from(type_label));
        properties.insert(OBSOLETE_PROPERTY.to_string(), Value::Bool(false));

        ThingDraft {
            name: id.to_string(),
            kind,
            description: format!("{network} {type_label} {id}"),
            properties,
            location: json!({
                "name": format!("{id} Location"),
                "description": format!("Location of {network} {type_label} {id}"),
                "encodingType": "application/geo+json",
                "location": geometry,
            }),
            datastreams,
        }
    }

    fn datastreams<'t>(
        &self,
        id: &str,
        type_label: &str,
        variables: &'static [VariableSpec],
        table: impl Fn(&str) -> Option<&'t VariableTable>,
    ) -> Vec<Value> {
        let network = self.profile.network_type();

        variables
            .iter()
            .filter_map(|variable| {
                let series = table(variable.key)?.series(id)?;
                let observations: Vec<Value> = series
                    .filter(|(_, value)| value.is_finite())
                    .filter_map(|(seconds, value)| self.observation(id, seconds, value))
                    .collect();
                if observations.is_empty() {
                    return None;
                }

                let Some(property) = self.observed_properties.get(variable.name) else {
                    tracing::warn!(
                        variable = variable.name,
                        "Observed property not provisioned, omitting datastream"
                    );
                    return None;
                };

                Some(json!({
                    "name": format!("{} at {id}", variable.name),
                    "description": format!(
                        "The {} at {network} {type_label} {id}",
                        variable.name.to_lowercase()
                    ),
                    "unitOfMeasurement": {
                        "name": variable.unit.name,
                        "symbol": variable.unit.symbol,
                        "definition": variable.unit.definition,
                    },
                    "observationType": OM_MEASUREMENT,
                    "Sensor": self.sensor.reference(),
                    "ObservedProperty": property.reference(),
                    "Observations": observations,
                }))
            })
            .collect()
    }

    /// `None` when the timestep falls outside the representable time range
    fn observation(&self, id: &str, seconds: u64, value: f64) -> Option<Value> {
        let phenomenon = i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|offset| self.start_time.checked_add_signed(offset));
        let Some(phenomenon) = phenomenon else {
            tracing::error!(
                element = id,
                seconds = seconds,
                "Timestep out of range, dropping observation"
            );
            return None;
        };

        Some(json!({
            "phenomenonTime": phenomenon.format(TIME_FORMAT).to_string(),
            "result": value,
            "resultTime": self.result_time.format(TIME_FORMAT).to_string(),
        }))
    }
}

//! SensorThings wire models
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! server's responses is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Property flagging a Thing that no longer exists in the current network
pub const OBSOLETE_PROPERTY: &str = "obsolete";

/// Server-assigned entity id
///
/// FROST may be configured with numeric or string ids, so the raw JSON value
/// is kept and rendered in the form the URL syntax expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Value);

impl EntityId {
    /// Parses the key found inside `Collection(<key>)`, quoted or not
    pub fn from_key(key: &str) -> Self {
        let key = key.trim();
        if let Some(inner) = key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')) {
            return Self(Value::String(inner.replace("''", "'")));
        }
        match key.parse::<i64>() {
            Ok(n) => Self(Value::from(n)),
            Err(_) => Self(Value::String(key.to_string())),
        }
    }

    /// `{"@iot.id": ...}` reference used to link entities
    pub fn reference(&self) -> Value {
        let mut map = Map::new();
        map.insert("@iot.id".to_string(), self.0.clone());
        Value::Object(map)
    }

    /// Relative path of this entity inside `collection`
    pub fn path(&self, collection: &str) -> String {
        format!("{collection}({self})")
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(Value::from(id))
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            other => write!(f, "{other}"),
        }
    }
}

/// A Thing as found on the server during pre-fetch
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteThing {
    pub id: EntityId,
    pub name: String,
    pub properties: Map<String, Value>,
    /// GeoJSON geometry of the first location, if any
    pub location: Option<Value>,
}

impl RemoteThing {
    pub fn is_obsolete(&self) -> bool {
        self.properties
            .get(OBSOLETE_PROPERTY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// One page of a collection response
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@iot.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThingEntry {
    #[serde(rename = "@iot.id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(rename = "Locations", default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationEntry {
    #[serde(default)]
    pub location: Option<Value>,
}

impl From<ThingEntry> for RemoteThing {
    fn from(entry: ThingEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            properties: entry.properties.unwrap_or_default(),
            location: entry.locations.into_iter().find_map(|l| l.location),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedEntry {
    #[serde(rename = "@iot.id")]
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedEntry {
    #[serde(rename = "@iot.id")]
    pub id: EntityId,
}

/// Sensor describing one simulation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDraft {
    pub name: String,
    pub description: String,
    #[serde(rename = "encodingType")]
    pub encoding_type: String,
    pub metadata: String,
}

/// HTTP method of a batched operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMethod {
    Post,
    Patch,
}

/// One request inside a `$batch` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOperation {
    pub id: String,
    pub method: BatchMethod,
    pub url: String,
    pub body: Value,
}

impl BatchOperation {
    pub fn post(id: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            method: BatchMethod::Post,
            url: url.into(),
            body,
        }
    }

    pub fn patch(id: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            method: BatchMethod::Patch,
            url: url.into(),
            body,
        }
    }
}

/// Result of one batched operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationOutcome {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub body: Option<Value>,
}

impl OperationOutcome {
    /// A status of 0 marks an operation the server never answered
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

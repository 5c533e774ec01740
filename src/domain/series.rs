//! Simulation result series
//!
//! A [`ResultSeries`] maps each variable name to a [`VariableTable`], which holds
//! one value per `(timestep, entity_id)`. All node variables share one timestep
//! index, as do all link variables. Missing cells are stored as NaN so that
//! downstream conversion can report them individually.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Values of one variable for every entity across every timestep
#[derive(Debug, Clone, PartialEq)]
pub struct VariableTable {
    timesteps: Vec<u64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl VariableTable {
    /// Creates an empty table over the given timesteps (seconds since start)
    pub fn new(timesteps: Vec<u64>) -> Self {
        Self {
            timesteps,
            columns: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) the column for one entity
    ///
    /// # Errors
    ///
    /// Returns an error if the column length differs from the timestep count.
    pub fn insert_column(
        &mut self,
        entity_id: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), String> {
        let entity_id = entity_id.into();
        if values.len() != self.timesteps.len() {
            return Err(format!(
                "column '{}' has {} values but the table has {} timesteps",
                entity_id,
                values.len(),
                self.timesteps.len()
            ));
        }
        self.columns.insert(entity_id, values);
        Ok(())
    }

    /// Builder-style variant of [`VariableTable::insert_column`]
    pub fn with_column(
        mut self,
        entity_id: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, String> {
        self.insert_column(entity_id, values)?;
        Ok(self)
    }

    pub fn timesteps(&self) -> &[u64] {
        &self.timesteps
    }

    /// Entity ids in ascending order
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn entity_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, entity_id: &str) -> Option<&[f64]> {
        self.columns.get(entity_id).map(Vec::as_slice)
    }

    /// Value at timestep position `step` for `entity_id`
    pub fn value(&self, step: usize, entity_id: &str) -> Option<f64> {
        self.columns.get(entity_id).and_then(|c| c.get(step).copied())
    }

    /// `(seconds, value)` pairs for one entity
    pub fn series(&self, entity_id: &str) -> Option<impl Iterator<Item = (u64, f64)> + '_> {
        self.column(entity_id)
            .map(|c| self.timesteps.iter().copied().zip(c.iter().copied()))
    }
}

#[derive(Debug, Deserialize)]
struct VariableTableDocument {
    timesteps: Vec<u64>,
    #[serde(default)]
    values: BTreeMap<String, Vec<Option<f64>>>,
}

impl TryFrom<VariableTableDocument> for VariableTable {
    type Error = String;

    fn try_from(doc: VariableTableDocument) -> Result<Self, Self::Error> {
        let mut table = VariableTable::new(doc.timesteps);
        for (entity_id, values) in doc.values {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            table.insert_column(entity_id, values)?;
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for VariableTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let doc = VariableTableDocument::deserialize(deserializer)?;
        VariableTable::try_from(doc).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
struct ResultSeriesDocument {
    #[serde(default)]
    nodes: HashMap<String, VariableTable>,
    #[serde(default)]
    links: HashMap<String, VariableTable>,
}

/// Time series of one simulation run, split by entity family
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "ResultSeriesDocument")]
pub struct ResultSeries {
    nodes: HashMap<String, VariableTable>,
    links: HashMap<String, VariableTable>,
}

impl ResultSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node variable
    ///
    /// # Errors
    ///
    /// Returns an error if its timesteps differ from those of the node
    /// variables already present.
    pub fn with_node_variable(
        mut self,
        name: impl Into<String>,
        table: VariableTable,
    ) -> Result<Self, String> {
        check_shared_index(&self.nodes, &table, "node")?;
        self.nodes.insert(name.into(), table);
        Ok(self)
    }

    /// Adds a link variable, with the same timestep check as nodes
    pub fn with_link_variable(
        mut self,
        name: impl Into<String>,
        table: VariableTable,
    ) -> Result<Self, String> {
        check_shared_index(&self.links, &table, "link")?;
        self.links.insert(name.into(), table);
        Ok(self)
    }

    pub fn node_variable(&self, name: &str) -> Option<&VariableTable> {
        self.nodes.get(name)
    }

    pub fn link_variable(&self, name: &str) -> Option<&VariableTable> {
        self.links.get(name)
    }

    pub fn node_variable_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn link_variable_names(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }
}

fn check_shared_index(
    existing: &HashMap<String, VariableTable>,
    table: &VariableTable,
    family: &str,
) -> Result<(), String> {
    if let Some(first) = existing.values().next() {
        if first.timesteps() != table.timesteps() {
            return Err(format!(
                "{family} variables must share one timestep index"
            ));
        }
    }
    Ok(())
}

impl TryFrom<ResultSeriesDocument> for ResultSeries {
    type Error = String;

    fn try_from(doc: ResultSeriesDocument) -> Result<Self, Self::Error> {
        let mut series = ResultSeries::new();
        for (name, table) in doc.nodes {
            series = series.with_node_variable(name, table)?;
        }
        for (name, table) in doc.links {
            series = series.with_link_variable(name, table)?;
        }
        Ok(series)
    }
}

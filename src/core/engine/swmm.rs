//! SWMM (storm water and drainage)

use super::{EngineProfile, UnitOfMeasurement, VariableSpec, UCUM};

const CUBIC_METRE_PER_SECOND: UnitOfMeasurement = UnitOfMeasurement {
    name: "Cubic metre per second",
    symbol: "m3/s",
    definition: UCUM,
};

const METRE: UnitOfMeasurement = UnitOfMeasurement {
    name: "Metre",
    symbol: "m",
    definition: UCUM,
};

const CUBIC_METRE: UnitOfMeasurement = UnitOfMeasurement {
    name: "Cubic metre",
    symbol: "m3",
    definition: UCUM,
};

const METRE_PER_SECOND: UnitOfMeasurement = UnitOfMeasurement {
    name: "Metre per second",
    symbol: "m/s",
    definition: UCUM,
};

const FRACTION: UnitOfMeasurement = UnitOfMeasurement {
    name: "Fraction",
    symbol: "1",
    definition: UCUM,
};

const NODE_VARIABLES: &[VariableSpec] = &[
    VariableSpec {
        key: "depth",
        name: "Depth",
        definition: "https://en.wikipedia.org/wiki/Water_level",
        description: "Water depth above the node invert",
        unit: METRE,
    },
    VariableSpec {
        key: "head",
        name: "Head",
        definition: "https://en.wikipedia.org/wiki/Hydraulic_head",
        description: "Hydraulic head at a node",
        unit: METRE,
    },
    VariableSpec {
        key: "volume",
        name: "Volume",
        definition: "https://en.wikipedia.org/wiki/Volume",
        description: "Stored water volume",
        unit: CUBIC_METRE,
    },
    VariableSpec {
        key: "lateral_inflow",
        name: "Lateral Inflow",
        definition: "https://en.wikipedia.org/wiki/Surface_runoff",
        description: "Runoff and external inflow entering a node",
        unit: CUBIC_METRE_PER_SECOND,
    },
    VariableSpec {
        key: "total_inflow",
        name: "Total Inflow",
        definition: "https://en.wikipedia.org/wiki/Volumetric_flow_rate",
        description: "Lateral plus upstream inflow at a node",
        unit: CUBIC_METRE_PER_SECOND,
    },
    VariableSpec {
        key: "flooding",
        name: "Flooding",
        definition: "https://en.wikipedia.org/wiki/Flood",
        description: "Overflow rate leaving the drainage system",
        unit: CUBIC_METRE_PER_SECOND,
    },
];

const LINK_VARIABLES: &[VariableSpec] = &[
    VariableSpec {
        key: "flow",
        name: "Flow",
        definition: "https://en.wikipedia.org/wiki/Volumetric_flow_rate",
        description: "Volumetric flow rate through a link",
        unit: CUBIC_METRE_PER_SECOND,
    },
    VariableSpec {
        key: "depth",
        name: "Depth",
        definition: "https://en.wikipedia.org/wiki/Water_level",
        description: "Average water depth in a link",
        unit: METRE,
    },
    VariableSpec {
        key: "velocity",
        name: "Velocity",
        definition: "https://en.wikipedia.org/wiki/Flow_velocity",
        description: "Mean flow velocity in a link",
        unit: METRE_PER_SECOND,
    },
    VariableSpec {
        key: "volume",
        name: "Volume",
        definition: "https://en.wikipedia.org/wiki/Volume",
        description: "Water volume held in a link",
        unit: CUBIC_METRE,
    },
    VariableSpec {
        key: "capacity",
        name: "Capacity",
        definition: "https://en.wikipedia.org/wiki/Storm_drain",
        description: "Fraction of the full conduit area that is filled",
        unit: FRACTION,
    },
];

/// SWMM engine profile
#[derive(Debug, Clone, Copy, Default)]
pub struct Swmm;

impl EngineProfile for Swmm {
    fn network_type(&self) -> &'static str {
        "SWMM"
    }

    fn node_variables(&self) -> &'static [VariableSpec] {
        NODE_VARIABLES
    }

    fn link_variables(&self) -> &'static [VariableSpec] {
        LINK_VARIABLES
    }

    fn supports_relational(&self) -> bool {
        false
    }
}

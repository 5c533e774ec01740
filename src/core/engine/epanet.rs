//! EPANET (pressurised water distribution)

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

const METRE_PER_SECOND: UnitOfMeasurement = UnitOfMeasurement {
    name: "Metre per second",
    symbol: "m/s",
    definition: UCUM,
};

const DIMENSIONLESS: UnitOfMeasurement = UnitOfMeasurement {
    name: "Dimensionless",
    symbol: "1",
    definition: UCUM,
};

const NODE_VARIABLES: &[VariableSpec] = &[
    VariableSpec {
        key: "demand",
        name: "Demand",
        definition: "https://en.wikipedia.org/wiki/Water_demand",
        description: "Water withdrawn at a node",
        unit: CUBIC_METRE_PER_SECOND,
    },
    VariableSpec {
        key: "head",
        name: "Head",
        definition: "https://en.wikipedia.org/wiki/Hydraulic_head",
        description: "Hydraulic head at a node",
        unit: METRE,
    },
    VariableSpec {
        key: "pressure",
        name: "Pressure",
        definition: "https://en.wikipedia.org/wiki/Pressure_head",
        description: "Pressure head at a node",
        unit: METRE,
    },
    VariableSpec {
        key: "quality",
        name: "Quality",
        definition: "https://en.wikipedia.org/wiki/Water_quality",
        description: "Water quality (concentration, age or trace) at a node",
        unit: DIMENSIONLESS,
    },
];

const LINK_VARIABLES: &[VariableSpec] = &[
    VariableSpec {
        key: "flowrate",
        name: "Flow",
        definition: "https://en.wikipedia.org/wiki/Volumetric_flow_rate",
        description: "Volumetric flow rate through a link",
        unit: CUBIC_METRE_PER_SECOND,
    },
    VariableSpec {
        key: "velocity",
        name: "Velocity",
        definition: "https://en.wikipedia.org/wiki/Flow_velocity",
        description: "Mean flow velocity in a link",
        unit: METRE_PER_SECOND,
    },
    VariableSpec {
        key: "headloss",
        name: "Headloss",
        definition: "https://en.wikipedia.org/wiki/Head_loss",
        description: "Head loss per unit length of a link",
        unit: DIMENSIONLESS,
    },
    VariableSpec {
        key: "status",
        name: "Status",
        definition: "https://en.wikipedia.org/wiki/EPANET",
        description: "Link status code (0 closed, 1 open, 2 active)",
        unit: DIMENSIONLESS,
    },
    VariableSpec {
        key: "setting",
        name: "Setting",
        definition: "https://en.wikipedia.org/wiki/EPANET",
        description: "Pump speed or valve setting",
        unit: DIMENSIONLESS,
    },
    VariableSpec {
        key: "reaction_rate",
        name: "Reaction Rate",
        definition: "https://en.wikipedia.org/wiki/Reaction_rate",
        description: "Bulk and wall reaction rate in a link",
        unit: DIMENSIONLESS,
    },
    VariableSpec {
        key: "friction_factor",
        name: "Friction Factor",
        definition: "https://en.wikipedia.org/wiki/Darcy_friction_factor_formulae",
        description: "Darcy-Weisbach friction factor of a link",
        unit: DIMENSIONLESS,
    },
];

/// EPANET engine profile
#[derive(Debug, Clone, Copy, Default)]
pub struct Epanet;

impl EngineProfile for Epanet {
    fn network_type(&self) -> &'static str {
        "EPANET"
    }

    fn node_variables(&self) -> &'static [VariableSpec] {
        NODE_VARIABLES
    }

    fn link_variables(&self) -> &'static [VariableSpec] {
        LINK_VARIABLES
    }

    fn supports_relational(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_catalog() {
        let nodes: Vec<_> = Epanet.node_variables().iter().map(|v| v.key).collect();
        assert_eq!(nodes, ["demand", "head", "pressure", "quality"]);
        assert_eq!(Epanet.link_variables().len(), 7);
        assert_eq!(Epanet.all_variables().len(), 11);
    }
}

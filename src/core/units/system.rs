//! Flow unit systems and physical quantities
//!
//! EPANET reports results in the unit system implied by the network's flow
//! units: US customary for CFS/GPM/MGD/IMGD/AFD, SI-metric for the rest.

use crate::domain::UnitError;
use std::fmt;
use std::str::FromStr;

const FT: f64 = 0.3048;
const US_GALLON_M3: f64 = 3.785_411_784e-3;
const IMP_GALLON_M3: f64 = 4.546_09e-3;
const ACRE_FOOT_M3: f64 = 1_233.481_837_547_52;
const PSI_AS_M_HEAD: f64 = 0.703_249_614_902;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Display unit system, identified by its flow unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSystem {
    /// Cubic feet per second
    Cfs,
    /// US gallons per minute
    Gpm,
    /// Million US gallons per day
    Mgd,
    /// Million imperial gallons per day
    Imgd,
    /// Acre-feet per day
    Afd,
    /// Litres per second
    Lps,
    /// Litres per minute
    Lpm,
    /// Million litres per day
    Mld,
    /// Cubic metres per hour
    Cmh,
    /// Cubic metres per day
    Cmd,
}

impl UnitSystem {
    pub const ALL: [UnitSystem; 10] = [
        UnitSystem::Cfs,
        UnitSystem::Gpm,
        UnitSystem::Mgd,
        UnitSystem::Imgd,
        UnitSystem::Afd,
        UnitSystem::Lps,
        UnitSystem::Lpm,
        UnitSystem::Mld,
        UnitSystem::Cmh,
        UnitSystem::Cmd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnitSystem::Cfs => "CFS",
            UnitSystem::Gpm => "GPM",
            UnitSystem::Mgd => "MGD",
            UnitSystem::Imgd => "IMGD",
            UnitSystem::Afd => "AFD",
            UnitSystem::Lps => "LPS",
            UnitSystem::Lpm => "LPM",
            UnitSystem::Mld => "MLD",
            UnitSystem::Cmh => "CMH",
            UnitSystem::Cmd => "CMD",
        }
    }

    /// Whether lengths, pressures and diameters use US customary units
    pub fn is_us_customary(&self) -> bool {
        matches!(
            self,
            UnitSystem::Cfs | UnitSystem::Gpm | UnitSystem::Mgd | UnitSystem::Imgd | UnitSystem::Afd
        )
    }

    /// One display flow unit expressed in m³/s
    pub fn flow_factor(&self) -> f64 {
        match self {
            UnitSystem::Cfs => FT * FT * FT,
            UnitSystem::Gpm => US_GALLON_M3 / 60.0,
            UnitSystem::Mgd => 1.0e6 * US_GALLON_M3 / SECONDS_PER_DAY,
            UnitSystem::Imgd => 1.0e6 * IMP_GALLON_M3 / SECONDS_PER_DAY,
            UnitSystem::Afd => ACRE_FOOT_M3 / SECONDS_PER_DAY,
            UnitSystem::Lps => 1.0e-3,
            UnitSystem::Lpm => 1.0e-3 / 60.0,
            UnitSystem::Mld => 1.0e6 * 1.0e-3 / SECONDS_PER_DAY,
            UnitSystem::Cmh => 1.0 / 3_600.0,
            UnitSystem::Cmd => 1.0 / SECONDS_PER_DAY,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnitSystem {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        UnitSystem::ALL
            .into_iter()
            .find(|u| u.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnitError::UnknownUnitSystem(s.to_string()))
    }
}

/// Physical quantity being converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Elevation,
    HydraulicHead,
    Length,
    Demand,
    Flow,
    Pressure,
    Velocity,
    /// Unit headloss, per 1000 ft or per 1000 m
    HeadLoss,
    PipeDiameter,
    Volume,
}

impl Quantity {
    /// One display unit of this quantity expressed in canonical SI units
    pub fn si_factor(&self, system: UnitSystem) -> f64 {
        let us = system.is_us_customary();
        match self {
            Quantity::Demand | Quantity::Flow => system.flow_factor(),
            Quantity::Elevation
            | Quantity::HydraulicHead
            | Quantity::Length
            | Quantity::Velocity => {
                if us {
                    FT
                } else {
                    1.0
                }
            }
            Quantity::Pressure => {
                if us {
                    PSI_AS_M_HEAD
                } else {
                    1.0
                }
            }
            Quantity::HeadLoss => 1.0e-3,
            Quantity::PipeDiameter => {
                if us {
                    0.0254
                } else {
                    1.0e-3
                }
            }
            Quantity::Volume => {
                if us {
                    FT * FT * FT
                } else {
                    1.0
                }
            }
        }
    }
}

//! SI to display-unit conversion with rounding

use super::system::{Quantity, UnitSystem};
use crate::domain::UnitError;

/// Default number of decimals kept after conversion
pub const DEFAULT_ROUND_DECIMALS: u32 = 2;

/// Converts a canonical SI value to the display unit of `system`, then rounds.
///
/// A value that cannot be converted is logged and yields `None`, so one bad
/// cell never aborts a batch.
///
/// # Examples
///
/// ```
/// use hydrosync::core::units::{convert, Quantity, UnitSystem};
///
/// // 0.1 m³/s expressed in US gallons per minute
/// assert_eq!(convert(0.1, UnitSystem::Gpm, Quantity::Demand, 2), Some(1585.03));
/// assert_eq!(convert(f64::NAN, UnitSystem::Gpm, Quantity::Demand, 2), None);
/// ```
pub fn convert(value: f64, system: UnitSystem, quantity: Quantity, round_decimals: u32) -> Option<f64> {
    match try_convert(value, system, quantity, round_decimals) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::error!(
                error = %e,
                unit_system = %system,
                quantity = ?quantity,
                "Error converting value from SI to display units"
            );
            None
        }
    }
}

/// Fallible form of [`convert`]
pub fn try_convert(
    value: f64,
    system: UnitSystem,
    quantity: Quantity,
    round_decimals: u32,
) -> Result<f64, UnitError> {
    if !value.is_finite() {
        return Err(UnitError::NonFiniteValue(value));
    }
    let converted = value / quantity.si_factor(system);
    let rounded = round_to(converted, round_decimals);
    if !rounded.is_finite() {
        return Err(UnitError::NonFiniteValue(converted));
    }
    Ok(rounded)
}

/// Converts a display-unit value back to canonical SI
pub fn to_si(value: f64, system: UnitSystem, quantity: Quantity) -> f64 {
    value * quantity.si_factor(system)
}

/// Rounds half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Rounds without unit conversion; non-finite values yield `None`
pub fn round_value(value: f64, decimals: u32) -> Option<f64> {
    if value.is_finite() {
        Some(round_to(value, decimals))
    } else {
        tracing::error!(value = value, "Error rounding non-finite value");
        None
    }
}

/// Formats elapsed seconds as an `H:MM:SS` wall-clock label
///
/// Hours are not wrapped at 24, so `90000` becomes `25:00:00`.
pub fn time_label(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.1, 1585.03 ; "first")]
    #[test_case(0.2, 3170.06 ; "second")]
    #[test_case(0.15, 2377.55 ; "third")]
    fn test_demand_to_gpm(si: f64, expected: f64) {
        assert_eq!(convert(si, UnitSystem::Gpm, Quantity::Demand, 2), Some(expected));
    }

    #[test_case(UnitSystem::Gpm, Quantity::HydraulicHead, 10.0, 32.81 ; "head in feet")]
    #[test_case(UnitSystem::Gpm, Quantity::Pressure, 10.0, 14.22 ; "pressure in psi")]
    #[test_case(UnitSystem::Lps, Quantity::Pressure, 10.0, 10.0 ; "pressure in metres")]
    #[test_case(UnitSystem::Cfs, Quantity::PipeDiameter, 0.3, 11.81 ; "diameter in inches")]
    #[test_case(UnitSystem::Lps, Quantity::PipeDiameter, 0.3, 300.0 ; "diameter in millimetres")]
    #[test_case(UnitSystem::Lps, Quantity::HeadLoss, 0.05, 50.0 ; "headloss per thousand")]
    #[test_case(UnitSystem::Lps, Quantity::Flow, 0.1, 100.0 ; "flow in litres")]
    #[test_case(UnitSystem::Cmh, Quantity::Flow, 0.1, 360.0 ; "flow in cubic metres per hour")]
    fn test_convert_table(system: UnitSystem, quantity: Quantity, si: f64, expected: f64) {
        assert_eq!(convert(si, system, quantity, 2), Some(expected));
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let quantities = [
            Quantity::Elevation,
            Quantity::Demand,
            Quantity::Pressure,
            Quantity::Velocity,
            Quantity::HeadLoss,
            Quantity::PipeDiameter,
        ];
        for system in UnitSystem::ALL {
            for quantity in quantities {
                let display = 123.456_789;
                let si = to_si(display, system, quantity);
                let back = convert(si, system, quantity, 4).unwrap();
                assert!(
                    (back - display).abs() <= 1e-4,
                    "{system} {quantity:?}: {back} vs {display}"
                );
            }
        }
    }

    #[test]
    fn test_non_finite_yields_none() {
        assert_eq!(convert(f64::INFINITY, UnitSystem::Lps, Quantity::Flow, 2), None);
        assert!(matches!(
            try_convert(f64::NAN, UnitSystem::Lps, Quantity::Flow, 2),
            Err(UnitError::NonFiniteValue(_))
        ));
    }

    #[test]
    fn test_round_value() {
        assert_eq!(round_value(1.23456, 2), Some(1.23));
        assert_eq!(round_value(-0.125, 2), Some(-0.13));
        assert_eq!(round_value(f64::NAN, 2), None);
    }

    #[test_case(0, "0:00:00")]
    #[test_case(3600, "1:00:00")]
    #[test_case(7265, "2:01:05")]
    #[test_case(90000, "25:00:00")]
    fn test_time_label(seconds: u64, expected: &str) {
        assert_eq!(time_label(seconds), expected);
    }
}

//! Unit conversion
//!
//! Results are computed in canonical SI units. The relational report tables
//! store them in the network's display units, which depend on its flow units.

pub mod convert;
pub mod system;

pub use convert::{
    convert, round_to, round_value, time_label, to_si, try_convert, DEFAULT_ROUND_DECIMALS,
};
pub use system::{Quantity, UnitSystem};

//! External system integrations for Hydrosync.
//!
//! - [`database`] - Store traits and the resource factory
//! - [`postgresql`] - PostgreSQL report tables
//! - [`frost`] - SensorThings (FROST) server
//!
//! The export core only sees the [`database::ReportStore`] and
//! [`frost::ObservationCatalog`] traits, so both destinations can be replaced
//! by in-memory implementations in tests.

pub mod database;
pub mod frost;
pub mod postgresql;

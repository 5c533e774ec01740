//! Result type alias for Hydrosync

use super::errors::HydroError;

/// Result type alias for Hydrosync operations
///
/// # Examples
///
/// ```
/// use hydrosync::domain::result::Result;
/// use hydrosync::domain::errors::HydroError;
///
/// fn failing_function() -> Result<()> {
///     Err(HydroError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, HydroError>;

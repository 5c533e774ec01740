//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest result id accepted by the report schema (`rpt_cat_result.result_id`)
pub const MAX_RESULT_ID_LEN: usize = 30;

/// Simulation result identifier newtype wrapper
///
/// Correlates every relational row and every remote entity written for one
/// simulation run.
///
/// # Examples
///
/// ```
/// use hydrosync::domain::ids::ResultId;
/// use std::str::FromStr;
///
/// let result_id = ResultId::from_str("sector_a_2025").unwrap();
/// assert_eq!(result_id.as_str(), "sector_a_2025");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResultId(String);

impl ResultId {
    /// Creates a new ResultId from a string
    ///
    /// The id must be non-blank and fit the report schema's column width.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Result ID cannot be empty".to_string());
        }
        if id.chars().count() > MAX_RESULT_ID_LEN {
            return Err(format!(
                "Result ID '{id}' exceeds {MAX_RESULT_ID_LEN} characters"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the result ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResultId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResultId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResultId> for String {
    fn from(id: ResultId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResultId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! JSON `$batch` request codec
//!
//! Requests are sent as `{"requests": [{id, method, url, body}]}` and the
//! server answers `{"responses": [{id, status, ...}]}`. Operations the server
//! does not answer are reported with status 0 so they count as failures.

use super::models::{BatchOperation, OperationOutcome};
use crate::domain::{FrostError, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    responses: Vec<OperationOutcome>,
}

/// Builds the request body for `operations`
pub fn encode_batch(operations: &[BatchOperation]) -> serde_json::Value {
    serde_json::json!({ "requests": operations })
}

/// Matches the server's answers to `operations`, in request order
///
/// # Errors
///
/// Returns an error if the body is not a batch response.
pub fn decode_batch(
    body: serde_json::Value,
    operations: &[BatchOperation],
) -> Result<Vec<OperationOutcome>> {
    let response: BatchResponse = serde_json::from_value(body)
        .map_err(|e| FrostError::InvalidResponse(format!("Malformed batch response: {e}")))?;

    let mut by_id: HashMap<String, OperationOutcome> = response
        .responses
        .into_iter()
        .map(|outcome| (outcome.id.clone(), outcome))
        .collect();

    Ok(operations
        .iter()
        .map(|op| {
            by_id.remove(&op.id).unwrap_or_else(|| OperationOutcome {
                id: op.id.clone(),
                status: 0,
                body: None,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ops() -> Vec<BatchOperation> {
        vec![
            BatchOperation::post("1", "Things", json!({"name": "J1"})),
            BatchOperation::patch("2", "Things(7)", json!({"properties": {"obsolete": true}})),
        ]
    }

    #[test]
    fn test_encode_batch() {
        let body = encode_batch(&ops());
        assert_eq!(body["requests"][0]["method"], "post");
        assert_eq!(body["requests"][1]["url"], "Things(7)");
        assert_eq!(body["requests"][1]["id"], "2");
    }

    #[test]
    fn test_decode_batch_reorders_and_fills_missing() {
        let body = json!({
            "responses": [
                {"id": "2", "status": 200},
            ]
        });
        let outcomes = decode_batch(body, &ops()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].id, "1");
        assert_eq!(outcomes[0].status, 0);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[1].is_success());
    }

    #[test]
    fn test_decode_batch_rejects_garbage() {
        assert!(decode_batch(json!({"responses": "nope"}), &ops()).is_err());
    }
}

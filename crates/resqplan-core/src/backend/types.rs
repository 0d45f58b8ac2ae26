//! Wire types for the backend API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors talking to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Non-2xx response. `message` is the body's `error` field when present.
    #[error("backend returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Decode(String),
}

fn default_valid() -> bool {
    true
}

/// `POST /api/convert` response.
///
/// `valid: false` means the text does not apply to the current context.
/// Older servers reply with only `result` (the generated solver code), which
/// counts as valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertResponse {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ConvertResponse {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            message: None,
            result: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            result: None,
        }
    }
}

/// The `solution` field: an assignment map, or a message when the solver
/// found no optimal solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolutionPayload {
    Values(BTreeMap<String, f64>),
    Message(String),
}

/// `POST /api/optimize` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub solution: SolutionPayload,
    #[serde(default)]
    pub relaxed_constraints: Vec<String>,
}

/// `POST /api/edit_constraint` and `POST /api/delete_constraint` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// `POST /api/view_constraint` response: the solver code generated for one
/// natural-language constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewResponse {
    #[serde(default)]
    pub code: String,
}

/// `{"error": "..."}` bodies sent with 4xx/5xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn convert_response_defaults_to_valid() {
        let resp: ConvertResponse =
            serde_json::from_value(json!({"result": "model.addConstr(x <= 1)"})).unwrap();
        assert!(resp.valid);
        assert!(resp.message.is_none());

        let resp: ConvertResponse =
            serde_json::from_value(json!({"valid": false, "message": "not applicable"})).unwrap();
        assert_eq!(resp, ConvertResponse::rejected("not applicable"));
    }

    #[test]
    fn solution_map_or_message() {
        let resp: OptimizeResponse = serde_json::from_value(json!({
            "solution": {"x(0, 1, 0)": 1.0, "x(1, 0, 2)": 0.9999},
            "relaxed_constraints": ["a"]
        }))
        .unwrap();
        let SolutionPayload::Values(values) = resp.solution else {
            panic!("expected values");
        };
        assert_eq!(values.len(), 2);
        assert_eq!(resp.relaxed_constraints, vec!["a"]);

        let resp: OptimizeResponse = serde_json::from_value(json!({
            "solution": "No se encontró una solución óptima."
        }))
        .unwrap();
        assert!(matches!(resp.solution, SolutionPayload::Message(_)));
        assert!(resp.relaxed_constraints.is_empty());
    }
}

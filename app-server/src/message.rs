//! Wire messages: one JSON object per line in each direction.
//!
//! ```text
//! → {"id":"1","method":"handle","params":{"session_id":"s1","text":"What is 2 + 2?"}}
//! ← {"id":"1","result":{"text":"**Result:** 4"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session used when a request names none.
pub const DEFAULT_SESSION: &str = "default";

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// The server's reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ServerResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The line was not a request.
    ParseError,
    /// No such method.
    MethodNotFound,
    /// Parameters did not fit the method.
    InvalidParams,
    /// The method ran and failed.
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandleParams {
    #[serde(default)]
    pub session_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestToolParams {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetProviderParams {
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetParams {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_params_default_to_null() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"id":"7","method":"list_tools"}"#).unwrap();
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn test_error_response_omits_result() {
        let response = ServerResponse::error("1", ErrorCode::MethodNotFound, "nope");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"id": "1", "error": {"code": "method_not_found", "message": "nope"}})
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: RequestId,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: RequestId,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Request ID can be a string or number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Known RPC method names.
pub mod methods {
    pub const STATUS: &str = "status";
    pub const SHUTDOWN: &str = "shutdown";

    pub const DOCUMENT_CREATE: &str = "document/create";
    pub const DOCUMENT_CREATE_FROM_FILE: &str = "document/create_from_file";
    pub const DOCUMENT_GET: &str = "document/get";
    pub const DOCUMENT_UPDATE: &str = "document/update";
    pub const DOCUMENT_DELETE: &str = "document/delete";

    pub const HISTORY_LIST: &str = "history/list";
    pub const HISTORY_ADD: &str = "history/add";
    pub const HISTORY_TOUCH: &str = "history/touch";
    pub const HISTORY_REMOVE: &str = "history/remove";
    pub const HISTORY_CLEAR: &str = "history/clear";

    pub const CONTENT_CLASSIFY: &str = "content/classify";
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

impl JsonRpcResponse {
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(code: i32, message: impl Into<String>, id: RequestId) -> Self {
        Self::error_with_data(code, message, None, id)
    }

    /// Error response carrying a structured `data` payload (e.g. per-field validation flags).
    pub fn error_with_data(
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
        id: RequestId,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_request() {
        let req = JsonRpcRequest::new(
            methods::DOCUMENT_CREATE,
            Some(serde_json::json!({"input": "{\"a\": 1}"})),
            RequestId::Number(1),
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"document/create\""));
    }

    #[test]
    fn serialize_success_response() {
        let resp = JsonRpcResponse::success(
            serde_json::json!({"id": "abc123DEF456"}),
            RequestId::Number(1),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn serialize_error_response() {
        let resp =
            JsonRpcResponse::error(METHOD_NOT_FOUND, "Method not found", RequestId::Number(1));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("-32601"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn error_with_data_keeps_payload() {
        let resp = JsonRpcResponse::error_with_data(
            INVALID_PARAMS,
            "Missing fields",
            Some(serde_json::json!({"filename": true})),
            RequestId::Number(7),
        );
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert_eq!(err.data.unwrap()["filename"], true);
    }

    #[test]
    fn deserialize_request_with_string_id() {
        let json = r#"{"jsonrpc":"2.0","method":"history/list","params":null,"id":"abc-123"}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }
}

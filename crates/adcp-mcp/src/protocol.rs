// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-RPC 2.0 and MCP wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol revision this server speaks.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC 2.0 request. Numeric ids are tolerated.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request id, coerced to a string.
    #[serde(default, deserialize_with = "adcp_core::task::deserialize_lenient_id")]
    pub id: Option<String>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric code.
    pub code: i64,
    /// Message.
    pub message: String,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Echo of the request id.
    pub id: Option<String>,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    #[must_use]
    pub fn success(id: Option<String>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    #[must_use]
    pub fn error(id: Option<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name (the skill name).
    pub name: String,
    /// Human description.
    pub description: String,
    /// JSON Schema of the tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One content block of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Display text.
    Text {
        /// The text.
        text: String,
    },
}

/// `tools/call` result: display text plus the full AdCP payload in the
/// structured-content channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Display blocks.
    pub content: Vec<ToolContent>,
    /// The AdCP response payload. Domain errors live inside its `errors`
    /// array.
    #[serde(rename = "structuredContent")]
    pub structured_content: Value,
    /// True for tool-level failures.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_coerced() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/list",
        }))
        .unwrap();
        assert_eq!(request.id.as_deref(), Some("3"));
    }

    #[test]
    fn tool_result_serializes_structured_content() {
        let result = CallToolResult {
            content: vec![ToolContent::Text {
                text: "Found 2 product(s)".into(),
            }],
            structured_content: json!({"products": []}),
            is_error: false,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert!(json["structuredContent"].get("products").is_some());
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC envelopes and MCP payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::types::ToolDefinition;

/// MCP protocol revision spoken by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "mcp-server-gemini";

/// Id used when a line could not be parsed far enough to recover the real one.
pub const UNKNOWN_ID: &str = "unknown";

/// Inbound request. `method` is optional here so that a well-formed JSON
/// object without one can still be answered with its id.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Id to echo back; `null` when the request carried none.
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    /// Notifications carry no id and never get a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
            && self
                .method
                .as_deref()
                .is_some_and(|m| m.starts_with("notifications/"))
    }
}

/// Outbound response. Exactly one of `result` / `error` is set; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Serialize as a single protocol line, newline included.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|err| {
            // Only reachable if a handler produced a non-serializable float.
            json!({
                "jsonrpc": "2.0",
                "id": self.id,
                "error": {"code": crate::error::codes::INTERNAL_ERROR, "message": err.to_string()},
            })
            .to_string()
        });
        line.push('\n');
        line
    }
}

/// Outcome of decoding one input line.
#[derive(Debug)]
pub enum Decoded {
    /// Blank line, ignored.
    Empty,
    Request(Request),
    /// Not valid JSON, or not an object.
    Malformed(String),
}

/// Decode one newline-delimited record.
pub fn decode_line(line: &str) -> Decoded {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Decoded::Empty;
    }
    match serde_json::from_str::<Request>(trimmed) {
        Ok(request) => Decoded::Request(request),
        Err(err) => Decoded::Malformed(err.to_string()),
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Result of `initialize`.
pub fn initialize_result(version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": version,
        },
        "capabilities": {
            "tools": { "listChanged": false }
        }
    })
}

/// Result of `tools/list`.
pub fn tools_list_result(tools: &[ToolDefinition]) -> Value {
    json!({ "tools": tools })
}

/// Result of a successful `tools/call`.
pub fn tool_call_result(text: String) -> Value {
    json!({
        "content": [
            { "type": "text", "text": text }
        ]
    })
}

//! A2A wire types
//!
//! JSON-RPC 2.0 envelope plus the message/part/card model exchanged with
//! remote agents. Everything here is strictly typed; the only place loose
//! JSON is tolerated is [`normalize_reply`], which folds the reply shapes
//! observed across real A2A servers into one representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::ProtocolError;

/// JSON-RPC 2.0 version string
pub const JSONRPC_VERSION: &str = "2.0";

/// The one RPC method the harness speaks
pub const METHOD_MESSAGE_SEND: &str = "message/send";

/// Well-known discovery path, relative to the agent endpoint
pub const AGENT_CARD_PATH: &str = ".well-known/agent-card.json";

/// JSON-RPC Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// JSON-RPC Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Request ID (string, number, or null)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// JSON-RPC Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid request")
    }

    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }
}

/// Message role on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Agent,
}

/// One content part of a wire message. Exactly one payload field is set.
///
/// File parts exist on the wire but carry no meaning for this harness; the
/// translation layer ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File { file: Value },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn data(data: Value) -> Self {
        Part::Data { data }
    }

    /// Text payload, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Data payload, if this is a data part.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Part::Data { data } => Some(data),
            _ => None,
        }
    }
}

/// A protocol message: the `params.message` of a `message/send` call, and
/// the payload of most reply shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub message_id: String,
    pub role: WireRole,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl WireMessage {
    /// Build an outgoing user message with a fresh message id.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            role: WireRole::User,
            parts,
            context_id: None,
            task_id: None,
            metadata: None,
        }
    }

    /// Build an agent reply with a fresh message id.
    pub fn agent(parts: Vec<Part>) -> Self {
        Self {
            role: WireRole::Agent,
            ..Self::user(parts)
        }
    }

    pub fn with_context_id(mut self, context_id: Option<String>) -> Self {
        self.context_id = context_id;
        self
    }
}

/// Advertised capabilities from an agent card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

/// Skill metadata on an agent card (informational only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Agent capability document served at `/.well-known/agent-card.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<AgentSkill>>,
}

/// A reply folded into one canonical form, whatever shape the server chose.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReply {
    pub parts: Vec<Part>,
    pub context_id: Option<String>,
}

impl NormalizedReply {
    /// All text payloads joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All data payloads, in part order.
    pub fn data_payloads(&self) -> Vec<&Value> {
        self.parts.iter().filter_map(Part::as_data).collect()
    }
}

/// Fold a JSON-RPC `result` into a [`NormalizedReply`].
///
/// Servers in the wild answer `message/send` with one of:
/// 1. a full message object with `role: "agent"` and `parts`;
/// 2. a bare `{"parts": [...]}`;
/// 3. a plain string;
/// 4. a `{"message": {...}}` wrapper;
/// 5. a task object whose terminal message sits under `artifacts`,
///    `status.message`, or the last agent entry of `history`.
///
/// Anything else is a [`ProtocolError::Malformed`].
pub fn normalize_reply(result: &Value) -> Result<NormalizedReply, ProtocolError> {
    if let Value::String(text) = result {
        return Ok(NormalizedReply {
            parts: vec![Part::text(text.clone())],
            context_id: None,
        });
    }

    let obj = result
        .as_object()
        .ok_or_else(|| ProtocolError::Malformed(format!("reply result is {}", kind_of(result))))?;

    let top_context = string_field(result, "contextId");

    // Shapes 1 and 2: parts at the top level.
    if let Some(parts) = obj.get("parts") {
        return Ok(NormalizedReply {
            parts: parse_parts(parts)?,
            context_id: top_context,
        });
    }

    // Shape 4: wrapped message.
    if let Some(message) = obj.get("message").filter(|m| m.get("parts").is_some()) {
        let context_id = string_field(message, "contextId").or(top_context);
        return Ok(NormalizedReply {
            parts: parse_parts(&message["parts"])?,
            context_id,
        });
    }

    // Shape 5a: task object with artifacts.
    if let Some(artifacts) = obj.get("artifacts").and_then(Value::as_array) {
        let mut parts = Vec::new();
        for artifact in artifacts {
            if let Some(p) = artifact.get("parts") {
                parts.extend(parse_parts(p)?);
            }
        }
        if !parts.is_empty() {
            return Ok(NormalizedReply {
                parts,
                context_id: top_context,
            });
        }
    }

    // Shape 5b: task object with a terminal status message.
    if let Some(message) = obj
        .get("status")
        .and_then(|s| s.get("message"))
        .filter(|m| m.get("parts").is_some())
    {
        let context_id = string_field(message, "contextId").or(top_context);
        return Ok(NormalizedReply {
            parts: parse_parts(&message["parts"])?,
            context_id,
        });
    }

    // Shape 5c: task object with history; take the last agent message.
    if let Some(history) = obj.get("history").and_then(Value::as_array) {
        for entry in history.iter().rev() {
            if string_field(entry, "role").as_deref() == Some("agent") {
                if let Some(parts) = entry.get("parts") {
                    let context_id = string_field(entry, "contextId").or(top_context);
                    return Ok(NormalizedReply {
                        parts: parse_parts(parts)?,
                        context_id,
                    });
                }
            }
        }
    }

    Err(ProtocolError::Malformed(format!(
        "no recognised reply shape; result keys: [{}]",
        obj.keys().cloned().collect::<Vec<_>>().join(", ")
    )))
}

fn parse_parts(parts: &Value) -> Result<Vec<Part>, ProtocolError> {
    serde_json::from_value(parts.clone())
        .map_err(|e| ProtocolError::Malformed(format!("unparseable parts array: {e}")))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

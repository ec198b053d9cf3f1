//! Conversation message model
//!
//! The native message types the orchestrator and the evaluator adapter trade
//! in. The wire protocol never sees these directly; the `translation` module
//! converts between this model and `a2a::wire` messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A tool invocation requested by the assistant.
///
/// `id` is stable for the lifetime of a task so tool results can be matched
/// back to the call that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Argument object, keyed by parameter name.
    pub arguments: Value,
    #[serde(default = "default_requestor")]
    pub requestor: String,
}

fn default_requestor() -> String {
    "assistant".to_string()
}

impl ToolCall {
    /// Create a tool call with a fresh id.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, arguments)
    }

    /// Create a tool call with an explicit id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            requestor: default_requestor(),
        }
    }
}

/// An assistant turn.
///
/// Invariant: carries either non-empty `content` or a non-empty `tool_calls`
/// list, never both. Construct through [`AssistantMessage::text`] or
/// [`AssistantMessage::tool_calls`] to stay on the right side of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl AssistantMessage {
    /// A plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// A tool-call reply.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(calls),
        }
    }

    /// Whether this turn carries usable text.
    pub fn has_text(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Whether this turn requests tool execution.
    pub fn is_tool_call(&self) -> bool {
        self.tool_calls.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Output of one executed tool, fed back to the agent as a result turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
    /// Set when the tool itself failed; the content then carries the error.
    #[serde(default)]
    pub error: bool,
}

impl ToolOutput {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            error: false,
        }
    }

    pub fn failed(mut self) -> Self {
        self.error = true;
        self
    }
}

/// One turn in a task transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User { content: String },
    Assistant(AssistantMessage),
    Tool(ToolOutput),
    System { content: String },
    /// Several tool results delivered as one turn, e.g. after the assistant
    /// issued parallel calls.
    MultiTool { tool_messages: Vec<ToolOutput> },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn assistant(message: AssistantMessage) -> Self {
        Message::Assistant(message)
    }

    pub fn tool(output: ToolOutput) -> Self {
        Message::Tool(output)
    }

    pub fn multi_tool(tool_messages: Vec<ToolOutput>) -> Self {
        Message::MultiTool { tool_messages }
    }

    /// Wire-level role label for this turn.
    pub fn role(&self) -> &'static str {
        match self {
            Message::User { .. } => "user",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
            Message::System { .. } => "system",
            Message::MultiTool { .. } => "multi_tool",
        }
    }
}

/// Description of a tool the remote agent may request, as handed to the
/// evaluator adapter by the domain environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_text_xor_tool_calls() {
        let text = AssistantMessage::text("hello");
        assert!(text.has_text());
        assert!(!text.is_tool_call());

        let call = AssistantMessage::tool_calls(vec![ToolCall::new("lookup", json!({}))]);
        assert!(!call.has_text());
        assert!(call.is_tool_call());
    }

    #[test]
    fn test_tool_call_ids_are_unique() {
        let a = ToolCall::new("x", json!({}));
        let b = ToolCall::new("x", json!({}));
        assert_ne!(a.id, b.id);
        assert_eq!(a.requestor, "assistant");
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::user("hi").role(), "user");
        assert_eq!(Message::system("s").role(), "system");
        assert_eq!(
            Message::multi_tool(vec![ToolOutput::new("1", "t", "ok")]).role(),
            "multi_tool"
        );
    }

    #[test]
    fn test_message_serde_round_trip() {
        let msg = Message::Assistant(AssistantMessage::tool_calls(vec![ToolCall::with_id(
            "call-1",
            "search_flights",
            json!({"origin": "SFO"}),
        )]));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["tool_calls"][0]["name"], "search_flights");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }
}

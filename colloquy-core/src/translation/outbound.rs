//! Native transcript to wire message

use serde_json::json;

use crate::a2a::wire::{Part, WireMessage};
use crate::message::{AssistantMessage, Message, ToolCall, ToolDefinition, ToolOutput};

/// Fixed sentence telling the agent how to request a tool call.
const TOOL_CALL_INSTRUCTION: &str = r#"To use a tool, respond with JSON: {"tool_call": {"name": "tool_name", "arguments": {"param1": "value1"}}}"#;

/// Render the tool catalog as an `<available_tools>` text block.
///
/// Schemas always travel as text; the protocol has no standard tool-calling
/// extension and plain text keeps heterogeneous agents interoperable.
pub fn render_tool_catalog(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut lines = vec!["<available_tools>".to_string()];

    for tool in tools {
        let properties = tool.parameters.get("properties").and_then(|p| p.as_object());
        let required: Vec<&str> = tool
            .parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let mut signature_params = Vec::new();
        if let Some(props) = properties {
            for (name, schema) in props {
                let param_type = schema.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                signature_params.push(format!("{name}: {param_type}"));
            }
        }

        lines.push(format!("- {}({})", tool.name, signature_params.join(", ")));
        lines.push(format!("  Description: {}", tool.description));

        if let Some(props) = properties.filter(|p| !p.is_empty()) {
            lines.push("  Parameters:".to_string());
            for (name, schema) in props {
                let param_type = schema.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                let description = schema
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or("No description");
                let requirement = if required.contains(&name.as_str()) {
                    "required"
                } else {
                    "optional"
                };
                lines.push(format!(
                    "    - {name} ({param_type}, {requirement}): {description}"
                ));
            }
        }

        lines.push(String::new());
    }

    lines.push("</available_tools>".to_string());
    lines.push(String::new());
    lines.push(TOOL_CALL_INSTRUCTION.to_string());

    lines.join("\n")
}

/// Concatenate the transcript's system turns into one `<system>` block.
pub fn system_block(history: &[Message]) -> Option<String> {
    let contents: Vec<&str> = history
        .iter()
        .filter_map(|m| match m {
            Message::System { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();

    if contents.is_empty() {
        None
    } else {
        Some(format!("<system>\n{}\n</system>", contents.join("\n\n")))
    }
}

/// Serialise the non-system turns, one line per turn, in order.
pub fn render_transcript(history: &[Message]) -> String {
    let mut lines = Vec::new();
    for message in history {
        match message {
            Message::System { .. } => {}
            Message::User { content } => lines.push(format!("User: {content}")),
            Message::Assistant(assistant) => lines.push(assistant_line(assistant)),
            Message::Tool(output) => lines.push(tool_result_line(output)),
            Message::MultiTool { tool_messages } => {
                lines.extend(tool_messages.iter().map(tool_result_line));
            }
        }
    }
    lines.join("\n")
}

fn assistant_line(assistant: &AssistantMessage) -> String {
    if let Some(calls) = assistant.tool_calls.as_deref().filter(|c| !c.is_empty()) {
        format!("Assistant: {}", tool_calls_json(calls))
    } else {
        format!("Assistant: {}", assistant.content.as_deref().unwrap_or(""))
    }
}

fn tool_result_line(output: &ToolOutput) -> String {
    if output.error {
        format!("Tool Result ({}): ERROR: {}", output.tool_name, output.content)
    } else {
        format!("Tool Result ({}): {}", output.tool_name, output.content)
    }
}

/// Canonical JSON form for one or more tool calls, matching the format the
/// agent is instructed to reply with.
fn tool_calls_json(calls: &[ToolCall]) -> String {
    let wrapped: Vec<serde_json::Value> = calls
        .iter()
        .map(|call| {
            json!({"tool_call": {"id": call.id, "name": call.name, "arguments": call.arguments}})
        })
        .collect();

    let value = if wrapped.len() == 1 {
        wrapped.into_iter().next().unwrap_or_default()
    } else {
        json!({ "tool_calls": wrapped })
    };
    value.to_string()
}

/// Build the outgoing wire message for one turn: system prelude, tool
/// catalog, transcript, all as a single text part.
pub fn build_outbound(
    history: &[Message],
    tools: &[ToolDefinition],
    context_id: Option<&str>,
) -> WireMessage {
    let mut blocks = Vec::new();

    if let Some(system) = system_block(history) {
        blocks.push(system);
    }
    if !tools.is_empty() {
        blocks.push(render_tool_catalog(tools));
    }
    let transcript = render_transcript(history);
    if !transcript.is_empty() {
        blocks.push(transcript);
    }

    WireMessage::user(vec![Part::text(blocks.join("\n\n"))])
        .with_context_id(context_id.map(str::to_string))
}

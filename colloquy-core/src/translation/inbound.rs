//! Wire reply to native assistant message

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::a2a::wire::NormalizedReply;
use crate::message::{AssistantMessage, ToolCall};

/// Substitute content for a reply that carried neither text nor tool calls.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I apologize, but I was unable to generate a response. Could you please rephrase your request?";

/// Parse a normalised reply into an assistant message plus the contextId the
/// server issued.
///
/// Extraction priority: tool calls in `data` parts win outright; only when
/// none are present is the text buffer scanned for an embedded JSON call.
/// The result always satisfies the text-XOR-tool-calls invariant.
pub fn parse_reply(reply: &NormalizedReply) -> (AssistantMessage, Option<String>) {
    let mut calls: Vec<ToolCall> = reply
        .data_payloads()
        .into_iter()
        .filter_map(tool_calls_from_value)
        .flatten()
        .collect();

    let content = if calls.is_empty() {
        let (extracted, cleaned) = extract_tool_calls(&reply.text());
        calls = extracted;
        cleaned
    } else {
        reply.text()
    };

    let assistant = if !calls.is_empty() {
        if !content.trim().is_empty() {
            tracing::warn!(
                dropped_chars = content.len(),
                "reply carried both text and tool calls; keeping the tool calls"
            );
        }
        AssistantMessage::tool_calls(calls)
    } else if content.trim().is_empty() {
        tracing::warn!("agent returned an empty reply; substituting fallback content");
        AssistantMessage::text(EMPTY_REPLY_FALLBACK)
    } else {
        AssistantMessage::text(content)
    };

    (assistant, reply.context_id.clone())
}

/// Pull tool calls out of free text.
///
/// Returns the extracted calls and the text with the matched JSON removed.
/// When the whole buffer (possibly fenced) is one call object the cleaned
/// text is empty; otherwise the first balanced object of the right shape is
/// lifted out in place.
pub fn extract_tool_calls(text: &str) -> (Vec<ToolCall>, String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (Vec::new(), String::new());
    }

    // Whole-buffer parse first; agents often reply with nothing but the call,
    // sometimes fenced.
    let candidate = strip_code_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(candidate.trim()) {
        if let Some(calls) = tool_calls_from_value(&value) {
            return (calls, String::new());
        }
    }

    // Otherwise scan for the first balanced object with the tool-call shape.
    for (index, _) in text.match_indices('{') {
        let Some(object) = balanced_object_at(text, index) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(object) else {
            continue;
        };
        if let Some(calls) = tool_calls_from_value(&value) {
            let mut cleaned = String::with_capacity(text.len() - object.len());
            cleaned.push_str(&text[..index]);
            cleaned.push_str(&text[index + object.len()..]);
            return (calls, cleaned.trim().to_string());
        }
    }

    (Vec::new(), text.to_string())
}

/// Interpret a JSON value as tool calls, if it has the agreed shape:
/// `{"tool_call": {...}}` or `{"tool_calls": [{"tool_call": {...}}, ...]}`.
fn tool_calls_from_value(value: &Value) -> Option<Vec<ToolCall>> {
    if let Some(call) = value.get("tool_call") {
        return single_call(call).map(|c| vec![c]);
    }

    if let Some(entries) = value.get("tool_calls").and_then(Value::as_array) {
        let calls: Vec<ToolCall> = entries
            .iter()
            .filter_map(|entry| entry.get("tool_call").and_then(single_call))
            .collect();
        if !calls.is_empty() {
            return Some(calls);
        }
    }

    None
}

fn single_call(call: &Value) -> Option<ToolCall> {
    let name = call.get("name")?.as_str()?;
    let arguments = call.get("arguments")?;
    if !arguments.is_object() {
        return None;
    }
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    Some(ToolCall::with_id(id, name, arguments.clone()))
}

/// Unwrap a ```json fenced block, if the text is one.
fn strip_code_fence(input: &str) -> &str {
    static CODE_FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```$").unwrap());

    match CODE_FENCE_RE.captures(input) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input,
    }
}

/// The balanced `{...}` starting at byte offset `start`, string- and
/// escape-aware. `None` when the object never closes.
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

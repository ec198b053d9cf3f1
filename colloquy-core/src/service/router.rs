//! LLM-backed request controller
//!
//! Incoming natural-language requests are routed by a controller LLM that
//! picks a tool from the surface, invokes it, and writes up the outcome.
//! Tool calls are parsed out of the LLM's text with the same extractor the
//! evaluator adapter uses on remote-agent replies.

use std::sync::Arc;

use crate::error::Result;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::message::ToolCall;
use crate::service::session::ControllerSession;
use crate::service::tools::ServiceTool;
use crate::translation;

/// Base instructions for the controller, ahead of the tool catalog.
const CONTROLLER_INSTRUCTIONS: &str = "\
You are a conversational-agent evaluation service.

You can evaluate other conversational agents across several customer service
domains: airline (flight booking, modifications, cancellations), retail
(product orders, returns, exchanges), telecom (technical support, billing
issues), and mock (simple test scenarios).

When a user requests an evaluation:
1. Clarify the evaluation parameters (domain, agent endpoint, number of tasks)
2. Use the run_evaluation tool to execute the evaluation
3. Provide clear, actionable feedback on agent performance
4. Offer to retrieve detailed results using get_evaluation_results

Be helpful in explaining evaluation metrics and suggesting improvements.";

/// Upper bound on tool rounds per incoming message; past it the last LLM
/// text is returned as-is.
const MAX_TOOL_ROUNDS: u32 = 4;

/// Controller that routes one session's requests through the tool surface.
pub struct LlmRouter {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<Arc<dyn ServiceTool>>,
}

impl LlmRouter {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Vec<Arc<dyn ServiceTool>>) -> Self {
        Self { provider, tools }
    }

    pub fn tools(&self) -> &[Arc<dyn ServiceTool>] {
        &self.tools
    }

    fn system_prompt(&self) -> String {
        let definitions: Vec<_> = self.tools.iter().map(|t| t.definition()).collect();
        let catalog = translation::render_tool_catalog(&definitions);
        if catalog.is_empty() {
            CONTROLLER_INSTRUCTIONS.to_string()
        } else {
            format!("{CONTROLLER_INSTRUCTIONS}\n\n{catalog}")
        }
    }

    /// Handle one user message within `session`, running tools as the LLM
    /// requests them, and return the final reply text.
    pub async fn handle(&self, session: &mut ControllerSession, user_text: &str) -> Result<String> {
        session.messages.push(ChatMessage::user(user_text));

        let mut rounds = 0u32;
        loop {
            let mut messages = vec![ChatMessage::system(self.system_prompt())];
            messages.extend(session.messages.iter().cloned());

            let response = self.provider.chat(&ChatRequest::new(messages)).await?;
            let (calls, _) = translation::extract_tool_calls(&response.content);

            if calls.is_empty() {
                session.messages.push(ChatMessage::assistant(response.content.as_str()));
                session.turn_count += 1;
                return Ok(response.content);
            }

            if rounds >= MAX_TOOL_ROUNDS {
                tracing::warn!(
                    context_id = %session.context_id,
                    rounds,
                    "tool round limit reached; returning the last reply unprocessed"
                );
                session.messages.push(ChatMessage::assistant(response.content.as_str()));
                session.turn_count += 1;
                return Ok(response.content);
            }

            session.messages.push(ChatMessage::assistant(response.content.as_str()));

            for call in calls {
                let result_text = self.execute_tool(&call).await;
                session
                    .messages
                    .push(ChatMessage::user(format!(
                        "Tool Result ({}): {result_text}",
                        call.name
                    )));
            }
            rounds += 1;
        }
    }

    async fn execute_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.definition().name == call.name)
        else {
            tracing::warn!(tool = %call.name, "controller requested an unknown tool");
            return format!("ERROR: unknown tool '{}'", call.name);
        };

        tracing::info!(tool = %call.name, "executing service tool");

        match tool.execute(call.arguments.clone()).await {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            Err(e) if e.retryable => {
                format!("ERROR: {e} (you may correct the arguments and retry)")
            }
            Err(e) => format!("ERROR: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ColloquyError;
    use crate::llm::ChatResponse;
    use crate::message::ToolDefinition;
    use crate::service::tools::ToolError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Provider that replays a fixed sequence of replies.
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            let mut replies = self.replies.lock().unwrap();
            let content = replies
                .pop()
                .ok_or_else(|| ColloquyError::Llm("script exhausted".into()))?;
            Ok(ChatResponse {
                content,
                usage: None,
            })
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ServiceTool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                "echo",
                "Echoes its arguments",
                json!({"type": "object", "properties": {"msg": {"type": "string"}}}),
            )
        }

        async fn execute(&self, args: Value) -> std::result::Result<Value, ToolError> {
            Ok(json!({"echo": args["msg"]}))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ServiceTool for FailingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("broken", "Always fails", json!({"type": "object"}))
        }

        async fn execute(&self, _args: Value) -> std::result::Result<Value, ToolError> {
            Err(ToolError::invalid("missing required argument"))
        }
    }

    #[tokio::test]
    async fn test_plain_text_passthrough() {
        let provider = ScriptedProvider::new(&["Hello! How can I help?"]);
        let router = LlmRouter::new(provider, vec![Arc::new(EchoTool)]);
        let mut session = ControllerSession::new("ctx-1");

        let reply = router.handle(&mut session, "hi").await.unwrap();
        assert_eq!(reply, "Hello! How can I help?");
        assert_eq!(session.turn_count, 1);
        // user + assistant
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let provider = ScriptedProvider::new(&[
            r#"{"tool_call": {"name": "echo", "arguments": {"msg": "ping"}}}"#,
            "The echo returned ping.",
        ]);
        let router = LlmRouter::new(provider, vec![Arc::new(EchoTool)]);
        let mut session = ControllerSession::new("ctx-1");

        let reply = router.handle(&mut session, "echo ping").await.unwrap();
        assert_eq!(reply, "The echo returned ping.");

        // The tool result was fed back into the conversation.
        let fed_back = session
            .messages
            .iter()
            .any(|m| m.content.starts_with("Tool Result (echo):"));
        assert!(fed_back);
    }

    #[tokio::test]
    async fn test_tool_error_is_fed_back_for_retry() {
        let provider = ScriptedProvider::new(&[
            r#"{"tool_call": {"name": "broken", "arguments": {}}}"#,
            "Sorry, that did not work.",
        ]);
        let router = LlmRouter::new(provider, vec![Arc::new(FailingTool)]);
        let mut session = ControllerSession::new("ctx-1");

        let reply = router.handle(&mut session, "do it").await.unwrap();
        assert_eq!(reply, "Sorry, that did not work.");

        let error_line = session
            .messages
            .iter()
            .find(|m| m.content.contains("ERROR: missing required argument"))
            .expect("tool error should be in the transcript");
        assert!(error_line.content.contains("retry"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let provider = ScriptedProvider::new(&[
            r#"{"tool_call": {"name": "nope", "arguments": {}}}"#,
            "I cannot do that.",
        ]);
        let router = LlmRouter::new(provider, vec![Arc::new(EchoTool)]);
        let mut session = ControllerSession::new("ctx-1");

        router.handle(&mut session, "x").await.unwrap();
        assert!(session
            .messages
            .iter()
            .any(|m| m.content.contains("unknown tool 'nope'")));
    }

    #[tokio::test]
    async fn test_round_limit_stops_the_loop() {
        let call = r#"{"tool_call": {"name": "echo", "arguments": {"msg": "again"}}}"#;
        // One more scripted call than the limit allows.
        let replies = vec![call; (MAX_TOOL_ROUNDS + 1) as usize];
        let provider = ScriptedProvider::new(&replies);
        let router = LlmRouter::new(provider, vec![Arc::new(EchoTool)]);
        let mut session = ControllerSession::new("ctx-1");

        let reply = router.handle(&mut session, "loop").await.unwrap();
        assert_eq!(reply, call);
    }

    #[test]
    fn test_system_prompt_embeds_catalog() {
        let provider = ScriptedProvider::new(&[]);
        let router = LlmRouter::new(provider, vec![Arc::new(EchoTool)]);
        let prompt = router.system_prompt();
        assert!(prompt.contains("evaluation service"));
        assert!(prompt.contains("<available_tools>"));
        assert!(prompt.contains("- echo(msg: string)"));
    }
}

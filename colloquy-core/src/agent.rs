//! Remote evaluator adapter
//!
//! [`RemoteAgent`] makes an A2A endpoint look like a local conversational
//! agent to the orchestrator: it owns the per-task [`TaskSession`], renders
//! the transcript onto the wire, and parses replies back. The orchestrator's
//! contract is synchronous while the protocol client is async, so every
//! exchange crosses the runtime bridge in [`RemoteAgent::bridge_io`].

use std::future::Future;

use crate::a2a::{A2aClient, AgentCard, ClientConfig, DiscoveryError};
use crate::error::{ColloquyError, Result};
use crate::harness::ConversationalAgent;
use crate::message::{AssistantMessage, Message, ToolDefinition};
use crate::metrics::{AggregatedMetrics, RequestMetric};
use crate::translation;

/// Fixed prelude prepended to the domain policy in the system turn.
const SYSTEM_PRELUDE: &str = "You are a customer service agent. Follow the domain policy below \
exactly. Use the available tools to look up and change state; never invent data.";

/// Per-task conversation state. Created fresh for every task, never shared;
/// this is the isolation boundary between concurrent evaluations.
#[derive(Debug, Clone, Default)]
pub struct TaskSession {
    /// Server-issued context, unset until the first reply arrives and echoed
    /// on every later message of the task.
    pub context_id: Option<String>,

    /// Full ordered transcript, including the system prelude.
    pub history: Vec<Message>,

    /// Agent card cached after discovery.
    pub card: Option<AgentCard>,

    pub request_count: u32,
}

/// Conversational agent backed by a remote A2A endpoint.
pub struct RemoteAgent {
    client: A2aClient,
    tools: Vec<ToolDefinition>,
    domain_policy: String,
}

impl RemoteAgent {
    pub fn new(
        config: ClientConfig,
        tools: Vec<ToolDefinition>,
        domain_policy: impl Into<String>,
    ) -> Self {
        let agent = Self {
            client: A2aClient::new(config),
            tools,
            domain_policy: domain_policy.into(),
        };

        tracing::info!(
            endpoint = %agent.client.config().endpoint(),
            timeout_secs = agent.client.config().timeout_secs(),
            num_tools = agent.tools.len(),
            "initialized remote agent"
        );

        agent
    }

    pub fn client(&self) -> &A2aClient {
        &self.client
    }

    /// Discover the remote agent and cache its card; call once per
    /// evaluation run to revalidate the endpoint before tasks start.
    pub fn discover(&self) -> std::result::Result<AgentCard, DiscoveryError> {
        match self.bridge_io(self.client.refresh_card()) {
            Ok(result) => result,
            Err(e) => Err(DiscoveryError::Unreachable(e.to_string())),
        }
    }

    /// All protocol metrics recorded so far.
    pub fn protocol_metrics(&self) -> Vec<RequestMetric> {
        self.client.metrics()
    }

    pub fn aggregated_metrics(&self) -> AggregatedMetrics {
        self.client.recorder().aggregate()
    }

    /// Metrics in the JSON shape evaluation results embed.
    pub fn export_metrics(&self, task_id: Option<&str>) -> serde_json::Value {
        self.client.recorder().export(task_id)
    }

    pub fn clear_metrics(&self) {
        self.client.clear_metrics();
    }

    fn system_prompt(&self) -> String {
        if self.domain_policy.trim().is_empty() {
            SYSTEM_PRELUDE.to_string()
        } else {
            format!("{SYSTEM_PRELUDE}\n\n{}", self.domain_policy)
        }
    }

    /// Run async protocol I/O to completion from a blocking caller.
    ///
    /// Two contexts reach this method. When no runtime is active on the
    /// calling thread, a throwaway current-thread runtime drives the future.
    /// When the caller is already inside a runtime (the evaluation service
    /// front-end calling back into the orchestrator), blocking that runtime
    /// on a nested one would deadlock, so the future runs on a worker thread
    /// that owns its own runtime while the calling thread parks on the join.
    fn bridge_io<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        fn run_on_fresh_runtime<F>(future: F) -> Result<F::Output>
        where
            F: Future,
        {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| {
                    ColloquyError::Other(format!("failed to build bridge runtime: {e}"))
                })?;
            Ok(runtime.block_on(future))
        }

        match tokio::runtime::Handle::try_current() {
            Err(_) => run_on_fresh_runtime(future),
            Ok(_) => std::thread::scope(|scope| {
                let worker = scope.spawn(|| run_on_fresh_runtime(future));
                match worker.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }),
        }
    }
}

impl ConversationalAgent for RemoteAgent {
    type State = TaskSession;

    fn init_state(&self, prior_history: Option<Vec<Message>>) -> TaskSession {
        let mut history = vec![Message::system(self.system_prompt())];
        if let Some(prior) = prior_history {
            history.extend(prior);
        }

        TaskSession {
            context_id: None,
            history,
            card: None,
            request_count: 0,
        }
    }

    fn generate_next_message(
        &self,
        input: Message,
        mut session: TaskSession,
    ) -> Result<(AssistantMessage, TaskSession)> {
        // Multi-tool turns unpack into their constituent results.
        match input {
            Message::MultiTool { tool_messages } => {
                session
                    .history
                    .extend(tool_messages.into_iter().map(Message::Tool));
            }
            other => session.history.push(other),
        }

        let wire = translation::build_outbound(
            &session.history,
            &self.tools,
            session.context_id.as_deref(),
        );

        tracing::debug!(
            context_id = session.context_id.as_deref(),
            request_count = session.request_count,
            history_len = session.history.len(),
            "sending task turn"
        );

        let reply = self.bridge_io(self.client.send_message(&wire))??;
        let (assistant, reply_context) = translation::parse_reply(&reply);

        if let Some(new_context) = reply_context {
            if let Some(old) = session.context_id.as_deref() {
                if old != new_context {
                    tracing::warn!(
                        old_context = old,
                        new_context = %new_context,
                        "context changed mid-task; adopting the new one"
                    );
                }
            }
            session.context_id = Some(new_context);
        }

        session.history.push(Message::Assistant(assistant.clone()));
        session.request_count += 1;
        if session.card.is_none() {
            session.card = self.client.agent_card();
        }

        Ok((assistant, session))
    }

    fn stop(&self, _state: &TaskSession) {
        // Connections never outlive a call, so there is nothing to close.
        tracing::debug!("remote agent stopped");
    }
}

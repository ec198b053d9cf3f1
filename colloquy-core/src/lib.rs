//! # Colloquy - Conversational-Agent Evaluation over A2A
//!
//! Colloquy drives an external agent-under-test through scripted customer
//! service scenarios and scores its behaviour. It speaks the A2A protocol in
//! both directions:
//!
//! - **outbound**, the [`agent::RemoteAgent`] adapter makes a remote A2A
//!   endpoint look like a local conversational agent to the orchestrator,
//!   translating transcripts onto the wire and tool calls back out of
//!   replies;
//! - **inbound**, the [`service::EvaluationService`] front-end accepts
//!   natural-language evaluation requests over the same protocol and routes
//!   them through an LLM-backed controller onto the tool surface.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use colloquy_core::a2a::ClientConfig;
//! use colloquy_core::agent::RemoteAgent;
//! use colloquy_core::harness::ConversationalAgent;
//! use colloquy_core::message::Message;
//!
//! fn main() -> colloquy_core::error::Result<()> {
//!     let config = ClientConfig::new("http://agent.example.com")?
//!         .with_timeout_secs(60)?;
//!     let agent = RemoteAgent::new(config, Vec::new(), "Always be polite.");
//!
//!     let session = agent.init_state(None);
//!     let (reply, _session) = agent.generate_next_message(Message::user("Hello"), session)?;
//!     println!("{:?}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod a2a;
pub mod agent;
pub mod config;
pub mod error;
pub mod harness;
pub mod llm;
pub mod message;
pub mod metrics;
pub mod service;
pub mod translation;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::a2a::{
        A2aClient, AgentCard, ClientConfig, DiscoveryError, NormalizedReply, Part, ProtocolError,
        WireMessage, WireRole,
    };
    pub use crate::agent::{RemoteAgent, TaskSession};
    pub use crate::config::ServiceConfig;
    pub use crate::error::{ColloquyError, Result};
    pub use crate::harness::{
        known_domains, ConversationalAgent, EvaluationBackend, EvaluationResults, RunConfig,
        StubBackend,
    };
    pub use crate::llm::{ChatMessage, ChatRequest, ChatResponse, LlmProvider};
    pub use crate::message::{
        AssistantMessage, Message, ToolCall, ToolDefinition, ToolOutput,
    };
    pub use crate::metrics::{AggregatedMetrics, MetricsRecorder, RequestMetric};
    pub use crate::service::{EvaluationService, ServiceTool};
}

//! Evaluation service front-end
//!
//! A protocol-speaking server that accepts natural-language evaluation
//! requests, routes them through an LLM-backed controller, and invokes the
//! harness via the tool surface.

pub mod router;
pub mod server;
pub mod session;
pub mod tools;

pub use router::LlmRouter;
pub use server::EvaluationService;
pub use session::{
    open_session_store, ControllerSession, FileSessionStore, InMemorySessionStore, SessionStore,
};
pub use tools::{GetEvaluationResults, ListDomains, RunEvaluation, ServiceTool, ToolError};

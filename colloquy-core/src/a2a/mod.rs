//! A2A protocol support
//!
//! Wire types, the JSON-RPC envelope, and the HTTP client used to talk to a
//! remote agent-under-test.

pub mod client;
pub mod error;
pub mod wire;

pub use client::{A2aClient, ClientConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{DiscoveryError, ProtocolError};
pub use wire::{
    normalize_reply, AgentCapabilities, AgentCard, AgentSkill, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, NormalizedReply, Part, RequestId, WireMessage, WireRole, AGENT_CARD_PATH,
    JSONRPC_VERSION, METHOD_MESSAGE_SEND,
};

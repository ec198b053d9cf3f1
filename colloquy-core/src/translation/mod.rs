//! Message translation between the native model and the wire protocol
//!
//! Outbound: the whole task transcript is rendered into one text part —
//! system prelude, tool catalog, then one line per turn. Tool schemas and
//! tool results always travel as text; the remote agent is a black-box
//! reasoner over text and the protocol stays minimal.
//!
//! Inbound: tool calls are lifted out of the reply with a two-tier strategy,
//! structured data parts first and embedded JSON in the text second.

mod inbound;
mod outbound;

pub use inbound::{extract_tool_calls, parse_reply, EMPTY_REPLY_FALLBACK};
pub use outbound::{build_outbound, render_tool_catalog, render_transcript, system_block};

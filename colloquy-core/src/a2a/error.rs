//! A2A protocol error taxonomy
//!
//! Two failure domains: discovery (fetching the agent card) and messaging
//! (the `message/send` exchange). Neither ever carries the bearer token.

/// Failure while fetching or validating an agent card.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Connection refused, DNS failure, or the request never completed.
    #[error("agent endpoint unreachable: {0}")]
    Unreachable(String),

    /// The well-known endpoint answered with a non-success status.
    #[error("agent card request failed with HTTP {0}")]
    HttpStatus(u16),

    /// The card did not parse or failed validation.
    #[error("invalid agent card: {0}")]
    Malformed(String),
}

/// Failure during a `message/send` exchange.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The read deadline expired before a reply arrived.
    #[error("agent response timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Connection refused or DNS failure.
    #[error("agent endpoint unreachable: {0}")]
    Unreachable(String),

    /// HTTP 401 or 403.
    #[error("authentication rejected by agent endpoint (HTTP {0})")]
    Unauthorized(u16),

    /// Any other non-success HTTP status.
    #[error("message send failed with HTTP {0}")]
    BadStatus(u16),

    /// The reply body did not parse, or no recognised shape was found.
    #[error("malformed agent reply: {0}")]
    Malformed(String),

    /// The JSON-RPC envelope carried an `error` member.
    #[error("agent returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl ProtocolError {
    /// Short label recorded in the `error` field of a request metric.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ProtocolError::Timeout { .. } => "timeout",
            ProtocolError::Unreachable(_) => "unreachable",
            ProtocolError::Unauthorized(_) => "unauthorized",
            ProtocolError::BadStatus(_) => "bad_status",
            ProtocolError::Malformed(_) => "malformed",
            ProtocolError::Rpc { .. } => "rpc_error",
        }
    }

    /// HTTP status associated with this failure, where one was observed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProtocolError::Unauthorized(code) | ProtocolError::BadStatus(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels() {
        assert_eq!(
            ProtocolError::Timeout { timeout_secs: 1 }.metric_label(),
            "timeout"
        );
        assert_eq!(ProtocolError::Unauthorized(401).metric_label(), "unauthorized");
        assert_eq!(
            ProtocolError::Rpc {
                code: -32600,
                message: "bad".into()
            }
            .metric_label(),
            "rpc_error"
        );
    }

    #[test]
    fn test_status_code_projection() {
        assert_eq!(ProtocolError::BadStatus(502).status_code(), Some(502));
        assert_eq!(
            ProtocolError::Timeout { timeout_secs: 5 }.status_code(),
            None
        );
    }
}

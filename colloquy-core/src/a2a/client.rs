//! A2A HTTP client
//!
//! Agent-card discovery and `message/send` over JSON-RPC 2.0. A fresh
//! `reqwest::Client` is built for every call and dropped when the call
//! returns: the evaluator adapter may drive successive calls from different
//! runtimes, so pooled connections must not outlive the call that opened
//! them.
//!
//! The bearer token travels only in the `Authorization` header. It is never
//! logged, never serialised into metrics, and never embedded in an error.

use std::time::{Duration, Instant};

use serde_json::json;
use uuid::Uuid;

use super::error::{DiscoveryError, ProtocolError};
use super::wire::{
    normalize_reply, AgentCard, JsonRpcError, JsonRpcRequest, NormalizedReply, Part, WireMessage,
    AGENT_CARD_PATH, METHOD_MESSAGE_SEND,
};
use crate::error::{ColloquyError, Result};
use crate::metrics::{estimate_tokens, MetricsRecorder, RequestMetric};

/// Connection settings for one remote agent. Immutable after construction;
/// shared read-only by every task that talks to the same endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    endpoint: String,
    auth_token: Option<String>,
    timeout_secs: u64,
    verify_ssl: bool,
}

/// Default total read timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

impl ClientConfig {
    /// Create a config for `endpoint`.
    ///
    /// The endpoint is normalised (trailing slash stripped) and must use an
    /// `http://` or `https://` scheme.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ColloquyError::Configuration(format!(
                "endpoint must start with http:// or https://, got {endpoint}"
            )));
        }

        Ok(Self {
            endpoint,
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_ssl: true,
        })
    }

    /// Attach a bearer token sent with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the total read timeout. Must be positive.
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(ColloquyError::Configuration(
                "timeout must be positive".to_string(),
            ));
        }
        self.timeout_secs = secs;
        Ok(self)
    }

    /// Disable TLS certificate verification (test rigs only).
    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn has_auth_token(&self) -> bool {
        self.auth_token.is_some()
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
        }
    }
}

/// HTTP client for A2A protocol communication.
pub struct A2aClient {
    config: ClientConfig,
    card: std::sync::Mutex<Option<AgentCard>>,
    recorder: MetricsRecorder,
}

impl A2aClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            card: std::sync::Mutex::new(None),
            recorder: MetricsRecorder::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle onto this client's metric log.
    pub fn recorder(&self) -> MetricsRecorder {
        self.recorder.clone()
    }

    /// All metrics recorded by this client so far.
    pub fn metrics(&self) -> Vec<RequestMetric> {
        self.recorder.snapshot()
    }

    pub fn clear_metrics(&self) {
        self.recorder.clear();
    }

    fn http_client(&self) -> std::result::Result<reqwest::Client, ProtocolError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .danger_accept_invalid_certs(!self.config.verify_ssl)
            .build()
            .map_err(|e| ProtocolError::Unreachable(format!("failed to build http client: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// The agent card cached by an earlier discovery, if any.
    pub fn agent_card(&self) -> Option<AgentCard> {
        match self.card.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn cache_card(&self, card: &AgentCard) {
        match self.card.lock() {
            Ok(mut guard) => *guard = Some(card.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(card.clone()),
        }
    }

    /// Discover the remote agent's capabilities via its card.
    ///
    /// The card is cached; use [`A2aClient::refresh_card`] to revalidate.
    pub async fn discover(&self) -> std::result::Result<AgentCard, DiscoveryError> {
        if let Some(card) = self.agent_card() {
            return Ok(card);
        }
        self.refresh_card().await
    }

    /// Fetch the agent card, bypassing the cache.
    pub async fn refresh_card(&self) -> std::result::Result<AgentCard, DiscoveryError> {
        let client = self
            .http_client()
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        tracing::debug!(endpoint = %self.config.endpoint, "discovering agent");

        let response = self
            .authorize(client.get(self.config.url(AGENT_CARD_PATH)))
            .send()
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(DiscoveryError::HttpStatus(404));
        }
        if !status.is_success() {
            return Err(DiscoveryError::HttpStatus(status.as_u16()));
        }

        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        validate_card(&card)?;
        self.cache_card(&card);

        tracing::info!(
            agent_name = %card.name,
            agent_version = card.version.as_deref().unwrap_or("unknown"),
            endpoint = %self.config.endpoint,
            "discovered agent"
        );

        Ok(card)
    }

    /// Send one message over `message/send` and fold the reply.
    ///
    /// Emits a [`RequestMetric`] and a single INFO log line whether the
    /// exchange succeeded or failed.
    pub async fn send_message(
        &self,
        message: &WireMessage,
    ) -> std::result::Result<NormalizedReply, ProtocolError> {
        let request_id = Uuid::new_v4().to_string();
        let input_tokens = estimate_tokens(&outgoing_text(message));
        let started = Instant::now();

        let outcome = self.dispatch(message).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut metric =
            RequestMetric::new(request_id.as_str(), self.config.endpoint.as_str(), "POST");
        metric.latency_ms = latency_ms;
        metric.input_tokens = Some(input_tokens);

        match outcome {
            Ok((status, reply)) => {
                metric.status_code = Some(status);
                metric.output_tokens = Some(estimate_tokens(&reply.text()));
                metric.context_id = reply.context_id.clone();

                tracing::info!(
                    request_id = %request_id,
                    endpoint = %self.config.endpoint,
                    status_code = status,
                    latency_ms,
                    input_tokens,
                    output_tokens = metric.output_tokens,
                    context_id = reply.context_id.as_deref(),
                    "message exchange completed"
                );

                self.recorder.record(metric);
                Ok(reply)
            }
            Err(failure) => {
                metric.status_code = failure.status;
                metric.context_id = message.context_id.clone();
                metric.error = Some(failure.error.metric_label().to_string());

                tracing::info!(
                    request_id = %request_id,
                    endpoint = %self.config.endpoint,
                    status_code = failure.status,
                    latency_ms,
                    error = %failure.error,
                    "message exchange failed"
                );

                self.recorder.record(metric);
                Err(failure.error)
            }
        }
    }

    async fn dispatch(
        &self,
        message: &WireMessage,
    ) -> std::result::Result<(u16, NormalizedReply), SendFailure> {
        let client = self.http_client().map_err(SendFailure::transport)?;

        let envelope = JsonRpcRequest::new(Uuid::new_v4().to_string(), METHOD_MESSAGE_SEND)
            .with_params(json!({ "message": message }));

        let response = self
            .authorize(client.post(self.config.url("")))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| SendFailure::transport(self.classify_transport_error(e)))?;

        let status = response.status().as_u16();
        match status {
            401 | 403 => return Err(SendFailure::http(ProtocolError::Unauthorized(status), status)),
            408 => {
                return Err(SendFailure::http(
                    ProtocolError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    },
                    status,
                ))
            }
            s if s >= 400 => return Err(SendFailure::http(ProtocolError::BadStatus(s), s)),
            _ => {}
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            SendFailure::http(ProtocolError::Malformed(format!("unparseable body: {e}")), status)
        })?;

        if let Some(error) = body.get("error") {
            let rpc: JsonRpcError = serde_json::from_value(error.clone()).unwrap_or_else(|_| {
                JsonRpcError::new(-32603, truncated(&error.to_string(), 200))
            });
            return Err(SendFailure::http(
                ProtocolError::Rpc {
                    code: rpc.code,
                    message: rpc.message,
                },
                status,
            ));
        }

        let result = body.get("result").ok_or_else(|| {
            SendFailure::http(
                ProtocolError::Malformed("reply has neither result nor error".to_string()),
                status,
            )
        })?;

        let reply = normalize_reply(result).map_err(|e| {
            tracing::error!(
                payload = %truncated(&result.to_string(), 500),
                "reply did not match any accepted shape"
            );
            SendFailure::http(e, status)
        })?;
        Ok((status, reply))
    }

    fn classify_transport_error(&self, error: reqwest::Error) -> ProtocolError {
        if error.is_timeout() {
            ProtocolError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            ProtocolError::Unreachable(error.to_string())
        }
    }
}

/// A send failure plus the HTTP status it was observed at, if any.
struct SendFailure {
    error: ProtocolError,
    status: Option<u16>,
}

impl SendFailure {
    fn transport(error: ProtocolError) -> Self {
        Self {
            error,
            status: None,
        }
    }

    fn http(error: ProtocolError, status: u16) -> Self {
        Self {
            error,
            status: Some(status),
        }
    }
}

fn validate_card(card: &AgentCard) -> std::result::Result<(), DiscoveryError> {
    if card.name.trim().is_empty() {
        return Err(DiscoveryError::Malformed(
            "agent card has an empty name".to_string(),
        ));
    }
    let url = reqwest::Url::parse(&card.url)
        .map_err(|e| DiscoveryError::Malformed(format!("agent card url is invalid: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DiscoveryError::Malformed(format!(
            "agent card url has unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(())
}

fn outgoing_text(message: &WireMessage) -> String {
    message
        .parts
        .iter()
        .filter_map(Part::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncated(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < limit)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &text[..cut])
    }
}

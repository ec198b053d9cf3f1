//! Evaluation service front door
//!
//! An A2A-speaking server: discovery at `/.well-known/agent-card.json`,
//! `message/send` at the root. Each incoming message is routed to the
//! controller under the session its contextId selects; callers without one
//! get a fresh server-issued contextId in the reply.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use uuid::Uuid;

use crate::a2a::wire::{
    AgentCapabilities, AgentCard, AgentSkill, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Part,
    WireMessage, METHOD_MESSAGE_SEND,
};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::harness::EvaluationBackend;
use crate::llm::LlmProvider;
use crate::service::router::LlmRouter;
use crate::service::session::{open_session_store, ControllerSession, SessionStore};
use crate::service::tools::{GetEvaluationResults, ListDomains, RunEvaluation, ServiceTool};

/// The A2A-facing evaluation service.
pub struct EvaluationService {
    config: ServiceConfig,
    card: AgentCard,
    router: LlmRouter,
    sessions: Arc<dyn SessionStore>,
}

impl EvaluationService {
    /// Assemble the service with the standard tool surface. The session
    /// store is opened from the config's `session_backend` connection
    /// string, so the deployment chooses between the in-process and the
    /// persistent backend.
    pub fn new(
        config: ServiceConfig,
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn EvaluationBackend>,
    ) -> Result<Self> {
        let sessions = open_session_store(&config.session_backend)?;
        let tools: Vec<Arc<dyn ServiceTool>> = vec![
            Arc::new(ListDomains),
            Arc::new(RunEvaluation::new(backend)),
            Arc::new(GetEvaluationResults),
        ];
        Ok(Self::with_parts(config, provider, tools, sessions))
    }

    /// Assemble the service from explicit parts, e.g. a custom tool surface
    /// or a persistent session store.
    pub fn with_parts(
        config: ServiceConfig,
        provider: Arc<dyn LlmProvider>,
        tools: Vec<Arc<dyn ServiceTool>>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let card = build_card(&config, &tools);
        let router = LlmRouter::new(provider, tools);
        Self {
            config,
            card,
            router,
            sessions,
        }
    }

    pub fn agent_card(&self) -> &AgentCard {
        &self.card
    }

    /// Handle one JSON-RPC request.
    pub async fn handle_rpc(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.method != METHOD_MESSAGE_SEND {
            return JsonRpcResponse::error(request.id, JsonRpcError::method_not_found());
        }

        let message: WireMessage = match request
            .params
            .as_ref()
            .and_then(|p| p.get("message"))
            .cloned()
            .map(serde_json::from_value)
        {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params(format!("invalid message: {e}")),
                );
            }
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("missing params.message"),
                );
            }
        };

        let text: String = message
            .parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n");

        // A repeated contextId resumes its session; a missing one creates a
        // fresh session under a server-issued id.
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut session = self
            .sessions
            .get(&context_id)
            .await
            .unwrap_or_else(|| ControllerSession::new(context_id.as_str()));

        tracing::info!(
            context_id = %context_id,
            text_len = text.len(),
            resumed = session.turn_count > 0,
            "handling message/send"
        );

        let reply_text = match self.router.handle(&mut session, &text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(context_id = %context_id, error = %e, "controller failed");
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::internal_error(format!("controller failed: {e}")),
                );
            }
        };
        self.sessions.put(session).await;

        let reply = WireMessage::agent(vec![Part::text(reply_text)])
            .with_context_id(Some(context_id));

        match serde_json::to_value(&reply) {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(e) => JsonRpcResponse::error(
                request.id,
                JsonRpcError::internal_error(format!("unserialisable reply: {e}")),
            ),
        }
    }

    /// The axum application for this service.
    pub fn into_router(self: Arc<Self>) -> axum::Router {
        axum::Router::new()
            .route("/.well-known/agent-card.json", get(card_endpoint))
            .route("/", post(rpc_endpoint))
            .with_state(self)
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        let bind_addr = self.config.bind_addr.clone();
        let app = self.into_router();

        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        tracing::info!(bind_addr = %bind_addr, "evaluation service listening");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn card_endpoint(State(service): State<Arc<EvaluationService>>) -> Json<AgentCard> {
    Json(service.agent_card().clone())
}

async fn rpc_endpoint(
    State(service): State<Arc<EvaluationService>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    Json(service.handle_rpc(request).await)
}

fn build_card(config: &ServiceConfig, tools: &[Arc<dyn ServiceTool>]) -> AgentCard {
    let skills = tools
        .iter()
        .map(|tool| {
            let definition = tool.definition();
            AgentSkill {
                id: definition.name.clone(),
                name: definition.name,
                description: Some(definition.description),
                tags: Some(vec!["evaluation".to_string()]),
            }
        })
        .collect();

    AgentCard {
        name: config.name.clone(),
        url: config.public_url.clone(),
        description: Some(
            "Agent evaluation service running scripted customer-service scenarios across the \
             airline, retail, telecom and mock domains"
                .to_string(),
        ),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
        },
        security_schemes: None,
        security: None,
        skills: Some(skills),
    }
}

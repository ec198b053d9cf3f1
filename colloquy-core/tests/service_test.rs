//! End-to-end front-end tests: our protocol client against our own service
//!
//! The evaluation service is started on an ephemeral port and exercised
//! through `A2aClient`, so discovery, the JSON-RPC envelope, the session
//! mapping, and the tool surface are all crossed by real HTTP.

mod common;

use std::sync::Arc;

use colloquy_core::a2a::{A2aClient, ClientConfig, Part, WireMessage};
use colloquy_core::config::ServiceConfig;
use colloquy_core::harness::StubBackend;
use colloquy_core::service::EvaluationService;
use common::ScriptedProvider;

/// Boot a service with scripted LLM replies; returns a client pointed at it.
async fn start_service(replies: &[&str]) -> A2aClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let public_url = format!("http://{addr}");

    let service = Arc::new(
        EvaluationService::new(
            ServiceConfig::new().with_public_url(&public_url),
            ScriptedProvider::new(replies),
            Arc::new(StubBackend),
        )
        .unwrap(),
    );

    let app = service.into_router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    A2aClient::new(ClientConfig::new(public_url).unwrap())
}

fn user_message(text: &str, context_id: Option<&str>) -> WireMessage {
    WireMessage::user(vec![Part::text(text)]).with_context_id(context_id.map(str::to_string))
}

#[tokio::test]
async fn test_service_discovery() {
    let client = start_service(&[]).await;
    let card = client.discover().await.unwrap();

    assert_eq!(card.name, "colloquy-eval-service");
    assert!(!card.capabilities.streaming);

    let skills = card.skills.unwrap();
    assert_eq!(skills.len(), 3);
    assert!(skills.iter().any(|s| s.id == "run_evaluation"));
}

#[tokio::test]
async fn test_text_round_trip_and_context_issue() {
    let client = start_service(&["Welcome to the evaluation service."]).await;

    let reply = client.send_message(&user_message("hello", None)).await.unwrap();
    assert_eq!(reply.text(), "Welcome to the evaluation service.");

    // The service issued a contextId of its own.
    let issued = reply.context_id.expect("service must issue a contextId");
    assert!(!issued.is_empty());
}

#[tokio::test]
async fn test_session_resumes_under_same_context() {
    let client = start_service(&["first answer", "second answer"]).await;

    let first = client.send_message(&user_message("one", None)).await.unwrap();
    let context_id = first.context_id.unwrap();

    let second = client
        .send_message(&user_message("two", Some(&context_id)))
        .await
        .unwrap();

    assert_eq!(second.text(), "second answer");
    assert_eq!(second.context_id.as_deref(), Some(context_id.as_str()));
}

#[tokio::test]
async fn test_list_domains_through_the_controller() {
    let client = start_service(&[
        r#"{"tool_call": {"name": "list_domains", "arguments": {}}}"#,
        "We cover airline, retail, telecom and mock domains.",
    ])
    .await;

    let reply = client
        .send_message(&user_message("what domains do you support?", None))
        .await
        .unwrap();
    assert!(reply.text().contains("airline"));
}

#[tokio::test]
async fn test_run_evaluation_through_the_controller() {
    let client = start_service(&[
        r#"{"tool_call": {"name": "run_evaluation", "arguments": {"domain": "mock", "agentEndpoint": "http://agent.example.com", "numTrials": 1}}}"#,
        "Your agent passed 2 of 2 mock simulations (100%).",
    ])
    .await;

    let reply = client
        .send_message(&user_message(
            "evaluate http://agent.example.com on the mock domain",
            None,
        ))
        .await
        .unwrap();

    assert!(reply.text().contains("2 of 2"));
}

#[tokio::test]
async fn test_invalid_tool_arguments_surface_as_text() {
    let client = start_service(&[
        r#"{"tool_call": {"name": "run_evaluation", "arguments": {"domain": "banking", "agentEndpoint": "http://agent"}}}"#,
        "That domain is not supported; choose airline, retail, telecom or mock.",
    ])
    .await;

    let reply = client
        .send_message(&user_message("evaluate on banking", None))
        .await
        .unwrap();

    // The controller saw the structured tool error and answered usefully.
    assert!(reply.text().contains("not supported"));
}

#[tokio::test]
async fn test_concurrent_contexts_do_not_mix() {
    let client = start_service(&["answer a", "answer b"]).await;

    let a = client.send_message(&user_message("a", None)).await.unwrap();
    let b = client.send_message(&user_message("b", None)).await.unwrap();

    let ctx_a = a.context_id.unwrap();
    let ctx_b = b.context_id.unwrap();
    assert_ne!(ctx_a, ctx_b);
}

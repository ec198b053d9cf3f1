//! Protocol client integration tests against a stub A2A server

mod common;

use std::time::{Duration, Instant};

use colloquy_core::a2a::{
    A2aClient, ClientConfig, DiscoveryError, Part, ProtocolError, WireMessage,
};
use common::LogCapture;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> A2aClient {
    A2aClient::new(ClientConfig::new(server.uri()).unwrap())
}

fn hello() -> WireMessage {
    WireMessage::user(vec![Part::text("Hello")])
}

#[tokio::test]
async fn test_discovery_happy_path_and_caching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/agent-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "simple_nebius_agent",
            "url": "http://x",
            "version": "1.0.0",
            "capabilities": {"streaming": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let card = client.discover().await.unwrap();
    assert_eq!(card.name, "simple_nebius_agent");
    assert_eq!(card.version.as_deref(), Some("1.0.0"));
    assert!(!card.capabilities.streaming);

    // Second call is served from the cache; the mock's expect(1) verifies it.
    let cached = client.discover().await.unwrap();
    assert_eq!(cached, card);
}

#[tokio::test]
async fn test_discovery_missing_card() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).discover().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::HttpStatus(404)));
}

#[tokio::test]
async fn test_discovery_malformed_card() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "", "url": "x"})))
        .mount(&server)
        .await;

    let err = client(&server).discover().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Malformed(_)));
}

#[tokio::test]
async fn test_discovery_unreachable_endpoint() {
    // Nothing is listening on this port.
    let client = A2aClient::new(ClientConfig::new("http://127.0.0.1:9").unwrap());
    let err = client.discover().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Unreachable(_)));
}

#[tokio::test]
async fn test_one_turn_text_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "messageId": "m-1",
                "role": "agent",
                "parts": [{"text": "Hi, how can I help?"}],
                "contextId": "ctx-1"
            }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let reply = client.send_message(&hello()).await.unwrap();
    assert_eq!(reply.text(), "Hi, how can I help?");
    assert_eq!(reply.context_id.as_deref(), Some("ctx-1"));

    // The outgoing envelope was a JSON-RPC message/send with our text.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["method"], "message/send");
    assert_eq!(body["params"]["message"]["role"], "user");
    assert_eq!(body["params"]["message"]["parts"][0]["text"], "Hello");

    // And one metric was recorded for the exchange.
    let metrics = client.metrics();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].status_code, Some(200));
    assert_eq!(metrics[0].context_id.as_deref(), Some("ctx-1"));
    assert!(metrics[0].error.is_none());
    assert!(metrics[0].latency_ms > 0.0);
}

#[tokio::test]
async fn test_alternative_reply_shapes_end_to_end() {
    let shapes = [
        json!({"parts": [{"text": "bare parts"}]}),
        json!("bare string"),
        json!({"message": {"parts": [{"text": "wrapped"}], "contextId": "ctx-w"}}),
        json!({
            "id": "task-1",
            "contextId": "ctx-t",
            "status": {"state": "completed", "message": {"parts": [{"text": "task reply"}]}}
        }),
    ];
    let expected = ["bare parts", "bare string", "wrapped", "task reply"];

    for (shape, expected_text) in shapes.iter().zip(expected) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "1",
                "result": shape
            })))
            .mount(&server)
            .await;

        let reply = client(&server).send_message(&hello()).await.unwrap();
        assert_eq!(reply.text(), expected_text, "shape: {shape}");
    }
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer SECRET-XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {"parts": [{"text": "ok"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_auth_token("SECRET-XYZ");
    let client = A2aClient::new(config);
    client.send_message(&hello()).await.unwrap();
}

#[tokio::test]
async fn test_auth_failure_keeps_token_out_of_everything() {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_auth_token("SECRET-XYZ");
    let client = A2aClient::new(config);

    let err = client.send_message(&hello()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Unauthorized(401)));

    // The token appears nowhere: not in the error, not in the metrics, not
    // in the captured log output.
    assert!(!format!("{err}").contains("SECRET-XYZ"));
    assert!(!format!("{err:?}").contains("SECRET-XYZ"));

    let metrics_json = serde_json::to_string(&client.metrics()).unwrap();
    assert!(!metrics_json.contains("SECRET-XYZ"));

    let logs = capture.contents();
    assert!(logs.contains("message exchange failed"));
    assert!(!logs.contains("SECRET-XYZ"));
}

#[tokio::test]
async fn test_timeout_semantics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": "1", "result": {"parts": []}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_timeout_secs(1)
        .unwrap();
    let client = A2aClient::new(config);

    let started = Instant::now();
    let err = client.send_message(&hello()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ProtocolError::Timeout { timeout_secs: 1 }));
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");

    let metrics = client.metrics();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].error.as_deref(), Some("timeout"));
    assert_eq!(metrics[0].status_code, None);
    assert!(metrics[0].latency_ms >= 1000.0);
}

#[tokio::test]
async fn test_bad_status_and_rpc_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).send_message(&hello()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::BadStatus(503)));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": {"code": -32602, "message": "bad params"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).send_message(&hello()).await.unwrap_err();
    match err {
        ProtocolError::Rpc { code, message } => {
            assert_eq!(code, -32602);
            assert_eq!(message, "bad params");
        }
        other => panic!("expected rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let err = client(&server).send_message(&hello()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": "1"})))
        .mount(&server)
        .await;

    let err = client(&server).send_message(&hello()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[tokio::test]
async fn test_metric_aggregation_over_mixed_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {"parts": [{"text": "fine"}]}
        })))
        .mount(&server)
        .await;

    let good = client(&server);
    good.send_message(&hello()).await.unwrap();
    good.send_message(&hello()).await.unwrap();

    let server_down = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server_down)
        .await;
    let bad = client(&server_down);
    bad.send_message(&hello()).await.unwrap_err();

    let agg_good = good.recorder().aggregate();
    assert_eq!(agg_good.total_requests, 2);
    assert_eq!(agg_good.error_count, 0);

    let agg_bad = bad.recorder().aggregate();
    assert_eq!(agg_bad.total_requests, 1);
    assert_eq!(agg_bad.error_count, 1);
    assert!(agg_bad.avg_latency_ms > 0.0);
}

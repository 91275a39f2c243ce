//! Integration tests for MCP protocol handling.
//!
//! These tests drive a full session through the MCP server against a mock
//! Car2DB API: lifecycle, tool dispatch, and how API failures surface as
//! tool errors.

use std::sync::Arc;
use std::time::Duration;

use car2db_mcp::api::{ApiClient, ClientConfig};
use car2db_mcp::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use car2db_mcp::mcp::server::{McpServer, ServerState};
use mockito::Matcher;
use serde_json::{json, Value};

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"1.0.0"}}}"#;
const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;

fn server_for(base_url: &str) -> McpServer {
    let config = ClientConfig::new("integration-key")
        .with_base_url(base_url)
        .with_retry_delay(Duration::from_millis(5));
    McpServer::new(Arc::new(ApiClient::new(config).unwrap()))
}

async fn initialised(base_url: &str) -> McpServer {
    let server = server_for(base_url);
    server.handle_line(INITIALIZE).await.unwrap();
    assert!(server.handle_line(INITIALIZED).await.is_none());
    assert_eq!(server.state(), ServerState::Running);
    server
}

async fn call(server: &McpServer, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    });
    let reply = server.handle_line(&request.to_string()).await.unwrap();
    serde_json::from_str(&reply.to_json().unwrap()).unwrap()
}

fn text_of(reply: &Value) -> &str {
    reply["result"]["content"][0]["text"].as_str().unwrap()
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let IncomingMessage::Request(req) = parse_message(INITIALIZE).unwrap() else {
        panic!("Expected Request");
    };
    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, RequestId::Number(1));
}

#[test]
fn test_parse_notification() {
    let IncomingMessage::Notification(notif) = parse_message(INITIALIZED).unwrap() else {
        panic!("Expected Notification");
    };
    assert_eq!(notif.method, "notifications/initialized");
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    assert!(parse_message(r#"{"id": 1, "method": "test"}"#).is_err());
}

// =============================================================================
// Tool Call Tests
// =============================================================================

#[tokio::test]
async fn test_tool_call_uses_client_referer_and_auth() {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("GET", "/years/2020?typeId=1")
        .match_header("authorization", "Bearer integration-key")
        .match_header("referer", "test-client/1.0.0")
        .with_status(200)
        .with_body(r#"{"year": 2020, "makes": [{"id": 1, "name": "Audi"}]}"#)
        .create_async()
        .await;

    let server = initialised(&api.url()).await;
    let reply = call(&server, "get_year_vehicles", json!({"year": 2020, "typeId": 1})).await;

    mock.assert_async().await;
    assert!(reply["result"].get("isError").is_none());

    let text = text_of(&reply);
    assert!(text.contains('\n'), "result text should be pretty-printed");
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["makes"][0]["name"], "Audi");
}

#[tokio::test]
async fn test_browse_catalog_returns_members() {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("GET", "/series?pagination=false&modelId=12&generationId=34")
        .with_status(200)
        .with_body(r#"{"hydra:member": [{"id": 56, "name": "Sedan"}], "hydra:totalItems": 1}"#)
        .create_async()
        .await;

    let server = initialised(&api.url()).await;
    let reply = call(
        &server,
        "browse_catalog",
        json!({"level": "series", "modelId": 12, "generationId": "34"}),
    )
    .await;

    mock.assert_async().await;
    let payload: Value = serde_json::from_str(text_of(&reply)).unwrap();
    assert_eq!(payload, json!([{"id": 56, "name": "Sedan"}]));
}

#[tokio::test]
async fn test_not_found_is_reported_with_hint() {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("GET", "/trims/999/full")
        .with_status(404)
        .with_body(r#"{"detail": "Trim not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let server = initialised(&api.url()).await;
    let reply = call(&server, "get_trim_full", json!({"trimId": 999})).await;

    mock.assert_async().await;
    assert_eq!(reply["result"]["isError"], true);

    let body: Value = serde_json::from_str(text_of(&reply)).unwrap();
    assert_eq!(body["details"]["status"], 404);
    assert_eq!(body["details"]["details"], "Trim not found");
    assert_eq!(
        body["details"]["hint"],
        "Resource not found. Verify the ID using search or list tools"
    );
}

#[tokio::test]
async fn test_transient_failure_is_retried_transparently() {
    let mut api = mockito::Server::new_async().await;
    let failing = api
        .mock("GET", "/equipments/8/full")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let succeeding = api
        .mock("GET", "/equipments/8/full")
        .with_status(200)
        .with_body(r#"{"id": 8, "options": []}"#)
        .expect(1)
        .create_async()
        .await;

    let server = initialised(&api.url()).await;
    let reply = call(&server, "get_equipment_full", json!({"equipmentId": 8})).await;

    failing.assert_async().await;
    succeeding.assert_async().await;
    let payload: Value = serde_json::from_str(text_of(&reply)).unwrap();
    assert_eq!(payload["id"], 8);
}

#[tokio::test]
async fn test_invalid_level_never_reaches_api() {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let server = initialised(&api.url()).await;
    let reply = call(&server, "browse_catalog", json!({"level": "wheels"})).await;

    mock.assert_async().await;
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(text_of(&reply), "Unknown catalog level: wheels");
}

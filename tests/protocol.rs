// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests of the stdio loop over an in-memory pipe.

mod common;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use gemini_mcp::error::{codes, ProviderError};
use gemini_mcp::protocol::Session;
use gemini_mcp::providers::ClientFactory;

use common::{session, stub_factory, StubClient};

/// Feed `lines` to a session and collect every response line until EOF.
async fn exchange(session: Session, lines: &[&str]) -> Vec<Value> {
    let mut input = Vec::new();
    for line in lines {
        input.extend_from_slice(line.as_bytes());
        input.push(b'\n');
    }
    exchange_bytes(session, &input).await
}

/// Feed raw bytes to a session and collect every response line until EOF.
async fn exchange_bytes(mut session: Session, input: &[u8]) -> Vec<Value> {
    let (client_side, server_side) = tokio::io::duplex(1024 * 1024);
    let (server_read, server_write) = tokio::io::split(server_side);
    let (client_read, mut client_write) = tokio::io::split(client_side);

    let server = tokio::spawn(async move {
        session.serve(BufReader::new(server_read), server_write).await.unwrap();
    });

    client_write.write_all(input).await.unwrap();
    client_write.shutdown().await.unwrap();
    drop(client_write);

    let mut responses = Vec::new();
    let mut reader = BufReader::new(client_read).lines();
    while let Some(line) = reader.next_line().await.unwrap() {
        responses.push(serde_json::from_str(&line).unwrap());
    }

    server.await.unwrap();
    responses
}

// ============================================================================
// Handshake and sequencing
// ============================================================================

#[tokio::test]
async fn test_ping_before_initialize() {
    let (_temp, session) = session(stub_factory(StubClient::new()));

    let responses = exchange(session, &[r#"{"id":1,"method":"ping"}"#]).await;

    assert_eq!(responses, vec![json!({"jsonrpc": "2.0", "id": 1, "result": {"status": "ok"}})]);
}

#[tokio::test]
async fn test_tool_call_before_initialize() {
    let stub = StubClient::replying(&["should not be used"]);
    let (_temp, session) = session(stub_factory(stub.clone()));

    let responses = exchange(
        session,
        &[r#"{"id":7,"method":"tools/call","params":{"name":"gemini_brainstorm","arguments":{"topic":"naming things"}}}"#],
    )
    .await;

    assert_eq!(responses[0]["id"], 7);
    assert_eq!(responses[0]["error"]["code"], codes::INTERNAL_ERROR);
    assert_eq!(responses[0]["error"]["message"], "Server not initialized");
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_initialize_then_list() {
    let (_temp, session) = session(stub_factory(StubClient::new()));

    let responses = exchange(
        session,
        &[
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mcp-server-gemini");
    assert_eq!(responses[0]["result"]["serverInfo"]["version"], gemini_mcp::VERSION);

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 12);
    assert_eq!(names[8], "list_models");
    assert_eq!(names[11], "gemini_consistency_check");
}

// ============================================================================
// Error paths
// ============================================================================

#[tokio::test]
async fn test_parse_error_uses_placeholder_id() {
    let (_temp, session) = session(stub_factory(StubClient::new()));

    let responses = exchange(session, &["this is not json", "", r#"{"id":2,"method":"ping"}"#]).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(
        responses[0],
        json!({
            "jsonrpc": "2.0",
            "id": "unknown",
            "error": {"code": -32700, "message": "Invalid JSON-RPC request"}
        })
    );
    assert_eq!(responses[1]["result"]["status"], "ok");
}

#[tokio::test]
async fn test_invalid_utf8_line_does_not_stop_the_loop() {
    let (_temp, session) = session(stub_factory(StubClient::new()));

    let mut input = b"{\"id\":1,\"method\":\"ping\",\"x\":\"".to_vec();
    input.extend_from_slice(&[0xff, 0xfe]);
    input.extend_from_slice(b"\"}\n{\"id\":2,\"method\":\"ping\"}\n");

    let responses = exchange_bytes(session, &input).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], "unknown");
    assert_eq!(responses[0]["error"]["code"], codes::PARSE_ERROR);
    assert_eq!(responses[1], json!({"jsonrpc": "2.0", "id": 2, "result": {"status": "ok"}}));
}

#[tokio::test]
async fn test_unknown_method_and_tool() {
    let (_temp, session) = session(stub_factory(StubClient::new()));

    let responses = exchange(
        session,
        &[
            r#"{"id":1,"method":"initialize"}"#,
            r#"{"id":2,"method":"prompts/list"}"#,
            r#"{"id":3,"method":"tools/call","params":{"name":"gemini_teleport","arguments":{}}}"#,
        ],
    )
    .await;

    assert_eq!(responses[1]["error"]["code"], codes::METHOD_NOT_FOUND);
    assert_eq!(responses[1]["error"]["message"], "Method not found: prompts/list");
    assert_eq!(responses[2]["error"]["code"], codes::METHOD_NOT_FOUND);
    assert_eq!(responses[2]["error"]["message"], "Unknown tool: gemini_teleport");
}

#[tokio::test]
async fn test_missing_api_key() {
    let factory: ClientFactory = Box::new(|| {
        Err(ProviderError::NotConfigured(
            "GEMINI_API_KEY environment variable is not set".to_string(),
        ))
    });
    let (_temp, session) = session(factory);

    let responses = exchange(
        session,
        &[
            r#"{"id":1,"method":"initialize"}"#,
            r#"{"id":2,"method":"tools/call","params":{"name":"list_models"}}"#,
        ],
    )
    .await;

    assert_eq!(
        responses[1]["error"],
        json!({"code": -32000, "message": "GEMINI_API_KEY environment variable is not set"})
    );
}

#[tokio::test]
async fn test_backend_errors_are_classified() {
    let stub = StubClient::new();
    stub.push(Err(ProviderError::RateLimited("quota exceeded".to_string())));
    stub.push(Err(ProviderError::Timeout(60000)));
    let (_temp, session) = session(stub_factory(stub.clone()));

    let call = r#"{"id":"x","method":"tools/call","params":{"name":"gemini_brainstorm","arguments":{"topic":"onboarding flow"}}}"#;
    let responses = exchange(session, &[r#"{"id":1,"method":"initialize"}"#, call, call]).await;

    assert_eq!(responses[1]["error"]["code"], codes::RATE_LIMIT);
    assert!(responses[1]["error"]["data"]["originalError"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
    assert_eq!(responses[2]["error"]["code"], codes::TIMEOUT);
    assert_eq!(stub.calls().len(), 2);
}

#[tokio::test]
async fn test_validation_failure_skips_model() {
    let stub = StubClient::new();
    let (_temp, session) = session(stub_factory(stub.clone()));

    let responses = exchange(
        session,
        &[
            r#"{"id":1,"method":"initialize"}"#,
            r#"{"id":2,"method":"tools/call","params":{"name":"gemini_devils_advocate","arguments":{"proposal":"too short"}}}"#,
            r#"{"id":3,"method":"tools/call","params":{"name":"gemini_create_animation","arguments":{"description":"a bouncing ball","fps":500}}}"#,
        ],
    )
    .await;

    assert_eq!(responses[1]["error"]["code"], codes::INVALID_PARAMS);
    assert_eq!(responses[1]["error"]["message"], "proposal must be at least 20 characters long");
    assert_eq!(responses[2]["error"]["code"], codes::INVALID_PARAMS);
    assert_eq!(responses[2]["error"]["message"], "fps must be at most 120");
    assert!(stub.calls().is_empty());
}

// ============================================================================
// Round trip
// ============================================================================

#[tokio::test]
async fn test_tool_call_round_trip() {
    let reply = r#"```json
{"conflicts_found": false, "conflicts": [], "requirements_not_covered": [{"requirement": "audit log", "source": "constraint"}], "validation_gaps": []}
```"#;
    let stub = StubClient::replying(&[reply]);
    let (_temp, session) = session(stub_factory(stub.clone()));

    let request = json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "tools/call",
        "params": {
            "name": "gemini_consistency_check",
            "arguments": {
                "goal": "Ship an auditable payments API",
                "proposal": "Build a REST service with idempotent POST endpoints.",
                "constraints": "Every write must be audit logged"
            }
        }
    })
    .to_string();

    let responses = exchange(session, &[r#"{"id":1,"method":"initialize"}"#, &request]).await;

    let response = &responses[1];
    assert_eq!(response["id"], 42);
    assert_eq!(response["result"]["content"][0]["type"], "text");

    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("{\n  \""), "pretty-printed JSON expected");
    let result: Value = serde_json::from_str(text).unwrap();
    assert_eq!(result["requirements_not_covered"][0]["source"], "constraint");
    assert_eq!(result["summary"]["overall_consistency"], "minor_issues");
    assert_eq!(result["metadata"]["modelUsed"], "gemini-stub");
    assert_eq!(result["metadata"]["tokenBudget"], 500);

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, "generate");
    assert!((calls[0].options.temperature - 0.2).abs() < f32::EPSILON);
    assert!(calls[0].prompt.contains("Every write must be audit logged"));
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session state and the stdio request loop.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{codes, redact_secrets, RpcError, ToolError};
use crate::providers::{ClientFactory, SharedClient};
#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
use crate::telemetry::CorrelationId;
use crate::tools::{FileReader, ToolContext, ToolRegistry};

use super::types::{
    decode_line, initialize_result, tool_call_result, tools_list_result, CallToolParams, Decoded,
    Request, Response, UNKNOWN_ID,
};

/// One client connection: the handshake flag, the lazily built model
/// client, and what tool calls need to run.
pub struct Session {
    initialized: bool,
    client: Option<SharedClient>,
    factory: ClientFactory,
    registry: Arc<ToolRegistry>,
    files: FileReader,
    version: String,
}

impl Session {
    pub fn new(factory: ClientFactory, registry: Arc<ToolRegistry>, files: FileReader) -> Self {
        Self {
            initialized: false,
            client: None,
            factory,
            registry,
            files,
            version: crate::VERSION.to_string(),
        }
    }

    /// Session with the full tool catalog.
    pub fn with_defaults(factory: ClientFactory, files: FileReader) -> Self {
        Self::new(factory, Arc::new(ToolRegistry::with_defaults()), files)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the model client has been built yet.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Handle one raw input line. `None` means nothing is written back.
    pub async fn handle_line(&mut self, line: &str) -> Option<Response> {
        match decode_line(line) {
            Decoded::Empty => None,
            Decoded::Malformed(reason) => Some(malformed(&reason)),
            Decoded::Request(request) => self.handle_request(request).await,
        }
    }

    /// Handle one raw input record. Bytes that are not UTF-8 get a parse
    /// error like any other malformed line.
    pub async fn handle_bytes(&mut self, bytes: &[u8]) -> Option<Response> {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.handle_line(line).await,
            Err(err) => Some(malformed(&err.to_string())),
        }
    }

    /// Route a decoded request.
    pub async fn handle_request(&mut self, request: Request) -> Option<Response> {
        let id = request.response_id();

        let Some(method) = request.method.clone() else {
            return Some(self.fail(id, RpcError::invalid_request("Invalid request: missing method")));
        };

        if request.is_notification() {
            debug!(method = %method, "Notification received");
            return None;
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_request(&method);

        let span = info_span!(
            "rpc",
            method = %method,
            id = %id,
            correlation = %CorrelationId::new()
        );

        let response = async {
            match method.as_str() {
                "initialize" => {
                    self.initialized = true;
                    info!("Client initialized");
                    Response::success(id, initialize_result(&self.version))
                }
                "ping" => Response::success(id, json!({ "status": "ok" })),
                "tools/list" if !self.initialized => self.fail(id, RpcError::not_initialized()),
                "tools/list" => Response::success(id, tools_list_result(&self.registry.definitions())),
                "tools/call" if !self.initialized => self.fail(id, RpcError::not_initialized()),
                "tools/call" => self.call_tool(id, request.params).await,
                other => self.fail(id, RpcError::method_not_found(other)),
            }
        }
        .instrument(span)
        .await;

        Some(response)
    }

    async fn call_tool(&mut self, id: Value, params: Option<Value>) -> Response {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return self.fail(id, RpcError::new(codes::INVALID_PARAMS, "name is required"));
            }
            Err(err) => {
                return self.fail(
                    id,
                    RpcError::new(codes::INVALID_PARAMS, format!("Invalid tools/call params: {err}")),
                );
            }
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(err) => {
                error!(tool = %params.name, error = %redact_secrets(&err.to_string()), "Model client unavailable");
                return self.fail(id, RpcError::from(&err));
            }
        };

        let ctx = ToolContext::new(client, self.files.clone());
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        match self.registry.dispatch(&params.name, arguments, &ctx).await {
            Ok(result) => Response::success(id, tool_call_result(result.text())),
            Err(err) => {
                log_tool_error(&params.name, &err);
                self.fail(id, RpcError::from(&err))
            }
        }
    }

    /// The model client, built on first use.
    fn client(&mut self) -> Result<SharedClient, crate::error::ProviderError> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        let client = (self.factory)()?;
        info!(model = %client.model(), "Model client ready");
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    fn fail(&self, id: Value, error: RpcError) -> Response {
        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_rpc_error(error.code);
        Response::failure(id, error)
    }

    /// Serve newline-delimited requests until `reader` reaches EOF.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = reader;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                info!("Connection closed");
                break;
            }

            if let Some(response) = self.handle_bytes(&buf).await {
                writer.write_all(response.to_line().as_bytes()).await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }
}

fn malformed(reason: &str) -> Response {
    warn!(reason = %reason, "Failed to parse request");
    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_rpc_error(codes::PARSE_ERROR);
    Response::failure(json!(UNKNOWN_ID), RpcError::parse_error())
}

fn log_tool_error(tool: &str, err: &ToolError) {
    match err {
        ToolError::Validation(message) => {
            warn!(tool = %tool, error = %message, "Invalid tool arguments");
        }
        _ => {
            error!(tool = %tool, error = %redact_secrets(&err.to_string()), "Tool call failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::MockModelClient;
    use crate::tools::test_support::TEST_MODEL;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn counting_factory(builds: Arc<AtomicUsize>) -> ClientFactory {
        Box::new(move || {
            builds.fetch_add(1, Ordering::SeqCst);
            let mut mock = MockModelClient::new();
            mock.expect_model().return_const(TEST_MODEL.to_string());
            Ok(Arc::new(mock) as SharedClient)
        })
    }

    fn session(factory: ClientFactory) -> (TempDir, Session) {
        let temp = TempDir::new().unwrap();
        let files = FileReader::new(temp.path()).unwrap();
        (temp, Session::with_defaults(factory, files))
    }

    async fn send(session: &mut Session, line: &str) -> Value {
        let response = session.handle_line(line).await.expect("a response");
        serde_json::from_str(response.to_line().trim_end()).unwrap()
    }

    #[tokio::test]
    async fn test_ping_before_initialize() {
        let builds = Arc::new(AtomicUsize::new(0));
        let (_temp, mut session) = session(counting_factory(builds.clone()));

        let reply = send(&mut session, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "id": 1, "result": {"status": "ok"}}));
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn test_tool_call_before_initialize_has_no_side_effects() {
        let builds = Arc::new(AtomicUsize::new(0));
        let (_temp, mut session) = session(counting_factory(builds.clone()));

        let reply = send(
            &mut session,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"list_models"}}"#,
        )
        .await;
        assert_eq!(reply["error"]["code"], codes::INTERNAL_ERROR);
        assert_eq!(reply["error"]["message"], "Server not initialized");
        assert_eq!(builds.load(Ordering::SeqCst), 0);
        assert!(!session.has_client());
    }

    #[tokio::test]
    async fn test_tools_list_requires_initialize() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));

        let before = send(&mut session, r#"{"id":1,"method":"tools/list"}"#).await;
        assert_eq!(before["error"]["code"], codes::INTERNAL_ERROR);

        send(&mut session, r#"{"id":2,"method":"initialize","params":{}}"#).await;
        let after = send(&mut session, r#"{"id":3,"method":"tools/list"}"#).await;
        let tools = after["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert_eq!(tools[0]["name"], "gemini_generate_ui");
        assert!(tools[0]["inputSchema"]["properties"].is_object());
    }

    #[tokio::test]
    async fn test_client_is_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let (_temp, mut session) = session(counting_factory(builds.clone()));
        send(&mut session, r#"{"id":1,"method":"initialize"}"#).await;

        for id in 2..5 {
            let line = format!(r#"{{"id":{id},"method":"tools/call","params":{{"name":"list_models"}}}}"#);
            let reply = send(&mut session, &line).await;
            assert_eq!(reply["result"]["content"][0]["type"], "text");
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let factory: ClientFactory = Box::new(|| {
            Err(ProviderError::NotConfigured(
                "GEMINI_API_KEY environment variable is not set".to_string(),
            ))
        });
        let (_temp, mut session) = session(factory);
        send(&mut session, r#"{"id":1,"method":"initialize"}"#).await;

        let reply = send(
            &mut session,
            r#"{"id":"call","method":"tools/call","params":{"name":"gemini_brainstorm","arguments":{"topic":"cats"}}}"#,
        )
        .await;
        assert_eq!(reply["id"], "call");
        assert_eq!(reply["error"]["code"], codes::API_ERROR);
        assert_eq!(reply["error"]["message"], "GEMINI_API_KEY environment variable is not set");
        assert!(reply["error"].get("data").is_none());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));

        let parse = send(&mut session, "{\"id\": 1, \"method\"").await;
        assert_eq!(parse["id"], "unknown");
        assert_eq!(parse["error"]["code"], codes::PARSE_ERROR);
        assert_eq!(parse["error"]["message"], "Invalid JSON-RPC request");

        let unknown = send(&mut session, r#"{"id":5,"method":"resources/list"}"#).await;
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);
        assert_eq!(unknown["error"]["message"], "Method not found: resources/list");

        let no_method = send(&mut session, r#"{"id":6}"#).await;
        assert_eq!(no_method["id"], 6);
        assert_eq!(no_method["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_params() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));
        send(&mut session, r#"{"id":1,"method":"initialize"}"#).await;

        let unknown = send(&mut session, r#"{"id":2,"method":"tools/call","params":{"name":"nope"}}"#).await;
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);
        assert_eq!(unknown["error"]["message"], "Unknown tool: nope");

        let missing = send(&mut session, r#"{"id":3,"method":"tools/call"}"#).await;
        assert_eq!(missing["error"]["code"], codes::INVALID_PARAMS);

        let invalid = send(
            &mut session,
            r#"{"id":4,"method":"tools/call","params":{"name":"gemini_brainstorm","arguments":{}}}"#,
        )
        .await;
        assert_eq!(invalid["error"]["code"], codes::INVALID_PARAMS);
        assert_eq!(invalid["error"]["message"], "topic is required");
    }

    #[tokio::test]
    async fn test_blank_lines_and_notifications_are_silent() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));
        assert!(session.handle_line("\n").await.is_none());
        assert!(session
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_bytes_are_a_parse_error() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));

        let response = session.handle_bytes(b"{\"id\":1,\"method\":\"\xff\"}\n").await.unwrap();
        assert_eq!(response.id(), &json!("unknown"));
        assert_eq!(response.error().map(|e| e.code), Some(codes::PARSE_ERROR));
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        let (_temp, mut session) = session(counting_factory(Arc::default()));
        let input = b"{\"id\":1,\"method\":\"ping\"}\n\n{\"id\":2,\"method\":\"initialize\"}\n".to_vec();
        let mut output = Vec::new();

        session.serve(&input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["result"]["protocolVersion"], "2024-11-05");
        assert!(session.is_initialized());
    }
}

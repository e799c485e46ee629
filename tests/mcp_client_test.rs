//! MCP Streamable HTTP client integration tests
//!
//! Runs `HttpMcpClient` against a `wiremock` server playing an MCP tool
//! server: session handshake, JSON and SSE replies, retries, session expiry
//! and tool-level errors.
//!
//! Use `set_body_raw(bytes, mime)` for SSE responses so that the
//! `Content-Type` is exactly `text/event-stream`.

mod common;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{connection_for, mount_handshake, rpc_result, FAST_BACKOFF};
use mcpconnect::error::McpConnectError;
use mcpconnect::mcp::{HttpMcpClient, ToolDiscovery, ToolExecutor};
use mcpconnect::model::{AuthConfig, AuthScheme};

fn client() -> HttpMcpClient {
    HttpMcpClient::new()
        .expect("client")
        .with_retry_backoff(FAST_BACKOFF)
}

#[tokio::test]
async fn test_list_tools_sends_session_and_protocol_headers() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .and(header("MCP-Session-Id", "sess-1"))
        .and(header("MCP-Protocol-Version", "2025-11-25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            2,
            json!({
                "tools": [
                    {"name": "list_files", "description": "List files",
                     "inputSchema": {"type": "object", "properties": {"dir": {"type": "string"}}}},
                    {"name": "search"}
                ]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client();
    let connection = connection_for(&server);
    let tools = client.list_tools(&connection).await.expect("list_tools");

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "list_files");
    assert_eq!(tools[0].description, "List files");
    assert!(tools[0].input_schema.is_some());
    assert_eq!(tools[1].name, "search");
    assert_eq!(
        client.session_id(&connection.id).await.as_deref(),
        Some("sess-1")
    );
}

#[tokio::test]
async fn test_tools_list_follows_pagination_cursor() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"cursor\":\"page-2\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            3,
            json!({"tools": [{"name": "second"}]}),
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            2,
            json!({"tools": [{"name": "first"}], "nextCursor": "page-2"}),
        )))
        .mount(&server)
        .await;

    let tools = client()
        .list_tools(&connection_for(&server))
        .await
        .expect("list_tools");
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_tools_call_with_sse_response() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    // A progress notification precedes the answer to request 2.
    let sse_body = concat!(
        "event: message\n",
        "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n",
        "\n",
        "event: message\n",
        "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"[\\\"a.txt\\\"]\"}]}}\n",
        "\n",
    );
    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .and(body_string_contains("list_files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let output = client()
        .execute(&connection_for(&server), "list_files", json!({"dir": "/"}))
        .await
        .expect("tools/call");

    assert_eq!(output.wrapped_text(), Some("[\"a.txt\"]"));
    assert_eq!(output.format_for_provider(), "[\n  \"a.txt\"\n]");
}

#[tokio::test]
async fn test_tool_reported_error_becomes_execution_error() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            2,
            json!({"content": [{"type": "text", "text": "disk full"}], "isError": true}),
        )))
        .mount(&server)
        .await;

    let err = client()
        .execute(&connection_for(&server), "write_file", json!({}))
        .await
        .unwrap_err();
    match err.downcast_ref::<McpConnectError>() {
        Some(McpConnectError::ToolExecution(message)) => assert_eq!(message, "disk full"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_json_rpc_error_is_surfaced() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32602, "message": "Unknown tool: nope"}
        })))
        .mount(&server)
        .await;

    let err = client()
        .execute(&connection_for(&server), "nope", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<McpConnectError>(),
        Some(McpConnectError::Mcp { code: -32602, .. })
    ));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(rpc_result(2, json!({"tools": []}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tools = client()
        .list_tools(&connection_for(&server))
        .await
        .expect("third attempt succeeds");
    assert!(tools.is_empty());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-1").await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .list_tools(&connection_for(&server))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_expired_session_is_reinitialized_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("MCP-Session-Id", "sess-1")
                .set_body_json(rpc_result(1, json!({"protocolVersion": "2025-11-25"}))),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            4,
            json!({"tools": [{"name": "search"}]}),
        )))
        .mount(&server)
        .await;

    let tools = client()
        .list_tools(&connection_for(&server))
        .await
        .expect("request succeeds after re-initializing");
    assert_eq!(tools.len(), 1);
}

#[tokio::test]
async fn test_auth_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rpc_result(1, json!({"protocolVersion": "2025-11-25"}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(body_string_contains("tools/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(rpc_result(2, json!({"tools": []}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let connection = connection_for(&server).with_auth(AuthConfig {
        scheme: AuthScheme::Bearer {
            token: "secret-token".to_string(),
        },
        headers: Default::default(),
    });
    client().list_tools(&connection).await.expect("list_tools");
}

#[tokio::test]
async fn test_concurrent_first_requests_share_one_handshake() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("MCP-Session-Id", "sess-1")
                .set_body_json(rpc_result(1, json!({"protocolVersion": "2025-11-25"})))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("tools/list"))
        .and(header("MCP-Session-Id", "sess-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(rpc_result(2, json!({"tools": []}))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client();
    let connection = connection_for(&server);
    let (first, second) = tokio::join!(
        client.list_tools(&connection),
        client.list_tools(&connection)
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(
        client.session_id(&connection.id).await.as_deref(),
        Some("sess-1")
    );
}

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcpconnect::config::ProviderConfig;
use mcpconnect::model::{Connection, ProviderCredentials};
use mcpconnect::storage::{SqliteStorage, StorageAdapter};

#[allow(dead_code)]
pub fn create_temp_storage() -> (Arc<dyn StorageAdapter>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("mcpconnect.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (Arc::new(storage), tmp)
}

#[allow(dead_code)]
pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        api_key: Some("test-key".to_string()),
        api_base: base_url.to_string(),
        model: "claude-test".to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn credentials() -> ProviderCredentials {
    ProviderCredentials {
        api_key: Some("test-key".to_string()),
        model: "claude-test".to_string(),
        temperature: 0.7,
        max_tokens: 1024,
    }
}

/// Connection pointing at `server`, with fast retries
#[allow(dead_code)]
pub fn connection_for(server: &MockServer) -> Connection {
    let mut connection = Connection::new("test-server", format!("{}/mcp", server.uri()));
    connection.timeout_ms = 2_000;
    connection.retry_count = 2;
    connection
}

#[allow(dead_code)]
pub const FAST_BACKOFF: Duration = Duration::from_millis(5);

/// Anthropic-style response body with the given content blocks
#[allow(dead_code)]
pub fn messages_body(content: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-test",
        "content": content,
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
}

/// JSON-RPC success envelope
#[allow(dead_code)]
pub fn rpc_result(id: u64, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// Mount the `initialize` handshake and the `initialized` notification
///
/// Plain JSON replies are not matched by id, so the handshake can be
/// repeated after a session reset.
#[allow(dead_code)]
pub async fn mount_handshake(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("MCP-Session-Id", session_id)
                .set_body_json(rpc_result(
                    1,
                    serde_json::json!({
                        "protocolVersion": "2025-11-25",
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "test-server", "version": "1.0.0"}
                    }),
                )),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

//! Share links
//!
//! A shared chat is a versioned JSON payload (connection without secrets,
//! one conversation, its tool catalog and executions) packed as URL-safe
//! base64 without padding. Encoding refuses to exceed a size bound rather
//! than truncating; decoding validates before deserializing so malformed
//! links produce readable errors.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::connections::ConnectionManager;
use crate::error::{McpConnectError, Result};
use crate::model::{Connection, Conversation, MessageBody, Tool, ToolExecution};

/// Current payload version
pub const SHARE_FORMAT_VERSION: u32 = 1;

/// Default bound on the encoded payload, in bytes
pub const DEFAULT_MAX_ENCODED_BYTES: usize = 8000;

const REQUIRED_FIELDS: [&str; 5] = ["version", "connection", "conversation", "tools", "executions"];

/// Connection details safe to share
///
/// Only the auth scheme name travels; tokens, keys and passwords never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedConnection {
    /// Original connection id
    pub id: String,
    /// Display name
    pub name: String,
    /// Tool-server URL
    pub url: String,
    /// Auth scheme name (`none`, `bearer`, `apiKey`, `basic`)
    pub auth_type: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after a failed request
    pub retry_count: u32,
}

impl From<&Connection> for SharedConnection {
    fn from(connection: &Connection) -> Self {
        Self {
            id: connection.id.clone(),
            name: connection.name.clone(),
            url: connection.url.clone(),
            auth_type: connection.auth.scheme.kind().to_string(),
            timeout_ms: connection.timeout_ms,
            retry_count: connection.retry_count,
        }
    }
}

/// Decoded share payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedChat {
    /// Payload version
    pub version: u32,
    /// Connection the chat ran against
    pub connection: SharedConnection,
    /// The shared conversation
    pub conversation: Conversation,
    /// Tools enabled when the chat was shared
    pub tools: Vec<Tool>,
    /// Execution records
    pub executions: Vec<ToolExecution>,
    /// When the payload was created
    #[serde(default = "Utc::now")]
    pub shared_at: DateTime<Utc>,
}

/// A shared chat with fresh ids, ready to store
#[derive(Debug, Clone)]
pub struct ImportedChat {
    /// New connection (no credentials)
    pub connection: Connection,
    /// Conversation re-homed onto the new connection
    pub conversation: Conversation,
    /// Tool catalog
    pub tools: Vec<Tool>,
    /// Executions with new ids
    pub executions: Vec<ToolExecution>,
}

/// Encode a chat for sharing
///
/// # Errors
///
/// Returns `ShareFormat` when the encoded payload is larger than
/// `max_bytes`.
///
/// # Examples
///
/// ```
/// use mcpconnect::model::{Connection, Conversation, Message};
/// use mcpconnect::share::{decode, encode, DEFAULT_MAX_ENCODED_BYTES};
///
/// let connection = Connection::new("files", "https://tools.example.com/mcp");
/// let mut conversation = Conversation::new(&connection.id, "Files");
/// conversation.push(Message::user("hi"));
///
/// let encoded = encode(&connection, &conversation, &[], &[], DEFAULT_MAX_ENCODED_BYTES).unwrap();
/// let shared = decode(&encoded).unwrap();
/// assert_eq!(shared.conversation.messages.len(), 1);
/// ```
pub fn encode(
    connection: &Connection,
    conversation: &Conversation,
    tools: &[Tool],
    executions: &[ToolExecution],
    max_bytes: usize,
) -> Result<String> {
    let payload = SharedChat {
        version: SHARE_FORMAT_VERSION,
        connection: SharedConnection::from(connection),
        conversation: conversation.persistable(),
        tools: tools.iter().filter(|t| !t.is_system()).cloned().collect(),
        executions: executions.to_vec(),
        shared_at: Utc::now(),
    };
    let json = serde_json::to_vec(&payload)?;
    let encoded = URL_SAFE_NO_PAD.encode(json);

    if encoded.len() > max_bytes {
        return Err(McpConnectError::ShareFormat(format!(
            "Chat is too large to share ({} bytes, limit {}). Share fewer messages or tools.",
            encoded.len(),
            max_bytes
        ))
        .into());
    }

    tracing::debug!(
        "Encoded conversation {} into {} bytes",
        conversation.id,
        encoded.len()
    );
    Ok(encoded)
}

/// Encode a stored conversation with its enabled remote tools and the
/// executions it references
pub async fn export(
    manager: &ConnectionManager,
    connection: &Connection,
    conversation: &Conversation,
    max_bytes: usize,
) -> Result<String> {
    let tools = manager.enabled_tools(&connection.id).await?;
    let referenced = conversation.execution_ids();
    let executions: Vec<ToolExecution> = manager
        .executions()
        .list(&connection.id)
        .await?
        .into_iter()
        .filter(|e| referenced.contains(&e.id))
        .collect();
    encode(connection, conversation, &tools, &executions, max_bytes)
}

/// Build a share URL carrying `encoded` in its fragment
pub fn share_url(base: &str, encoded: &str) -> Result<String> {
    let mut url = url::Url::parse(base)
        .map_err(|e| McpConnectError::Config(format!("invalid share base URL '{}': {}", base, e)))?;
    url.set_fragment(Some(encoded));
    Ok(url.to_string())
}

/// Decode a share payload, or a share URL carrying one in its fragment
///
/// # Errors
///
/// Returns `ShareFormat` for invalid base64, invalid JSON, a missing
/// required field, an unsupported version, or fields of the wrong shape.
pub fn decode(input: &str) -> Result<SharedChat> {
    let payload = extract_payload(input);
    if payload.is_empty() {
        return Err(share_error("Share link is empty"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| share_error(format!("Share link is not valid base64: {}", e)))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| share_error(format!("Share link does not contain valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| share_error("Share payload must be a JSON object"))?;
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !object.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(share_error(format!(
            "Share payload is missing required fields: {}",
            missing.join(", ")
        )));
    }

    let version = object
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| share_error("Share payload version must be a positive integer"))?;
    if version == 0 || version > u64::from(SHARE_FORMAT_VERSION) {
        return Err(share_error(format!(
            "Unsupported share format version {} (supported: {})",
            version, SHARE_FORMAT_VERSION
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| share_error(format!("Share payload is malformed: {}", e)))
}

impl SharedChat {
    /// Assign fresh ids to everything
    ///
    /// Tool-execution messages keep pointing at their (renamed) execution
    /// records.
    pub fn import(self) -> ImportedChat {
        let mut connection = Connection::new(self.connection.name, self.connection.url);
        connection.timeout_ms = self.connection.timeout_ms;
        connection.retry_count = self.connection.retry_count;

        let id_map: HashMap<String, String> = self
            .executions
            .iter()
            .map(|e| (e.id.clone(), Uuid::new_v4().to_string()))
            .collect();

        let executions = self
            .executions
            .into_iter()
            .map(|mut e| {
                if let Some(new_id) = id_map.get(&e.id) {
                    e.id = new_id.clone();
                }
                e
            })
            .collect();

        let mut conversation = self.conversation;
        conversation.id = Uuid::new_v4().to_string();
        conversation.connection_id = connection.id.clone();
        for message in &mut conversation.messages {
            message.id = Uuid::new_v4().to_string();
            if let MessageBody::ToolExecution { execution_id, .. } = &mut message.body {
                if let Some(new_id) = id_map.get(execution_id.as_str()) {
                    *execution_id = new_id.clone();
                }
            }
        }

        ImportedChat {
            connection,
            conversation,
            tools: self.tools,
            executions,
        }
    }
}

impl ImportedChat {
    /// Store the imported connection, catalog, executions and conversation
    pub async fn save(&self, manager: &ConnectionManager) -> Result<Conversation> {
        manager.add(self.connection.clone()).await?;
        manager.set_tools(&self.connection.id, &self.tools).await?;
        for execution in &self.executions {
            manager
                .executions()
                .upsert(&self.connection.id, execution)
                .await?;
        }
        let saved = manager.conversations().save(&self.conversation).await?;
        tracing::info!(
            "Imported conversation {} as connection {}",
            saved.id,
            self.connection.name
        );
        Ok(saved)
    }
}

fn extract_payload(input: &str) -> &str {
    let input = input.trim();
    match input.rsplit_once('#') {
        Some((_, fragment)) => fragment,
        None => input,
    }
}

fn share_error(message: impl Into<String>) -> anyhow::Error {
    McpConnectError::ShareFormat(message.into()).into()
}

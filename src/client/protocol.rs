//! Wire protocol types
//!
//! Defines the message shapes exchanged with the room server over WebSocket,
//! the display-message feed surfaced to the console, and the session room
//! snapshot derived from responses and broadcasts.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// WebSocket close code for normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// WebSocket close code for a protocol error
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// WebSocket close code for abnormal closure (connection dropped without a
/// close frame)
pub const CLOSE_ABNORMAL: u16 = 1006;

/// WebSocket close code for a policy violation (typically rejected
/// authentication)
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Length of the random suffix in generated identity keys
const IDENTITY_KEY_SUFFIX_LEN: usize = 9;

// ============================================================================
// Connection State
// ============================================================================

/// Lifecycle state of the WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection is open
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// The connection is open and ready for traffic
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

// ============================================================================
// Display Messages
// ============================================================================

/// Category of a message in the console feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    /// Outbound request, echoed after transmission
    Sent,
    /// Inbound response or system note
    Received,
    /// Server-reported or transport error
    Error,
    /// Server-initiated notification not solicited by this client
    Broadcast,
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageCategory::Sent => write!(f, "sent"),
            MessageCategory::Received => write!(f, "received"),
            MessageCategory::Error => write!(f, "error"),
            MessageCategory::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// A single unit of the console feed
///
/// The connection layer produces these; the console renders and stores them.
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    /// Feed category
    pub category: MessageCategory,
    /// Arbitrary structured content
    pub content: Value,
    /// Local time the message was produced
    pub timestamp: DateTime<Local>,
}

impl DisplayMessage {
    /// Create a new display message stamped with the current time
    pub fn new(category: MessageCategory, content: Value) -> Self {
        Self {
            category,
            content,
            timestamp: Local::now(),
        }
    }

    /// Create a system note (received category, `type: "system"` content)
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(
            MessageCategory::Received,
            json!({ "type": "system", "message": message.into() }),
        )
    }

    /// Create a system note carrying a close code
    pub fn system_with_code(message: impl Into<String>, code: u16) -> Self {
        Self::new(
            MessageCategory::Received,
            json!({ "type": "system", "message": message.into(), "code": code }),
        )
    }

    /// Create an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            MessageCategory::Error,
            json!({ "type": "error", "message": message.into() }),
        )
    }

    /// Create an error message with additional detail
    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(
            MessageCategory::Error,
            json!({
                "type": "error",
                "message": message.into(),
                "details": details.into(),
            }),
        )
    }
}

// ============================================================================
// Outbound Requests
// ============================================================================

/// A structured request sent to the room server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundRequest {
    /// Grouping for the event (e.g. `room`)
    pub namespace: String,
    /// Action identifier (e.g. `create_room_request`)
    pub event: String,
    /// Arbitrary payload
    pub data: Value,
    /// Correlation key echoed back on the matching response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
}

impl OutboundRequest {
    /// Create a new request without a correlation key
    pub fn new(namespace: impl Into<String>, event: impl Into<String>, data: Value) -> Self {
        Self {
            namespace: namespace.into(),
            event: event.into(),
            data,
            identity_key: None,
        }
    }

    /// Set the correlation key
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = Some(key.into());
        self
    }

    /// Tag the request with a generated correlation key if it has none
    ///
    /// A key set by the caller is never overwritten.
    pub fn tag_identity_key(&mut self) {
        if self.identity_key.is_none() {
            self.identity_key = Some(generate_identity_key());
        }
    }
}

/// Generate a correlation key for an outbound request
///
/// Time-based prefix plus a random suffix. Collisions within a single
/// debugging session are what matters here, not global uniqueness.
pub fn generate_identity_key() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "req-{}-{}",
        Utc::now().timestamp_millis(),
        &suffix[..IDENTITY_KEY_SUFFIX_LEN]
    )
}

// ============================================================================
// Inbound Messages
// ============================================================================

/// A decoded inbound frame
///
/// Frames that fail to decode as JSON are preserved as raw text rather than
/// discarded, so one malformed frame never breaks the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Successfully decoded JSON payload
    Structured(Value),
    /// Undecodable frame, kept verbatim
    Raw(String),
}

impl InboundMessage {
    /// Decode a text frame, falling back to the raw representation
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => InboundMessage::Structured(value),
            Err(_) => InboundMessage::Raw(text.to_string()),
        }
    }

    /// The `type` discriminator (`success` / `error`), if any
    pub fn kind(&self) -> Option<&str> {
        self.field("type")
    }

    /// The `event` identifier, if any
    pub fn event(&self) -> Option<&str> {
        self.field("event")
    }

    /// The `data` payload, if any
    pub fn data(&self) -> Option<&Value> {
        match self {
            InboundMessage::Structured(value) => value.get("data"),
            InboundMessage::Raw(_) => None,
        }
    }

    /// Content for the console feed
    ///
    /// Raw frames are wrapped as `{"raw": <text>}`.
    pub fn display_content(&self) -> Value {
        match self {
            InboundMessage::Structured(value) => value.clone(),
            InboundMessage::Raw(text) => json!({ "raw": text }),
        }
    }

    fn field(&self, key: &str) -> Option<&str> {
        match self {
            InboundMessage::Structured(value) => value.get(key).and_then(Value::as_str),
            InboundMessage::Raw(_) => None,
        }
    }
}

// ============================================================================
// Room Snapshot
// ============================================================================

/// Most recently known state of the operator's current room
///
/// Field set mirrors the server's room payload; everything is optional since
/// broadcasts carry only partial data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoomSnapshot {
    pub id: Option<String>,
    pub owner_id: Option<String>,
    pub max_players: Option<u32>,
    pub current_players: Option<u32>,
    pub is_public: Option<bool>,
    pub bet_value: Option<f64>,
    pub minimum_amount: Option<f64>,
    pub is_active: Option<bool>,
    pub match_id: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub seat_index: Option<u32>,
}

impl RoomSnapshot {
    /// Build a snapshot from a response payload
    ///
    /// Returns `None` when the payload does not have the shape of a room
    /// object (wrong field types, not an object).
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }
}

// ============================================================================
// Close Codes
// ============================================================================

/// Human-readable description of a connection closure
///
/// Code 1000 is normal closure and gets no extra detail. Any other code is
/// appended verbatim together with the reason, plus a hint for the reserved
/// codes an operator is most likely to hit.
pub fn describe_close(code: u16, reason: &str) -> String {
    let mut message = String::from("Disconnected from server");

    if code != CLOSE_NORMAL {
        let reason = if reason.is_empty() { "Unknown" } else { reason };
        message.push_str(&format!(" (Code: {}, Reason: {})", code, reason));

        match code {
            CLOSE_ABNORMAL => {
                message.push_str(" - Connection closed abnormally. Check if server is running.");
            }
            CLOSE_PROTOCOL_ERROR => {
                message.push_str(" - Protocol error. Check server logs.");
            }
            CLOSE_POLICY_VIOLATION => {
                message.push_str(" - Policy violation. Check authentication.");
            }
            _ => {}
        }
    }

    message
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Outbound Request Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_request_serialization_omits_missing_identity_key() {
        let request = OutboundRequest::new("room", "get_room_list_request", json!({}));
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"namespace\":\"room\""));
        assert!(json.contains("\"event\":\"get_room_list_request\""));
        assert!(!json.contains("identity_key"));
    }

    #[test]
    fn test_request_serialization_includes_identity_key() {
        let request = OutboundRequest::new("room", "join_room_request", json!({"room_id": "abc"}))
            .with_identity_key("req-1-aaaaaaaaa");
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"identity_key\":\"req-1-aaaaaaaaa\""));
    }

    #[test]
    fn test_request_roundtrip_without_identity_key() {
        let json = r#"{"namespace": "room", "event": "create_room_request", "data": {}}"#;
        let request: OutboundRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.namespace, "room");
        assert!(request.identity_key.is_none());
    }

    #[test]
    fn test_tag_identity_key_generates_when_absent() {
        let mut request = OutboundRequest::new("room", "create_room_request", json!({}));
        request.tag_identity_key();
        let key = request.identity_key.expect("key should be generated");
        assert!(key.starts_with("req-"));
        assert!(!key.is_empty());
    }

    #[test]
    fn test_tag_identity_key_never_overwrites() {
        let mut request = OutboundRequest::new("room", "create_room_request", json!({}))
            .with_identity_key("caller-key");
        request.tag_identity_key();
        assert_eq!(request.identity_key.as_deref(), Some("caller-key"));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = generate_identity_key();
        let b = generate_identity_key();
        assert_ne!(a, b);
        assert!(a.starts_with("req-"));
        assert!(b.starts_with("req-"));
    }

    // -------------------------------------------------------------------------
    // Inbound Message Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_structured() {
        let msg = InboundMessage::parse(r#"{"type": "success", "event": "join_room_response"}"#);
        assert_eq!(msg.kind(), Some("success"));
        assert_eq!(msg.event(), Some("join_room_response"));
        assert!(msg.data().is_none());
    }

    #[test]
    fn test_parse_raw_fallback() {
        let msg = InboundMessage::parse("not json");
        assert_eq!(msg, InboundMessage::Raw("not json".to_string()));
        assert!(msg.kind().is_none());
        assert!(msg.event().is_none());
        assert_eq!(msg.display_content(), json!({ "raw": "not json" }));
    }

    #[test]
    fn test_data_accessor() {
        let msg = InboundMessage::parse(r#"{"event": "user_joined", "data": {"room_id": "r1"}}"#);
        assert_eq!(msg.data().unwrap()["room_id"], "r1");
    }

    #[test]
    fn test_display_content_structured() {
        let msg = InboundMessage::parse(r#"{"event": "x"}"#);
        assert_eq!(msg.display_content(), json!({ "event": "x" }));
    }

    // -------------------------------------------------------------------------
    // Room Snapshot Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_snapshot_from_full_payload() {
        let payload = json!({
            "id": "abc123",
            "owner_id": "u1",
            "max_players": 4,
            "current_players": 1,
            "is_public": true,
            "bet_value": 1000.0,
            "is_active": true,
            "created_at": 1700000000
        });
        let snapshot = RoomSnapshot::from_payload(&payload).unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("abc123"));
        assert_eq!(snapshot.max_players, Some(4));
        assert_eq!(snapshot.current_players, Some(1));
        assert_eq!(snapshot.is_public, Some(true));
        assert_eq!(snapshot.created_at, Some(1700000000));
    }

    #[test]
    fn test_snapshot_tolerates_unknown_fields() {
        let payload = json!({ "id": "abc", "room_secret": "ignored" });
        let snapshot = RoomSnapshot::from_payload(&payload).unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_snapshot_rejects_non_object() {
        assert!(RoomSnapshot::from_payload(&json!("abc")).is_none());
        assert!(RoomSnapshot::from_payload(&json!(null)).is_none());
    }

    // -------------------------------------------------------------------------
    // Close Code Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_describe_close_normal() {
        assert_eq!(describe_close(CLOSE_NORMAL, ""), "Disconnected from server");
    }

    #[test]
    fn test_describe_close_abnormal() {
        let message = describe_close(CLOSE_ABNORMAL, "");
        assert!(message.contains("Code: 1006"));
        assert!(message.contains("abnormally"));
    }

    #[test]
    fn test_describe_close_protocol_error() {
        let message = describe_close(CLOSE_PROTOCOL_ERROR, "bad frame");
        assert!(message.contains("Code: 1002"));
        assert!(message.contains("Reason: bad frame"));
        assert!(message.contains("Protocol error"));
    }

    #[test]
    fn test_describe_close_policy_violation() {
        let message = describe_close(CLOSE_POLICY_VIOLATION, "");
        assert!(message.contains("Code: 1008"));
        assert!(message.contains("Policy violation"));
    }

    #[test]
    fn test_describe_close_other_code_has_no_hint() {
        let message = describe_close(4000, "going away");
        assert!(message.contains("Code: 4000"));
        assert!(message.contains("Reason: going away"));
        assert!(!message.contains(" - "));
    }

    #[test]
    fn test_describe_close_empty_reason_reads_unknown() {
        let message = describe_close(4000, "");
        assert!(message.contains("Reason: Unknown"));
    }

    // -------------------------------------------------------------------------
    // Display Message Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_system_message_shape() {
        let msg = DisplayMessage::system("hello");
        assert_eq!(msg.category, MessageCategory::Received);
        assert_eq!(msg.content["type"], "system");
        assert_eq!(msg.content["message"], "hello");
    }

    #[test]
    fn test_system_with_code_carries_code() {
        let msg = DisplayMessage::system_with_code("closed", 1006);
        assert_eq!(msg.content["code"], 1006);
    }

    #[test]
    fn test_error_message_shape() {
        let msg = DisplayMessage::error_with_details("boom", "check the server");
        assert_eq!(msg.category, MessageCategory::Error);
        assert_eq!(msg.content["message"], "boom");
        assert_eq!(msg.content["details"], "check the server");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(MessageCategory::Sent.to_string(), "sent");
        assert_eq!(MessageCategory::Broadcast.to_string(), "broadcast");
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}

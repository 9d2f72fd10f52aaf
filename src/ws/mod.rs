//! WebSocket layer: chat messages, events, online-user roster.
//!
//! The transport lives in `native.rs` (`tokio-tungstenite`, feature
//! `ws-native`). This module defines the wire messages and the events
//! surfaced to the consumer, and is usable without the transport.

#[cfg(feature = "ws-native")]
pub mod native;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WsError;

/// Path appended to the WebSocket base URL, followed by the token.
pub const CHAT_PATH: &str = "/api/v1/ws/";

/// Close code for a normal shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code the server uses when it rejects the token.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Chat endpoint for `token` under `base` (`ws://host:port`).
pub fn chat_url(base: &str, token: &str) -> String {
    format!(
        "{}{}{}",
        base.trim_end_matches('/'),
        CHAT_PATH,
        urlencoding::encode(token)
    )
}

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Whether a typing notification targets a user or a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    User,
    Room,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOut {
    PrivateMessage {
        receiver_id: i64,
        content: String,
        message_type: String,
    },
    RoomMessage {
        room_id: i64,
        content: String,
        message_type: String,
    },
    Typing {
        target_id: i64,
        target_type: TargetType,
        is_typing: bool,
    },
    ReadMessage {
        message_id: i64,
    },
}

impl MessageOut {
    /// Text message to one user.
    pub fn private_message(receiver_id: i64, content: &str) -> Self {
        Self::PrivateMessage {
            receiver_id,
            content: content.to_string(),
            message_type: "text".to_string(),
        }
    }

    /// Text message to a room.
    pub fn room_message(room_id: i64, content: &str) -> Self {
        Self::RoomMessage {
            room_id,
            content: content.to_string(),
            message_type: "text".to_string(),
        }
    }

    /// Override the `message_type` of a private or room message.
    pub fn with_message_type(mut self, kind: &str) -> Self {
        match &mut self {
            Self::PrivateMessage { message_type, .. } | Self::RoomMessage { message_type, .. } => {
                *message_type = kind.to_string();
            }
            _ => {}
        }
        self
    }

    pub fn typing(target_id: i64, target_type: TargetType, is_typing: bool) -> Self {
        Self::Typing {
            target_id,
            target_type,
            is_typing,
        }
    }

    pub fn read_message(message_id: i64) -> Self {
        Self::ReadMessage { message_id }
    }
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// A connected user as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub connected_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
    /// Any status this client does not track, e.g. `away`. Leaves the
    /// roster untouched.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserStatus {
    pub user_id: i64,
    pub status: PresenceStatus,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub sender_username: Option<String>,
    #[serde(default)]
    pub sender_nickname: Option<String>,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<i64>,
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomMessage {
    pub room_id: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub sender_username: Option<String>,
    #[serde(default)]
    pub sender_nickname: Option<String>,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Delivery receipt for a private message we sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageSent {
    pub message_id: i64,
    pub receiver_id: i64,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypingStatus {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    pub target_id: i64,
    pub target_type: TargetType,
    pub is_typing: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatError {
    pub message: String,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_message_type() -> String {
    "text".to_string()
}

/// A parsed server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    OnlineUsers(Vec<OnlineUser>),
    UserStatus(UserStatus),
    PrivateMessage(ChatMessage),
    RoomMessage(RoomMessage),
    MessageSent(MessageSent),
    TypingStatus(TypingStatus),
    Error(ChatError),
    /// A `type` this client does not model.
    Other { kind: String, data: Value },
}

impl ChatEvent {
    /// Parse a text frame.
    ///
    /// Payloads normally sit under `data`. Messages without a `data` key
    /// (presence broadcasts) carry their fields next to `type`.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| WsError::DeserializationError(e.to_string()))?;
        let Value::Object(mut obj) = value else {
            return Err(WsError::DeserializationError(
                "message is not a JSON object".into(),
            ));
        };
        let kind = match obj.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => {
                return Err(WsError::DeserializationError(
                    "message has no type".into(),
                ))
            }
        };
        let data = obj.remove("data").unwrap_or(Value::Object(obj));

        fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: Value) -> Result<T, WsError> {
            serde_json::from_value(data)
                .map_err(|e| WsError::DeserializationError(format!("{}: {}", kind, e)))
        }

        Ok(match kind.as_str() {
            "online_users" => ChatEvent::OnlineUsers(payload(&kind, data)?),
            "user_status" => ChatEvent::UserStatus(payload(&kind, data)?),
            "private_message" => ChatEvent::PrivateMessage(payload(&kind, data)?),
            "room_message" => ChatEvent::RoomMessage(payload(&kind, data)?),
            "message_sent" => ChatEvent::MessageSent(payload(&kind, data)?),
            "typing_status" => ChatEvent::TypingStatus(payload(&kind, data)?),
            "error" => ChatEvent::Error(payload(&kind, data)?),
            _ => ChatEvent::Other { kind, data },
        })
    }
}

// ─── Online roster ───────────────────────────────────────────────────────────

/// Apply a presence event to the roster. Returns whether it changed.
pub fn apply_presence(roster: &mut Vec<OnlineUser>, event: &ChatEvent) -> bool {
    match event {
        ChatEvent::OnlineUsers(users) => {
            *roster = users.clone();
            true
        }
        ChatEvent::UserStatus(status) => match status.status {
            PresenceStatus::Online => {
                if roster.iter().any(|u| u.user_id == status.user_id) {
                    return false;
                }
                roster.push(OnlineUser {
                    user_id: status.user_id,
                    username: status.username.clone(),
                    nickname: status.nickname.clone(),
                    avatar: status.avatar.clone(),
                    connected_at: status.timestamp.clone(),
                });
                true
            }
            PresenceStatus::Offline => {
                let before = roster.len();
                roster.retain(|u| u.user_id != status.user_id);
                roster.len() != before
            }
            PresenceStatus::Unknown => false,
        },
        _ => false,
    }
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by the chat client to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// A parsed message from the server.
    Message(ChatEvent),
    /// Connection established.
    Connected,
    /// Connection lost (may trigger reconnect).
    Disconnected { code: Option<u16>, reason: String },
    /// A deserialization or protocol error.
    Error(String),
    /// Reconnect attempts exhausted; the client has stopped.
    MaxReconnectReached,
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            _ => ReadyState::Closed,
        }
    }
}

/// Configuration for the chat client.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Base URL (`ws://host:port`); the chat path and token are appended.
    pub url: String,
    pub reconnect: bool,
    /// Fixed wait between reconnect attempts.
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: true,
            reconnect_interval_ms: 3000,
            max_reconnect_attempts: 5,
            connect_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_url_encodes_token() {
        assert_eq!(
            chat_url("ws://localhost:8000/", "a.b/c"),
            "ws://localhost:8000/api/v1/ws/a.b%2Fc"
        );
    }

    #[test]
    fn test_outbound_is_flat_with_type_tag() {
        let value = serde_json::to_value(MessageOut::private_message(7, "hi")).unwrap();
        assert_eq!(
            value,
            json!({"type": "private_message", "receiver_id": 7, "content": "hi", "message_type": "text"})
        );

        let value = serde_json::to_value(MessageOut::typing(3, TargetType::Room, true)).unwrap();
        assert_eq!(
            value,
            json!({"type": "typing", "target_id": 3, "target_type": "room", "is_typing": true})
        );

        let value = serde_json::to_value(MessageOut::read_message(42)).unwrap();
        assert_eq!(value, json!({"type": "read_message", "message_id": 42}));
    }

    #[test]
    fn test_with_message_type() {
        let msg = MessageOut::room_message(1, "clip.mp4").with_message_type("video");
        assert!(matches!(msg, MessageOut::RoomMessage { ref message_type, .. } if message_type == "video"));
    }

    #[test]
    fn test_parse_enveloped_message() {
        let text = json!({
            "type": "private_message",
            "data": {
                "id": 5, "sender_id": 2, "receiver_id": 7,
                "content": "see you at practice", "message_type": "text",
                "created_at": "2024-05-01T10:00:00", "is_read": false
            }
        })
        .to_string();
        match ChatEvent::parse(&text).unwrap() {
            ChatEvent::PrivateMessage(msg) => {
                assert_eq!(msg.id, 5);
                assert_eq!(msg.receiver_id, Some(7));
                assert_eq!(msg.content, "see you at practice");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_flat_presence() {
        let text = r#"{"type":"user_status","user_id":9,"status":"offline","timestamp":"t"}"#;
        let event = ChatEvent::parse(text).unwrap();
        assert!(matches!(
            event,
            ChatEvent::UserStatus(UserStatus { user_id: 9, status: PresenceStatus::Offline, .. })
        ));
    }

    #[test]
    fn test_parse_unknown_type_and_garbage() {
        let event = ChatEvent::parse(r#"{"type":"new_message","data":{"id":1}}"#).unwrap();
        assert_eq!(
            event,
            ChatEvent::Other {
                kind: "new_message".into(),
                data: json!({"id": 1})
            }
        );
        assert!(matches!(
            ChatEvent::parse("not json"),
            Err(WsError::DeserializationError(_))
        ));
        assert!(matches!(
            ChatEvent::parse(r#"{"data":{}}"#),
            Err(WsError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_presence_roster() {
        let mut roster = Vec::new();
        let list = ChatEvent::OnlineUsers(vec![OnlineUser {
            user_id: 1,
            username: Some("ana".into()),
            nickname: None,
            avatar: None,
            connected_at: None,
        }]);
        assert!(apply_presence(&mut roster, &list));
        assert_eq!(roster.len(), 1);

        let online = ChatEvent::parse(r#"{"type":"user_status","user_id":2,"status":"online"}"#)
            .unwrap();
        assert!(apply_presence(&mut roster, &online));
        assert!(!apply_presence(&mut roster, &online));
        assert_eq!(roster.len(), 2);

        let offline = ChatEvent::parse(r#"{"type":"user_status","user_id":1,"status":"offline"}"#)
            .unwrap();
        assert!(apply_presence(&mut roster, &offline));
        assert_eq!(roster.iter().map(|u| u.user_id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_unrecognized_presence_keeps_roster() {
        let away = ChatEvent::parse(r#"{"type":"user_status","user_id":2,"status":"away"}"#)
            .unwrap();
        assert!(matches!(
            away,
            ChatEvent::UserStatus(UserStatus { user_id: 2, status: PresenceStatus::Unknown, .. })
        ));

        let mut roster = vec![OnlineUser {
            user_id: 2,
            username: Some("bruno".into()),
            nickname: None,
            avatar: None,
            connected_at: None,
        }];
        assert!(!apply_presence(&mut roster, &away));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].user_id, 2);
    }

    #[test]
    fn test_ready_state_from_u8() {
        assert_eq!(ReadyState::from(ReadyState::Open as u8), ReadyState::Open);
        assert_eq!(ReadyState::from(7), ReadyState::Closed);
    }
}

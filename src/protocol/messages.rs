use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

use super::{ACTIVITY_TIMEOUT_SECONDS, GENERIC_ERROR};

/// One protocol frame. Every frame carries `event`; response and member
/// frames additionally carry a top-level `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PusherMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageData {
    String(String),
    Error(ErrorData),
    Json(Value),
}

// Pusher sends null for the code on generic errors, so the field is always
// serialized, as null when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: Option<u16>,
    pub message: String,
}

impl PusherMessage {
    pub fn connection_established(socket_id: &str) -> Self {
        let data = serde_json::json!({
            "socket_id": socket_id,
            "activity_timeout": ACTIVITY_TIMEOUT_SECONDS,
        });
        Self {
            channel: None,
            event: "pusher:connection_established".into(),
            data: Some(MessageData::String(data.to_string())),
        }
    }

    pub fn pong() -> Self {
        Self {
            channel: None,
            event: "pusher:pong".into(),
            data: Some(MessageData::String("{}".into())),
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        let code = if code == GENERIC_ERROR { None } else { Some(code) };
        Self {
            channel: None,
            event: "pusher:error".into(),
            data: Some(MessageData::Error(ErrorData {
                code,
                message: message.into(),
            })),
        }
    }

    /// `data` is the already JSON-encoded payload string, `"{}"` outside of
    /// presence channels.
    pub fn subscription_succeeded(channel: &str, data: String) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event: "pusher_internal:subscription_succeeded".into(),
            data: Some(MessageData::String(data)),
        }
    }

    pub fn member_added(channel: &str, user_id: &str, user_info: Option<Value>) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("user_id".into(), Value::String(user_id.to_string()));
        if let Some(info) = user_info {
            body.insert("user_info".into(), info);
        }
        Self {
            channel: Some(channel.to_string()),
            event: "pusher_internal:member_added".into(),
            data: Some(MessageData::String(Value::Object(body).to_string())),
        }
    }

    pub fn member_removed(channel: &str, user_id: &str) -> Self {
        let data = serde_json::json!({ "user_id": user_id });
        Self {
            channel: Some(channel.to_string()),
            event: "pusher_internal:member_removed".into(),
            data: Some(MessageData::String(data.to_string())),
        }
    }

    pub fn channel_event(event: &str, channel: &str, data: Value) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event: event.to_string(),
            data: Some(MessageData::Json(data)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeFrame {
    #[serde(default)]
    pub data: SubscribeData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeData {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub channel_data: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeFrame {
    #[serde(default)]
    pub data: UnsubscribeData,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnsubscribeData {
    #[serde(default)]
    pub channel: String,
}

#[derive(Debug, Deserialize)]
pub struct RawClientEvent {
    pub event: String,
    #[serde(default)]
    pub channel: String,
    pub data: Option<Box<RawValue>>,
}

/// Parse an event payload into the value it represents. Publishers send
/// `data` as a JSON-encoded string; one level of that encoding is unwrapped
/// so subscribers receive the underlying document.
pub fn parse_event_payload(raw: &RawValue) -> Value {
    let value: Value = serde_json::from_str(raw.get()).unwrap_or(Value::Null);
    if let Value::String(inner) = &value
        && let Ok(parsed) = serde_json::from_str::<Value>(inner)
    {
        return parsed;
    }
    value
}

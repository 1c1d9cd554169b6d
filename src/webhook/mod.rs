pub mod sender;

use serde::Serialize;
use serde_json::Value;

/// Body of one webhook POST. `time_ms` carries Unix *seconds*; the field
/// name is kept for wire compatibility.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub time_ms: i64,
    pub events: Vec<HookEvent>,
}

#[derive(Debug, Serialize)]
pub struct HookEvent {
    pub name: &'static str,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl HookEvent {
    fn bare(name: &'static str, channel: &str) -> Self {
        Self {
            name,
            channel: channel.to_string(),
            event: None,
            data: None,
            socket_id: None,
            user_id: None,
        }
    }

    pub fn channel_occupied(channel: &str) -> Self {
        Self::bare("channel_occupied", channel)
    }

    pub fn channel_vacated(channel: &str) -> Self {
        Self::bare("channel_vacated", channel)
    }

    pub fn member_added(channel: &str, user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::bare("member_added", channel)
        }
    }

    pub fn member_removed(channel: &str, user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::bare("member_removed", channel)
        }
    }

    /// `user_id` is only present when the sender is a presence member.
    pub fn client_event(
        channel: &str,
        event: &str,
        data: &Value,
        socket_id: &str,
        user_id: Option<&str>,
    ) -> Self {
        Self {
            event: Some(event.to_string()),
            data: Some(data.clone()),
            socket_id: Some(socket_id.to_string()),
            user_id: user_id.map(str::to_string),
            ..Self::bare("client_event", channel)
        }
    }
}

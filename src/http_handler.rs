use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::protocol::MAX_EVENT_PAYLOAD_BYTES;
use crate::protocol::messages::parse_event_payload;
use crate::server::ServerState;
use crate::utils;
use crate::websocket::SocketId;

const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

fn json_response<T: Serialize>(value: &T) -> Result<Response, AppError> {
    let body = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Internal server error: {e}")))?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response())
}

fn app_not_found(app_id: &str) -> AppError {
    AppError::BadRequest(format!("Could not found an app with app_id: {app_id}"))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub name: String,
    pub data: Box<RawValue>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub socket_id: String,
}

/// `POST /apps/{app_id}/events`: trigger an event on one or more channels.
/// Response is an empty JSON hash.
pub async fn publish_events(
    State(state): State<Arc<ServerState>>,
    Path(app_id): Path<String>,
    Json(mut input): Json<PublishRequest>,
) -> Result<Response, AppError> {
    let app = state.apps.by_app_id(&app_id).map_err(|_| app_not_found(&app_id))?;

    if input.data.get().len() > MAX_EVENT_PAYLOAD_BYTES {
        return Err(AppError::PayloadTooLarge("Request too large.".into()));
    }

    if input.channels.is_empty() && !input.channel.is_empty() {
        input.channels.push(std::mem::take(&mut input.channel));
    }

    debug!(app_id = %app_id, event = %input.name, channels = ?input.channels, "publishing event");

    let except = (!input.socket_id.is_empty()).then(|| SocketId(input.socket_id.clone()));
    let payload = parse_event_payload(&input.data);

    for name in &input.channels {
        let channel = app.find_or_create_channel(name);
        app.publish(&channel, &input.name, &payload, except.as_ref())
            .await;
    }

    json_response(&serde_json::json!({}))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelsQuery {
    #[serde(default)]
    pub filter_by_prefix: String,
    #[serde(default)]
    pub info: String,
}

/// `GET /apps/{app_id}/channels`: hash of occupied channels, optionally
/// filtered by prefix.
pub async fn list_channels(
    State(state): State<Arc<ServerState>>,
    Path(app_id): Path<String>,
    Query(query): Query<ChannelsQuery>,
) -> Result<Response, AppError> {
    let requested_user_count = query.info.split(',').any(|attr| attr == "user_count");

    if requested_user_count && query.filter_by_prefix != "presence-" {
        return Err(AppError::BadRequest(
            "Attribute user_count is restricted to presence channels".into(),
        ));
    }

    let app = state.apps.by_app_id(&app_id).map_err(|_| app_not_found(&app_id))?;

    let mut channels: HashMap<String, Value> = HashMap::new();
    for channel in app.channels() {
        let keep = match query.filter_by_prefix.as_str() {
            "presence-" => channel.is_presence(),
            "public-" => channel.is_public(),
            "private-" => channel.is_private(),
            _ => true,
        };
        if !keep {
            continue;
        }

        let info = if requested_user_count {
            serde_json::json!({ "user_count": channel.total_users().await })
        } else {
            serde_json::json!({})
        };
        channels.insert(channel.id().to_string(), info);
    }

    json_response(&serde_json::json!({ "channels": channels }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelInfoQuery {
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Serialize)]
struct ChannelInfo {
    occupied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription_count: Option<usize>,
}

/// `GET /apps/{app_id}/channels/{channel_name}`: info for one channel.
pub async fn channel_info(
    State(state): State<Arc<ServerState>>,
    Path((app_id, channel_name)): Path<(String, String)>,
    Query(query): Query<ChannelInfoQuery>,
) -> Result<Response, AppError> {
    let app = state.apps.by_app_id(&app_id).map_err(|_| app_not_found(&app_id))?;

    if channel_name.trim().is_empty() {
        return Err(AppError::BadRequest("Empty channel name".into()));
    }

    let requested_user_count = query.info.split(',').any(|attr| attr == "user_count");
    let requested_subscription_count =
        query.info.split(',').any(|attr| attr == "subscription_count");

    let channel = app.find_channel(&channel_name).ok_or_else(|| {
        AppError::BadRequest(format!("Could not find a channel with id {channel_name}"))
    })?;

    if requested_user_count && !channel.is_presence() {
        return Err(AppError::BadRequest(
            "Attribute user_count is restricted to presence channels".into(),
        ));
    }

    let info = ChannelInfo {
        occupied: channel.is_occupied().await,
        user_count: if requested_user_count {
            Some(channel.total_users().await)
        } else {
            None
        },
        subscription_count: if requested_subscription_count {
            Some(channel.total_subscriptions().await)
        } else {
            None
        },
    };

    json_response(&info)
}

/// `GET /apps/{app_id}/channels/{channel_name}/users`: presence channels
/// only, one entry per subscription.
pub async fn channel_users(
    State(state): State<Arc<ServerState>>,
    Path((app_id, channel_name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if !utils::is_presence_channel(&channel_name) {
        return Err(AppError::BadRequest(
            "This api endpoint is restricted to presence channels.".into(),
        ));
    }

    let app = state.apps.by_app_id(&app_id).map_err(|_| app_not_found(&app_id))?;

    let channel = app.find_channel(&channel_name).ok_or_else(|| {
        AppError::BadRequest(format!("Could not find a channel with id {channel_name}"))
    })?;

    let users: Vec<Value> = channel
        .subscribed_user_ids()
        .await
        .into_iter()
        .map(|id| serde_json::json!({ "id": id }))
        .collect();

    json_response(&serde_json::json!({ "users": users }))
}

/// `GET /debug/stats`: live per-app counters, mounted when profiling is on.
pub async fn debug_stats(State(state): State<Arc<ServerState>>) -> Result<Response, AppError> {
    let mut stats = HashMap::new();
    for app in state.apps.all() {
        stats.insert(app.id().to_string(), app.stats().snapshot());
    }
    json_response(&stats)
}

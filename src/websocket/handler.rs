use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{self, WsError};
use super::{Connection, FrameSink, SocketId};
use crate::app::Application;
use crate::error::{Error, Result};
use crate::protocol;
use crate::protocol::messages::{
    EventEnvelope, PusherMessage, RawClientEvent, SubscribeFrame, UnsubscribeFrame,
    parse_event_payload,
};
use crate::server::ServerState;
use crate::token::secure_compare;
use crate::utils;

struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn write_frame(&mut self, payload: String) -> Result<()> {
        self.0
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| Error::Connection(format!("websocket send failed: {e}")))
    }
}

/// `GET /app/{key}`: upgrade, handshake, then the session loop.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_session(socket, state, key, params))
}

async fn serve_session(
    socket: WebSocket,
    state: Arc<ServerState>,
    key: String,
    params: HashMap<String, String>,
) {
    let (sink, mut stream) = socket.split();
    let mut sink = WsSink(sink);

    let app = match state.apps.by_key(&key) {
        Ok(app) => app,
        Err(_) => {
            emit_and_close(&mut sink, &errors::APPLICATION_DOES_NOT_EXIST).await;
            return;
        }
    };

    if let Some(err) = handshake_error(
        params.get("protocol").map(String::as_str),
        &app,
        state.secure,
    ) {
        emit_and_close(&mut sink, &err).await;
        return;
    }

    let socket_id = SocketId::generate();
    let conn = Arc::new(Connection::new(socket_id.clone(), Box::new(sink)));
    app.connect(Arc::clone(&conn));
    conn.publish(&PusherMessage::connection_established(socket_id.as_str()))
        .await;

    // The session loop is the only reader. Per-operation failures emit
    // non-terminal error frames; only envelope decode failures and transport
    // errors end the session.
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Err(err) = dispatch(&app, &conn, text.as_str()).await {
                    debug!(socket_id = %socket_id, "undecodable frame: {err}");
                    conn.publish(&errors::RECONNECT_IMMEDIATELY.frame()).await;
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(socket_id = %socket_id, "websocket read failed: {err}");
                conn.publish(&errors::RECONNECT_IMMEDIATELY.frame()).await;
                break;
            }
        }
    }

    app.disconnect(&socket_id).await;
}

async fn emit_and_close(sink: &mut WsSink, err: &WsError) {
    match serde_json::to_string(&err.frame()) {
        Ok(payload) => {
            let _ = sink.write_frame(payload).await;
        }
        Err(encode_err) => warn!("failed to encode error frame: {encode_err}"),
    }
    let _ = sink.0.close().await;
}

/// Ordered handshake checks; `None` means the session may open.
pub fn handshake_error(
    protocol: Option<&str>,
    app: &Application,
    secure: bool,
) -> Option<WsError> {
    let protocol = protocol.unwrap_or("").trim();
    if protocol.is_empty() {
        return Some(errors::NO_PROTOCOL_VERSION_SUPPLIED);
    }

    let version: u32 = match protocol.parse() {
        Ok(version) => version,
        Err(_) => return Some(errors::INVALID_VERSION_STRING_FORMAT),
    };

    if version != protocol::SUPPORTED_PROTOCOL_VERSION {
        return Some(errors::UNSUPPORTED_PROTOCOL_VERSION);
    }
    if !app.is_enabled() {
        return Some(errors::APPLICATION_DISABLED);
    }
    if app.only_ssl() && !secure {
        return Some(errors::APPLICATION_ONLY_ACCEPTS_SSL);
    }

    None
}

/// Dispatch one incoming frame. `Err` means the envelope could not be
/// decoded; the caller terminates the session with 4200.
pub async fn dispatch(app: &Arc<Application>, conn: &Arc<Connection>, raw: &str) -> Result<()> {
    let envelope: EventEnvelope =
        serde_json::from_str(raw).map_err(|e| Error::InvalidMessageFormat(e.to_string()))?;

    debug!(event = %envelope.event, "handling event");

    match envelope.event.as_str() {
        "pusher:ping" => conn.publish(&PusherMessage::pong()).await,
        "pusher:subscribe" => handle_subscribe(app, conn, raw).await,
        "pusher:unsubscribe" => handle_unsubscribe(app, conn, raw).await,
        event if utils::is_client_event(event) => handle_client_event(app, conn, raw).await,
        _ => {}
    }

    Ok(())
}

async fn handle_subscribe(app: &Arc<Application>, conn: &Arc<Connection>, raw: &str) {
    let frame: SubscribeFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(_) => {
            conn.publish(&errors::RECONNECT_IMMEDIATELY.frame()).await;
            return;
        }
    };
    let data = frame.data;
    let channel_name = data.channel.trim();

    if !utils::is_channel_name_valid(channel_name) {
        generic_error(conn, "This channel name is not valid").await;
        return;
    }

    let is_presence = utils::is_presence_channel(channel_name);
    let is_private = utils::is_private_channel(channel_name);

    if is_presence || is_private {
        let mut to_sign = format!("{}:{}", conn.socket_id(), channel_name);
        if is_presence || !data.channel_data.is_empty() {
            to_sign.push(':');
            to_sign.push_str(&data.channel_data);
        }

        let expected = format!("{}:{}", app.key(), app.token().sign(&to_sign));
        if !secure_compare(&data.auth, &expected) {
            generic_error(
                conn,
                format!("Auth value for subscription to {channel_name} is invalid"),
            )
            .await;
            return;
        }
    }

    let channel = app.find_or_create_channel(channel_name);
    if let Err(err) = app.subscribe(&channel, conn, &data.channel_data).await {
        warn!(channel = channel_name, "subscribe failed: {err}");
        generic_error(conn, format!("Could not subscribe to channel {channel_name}")).await;
    }
}

async fn handle_unsubscribe(app: &Arc<Application>, conn: &Arc<Connection>, raw: &str) {
    let frame: UnsubscribeFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(_) => {
            conn.publish(&errors::RECONNECT_IMMEDIATELY.frame()).await;
            return;
        }
    };
    let channel_name = frame.data.channel;

    if app.find_connection(conn.socket_id()).is_none() {
        generic_error(
            conn,
            format!("Could not find a connection with the id {}", conn.socket_id()),
        )
        .await;
        return;
    }

    let Some(channel) = app.find_channel(&channel_name) else {
        generic_error(
            conn,
            format!("Could not find a channel with the id {channel_name}"),
        )
        .await;
        return;
    };

    if let Err(err) = app.unsubscribe(&channel, conn.socket_id()).await {
        generic_error(conn, err.to_string()).await;
    }
}

async fn handle_client_event(app: &Arc<Application>, conn: &Arc<Connection>, raw: &str) {
    if !app.client_events_enabled() {
        generic_error(
            conn,
            "To send client events, you must enable this feature in the Settings.",
        )
        .await;
        return;
    }

    let frame: RawClientEvent = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(_) => {
            conn.publish(&errors::RECONNECT_IMMEDIATELY.frame()).await;
            return;
        }
    };

    let Some(channel) = app.find_channel(&frame.channel) else {
        generic_error(
            conn,
            format!("Could not find a channel with the id {}", frame.channel),
        )
        .await;
        return;
    };

    if !channel.is_presence_or_private() {
        generic_error(
            conn,
            "Client event rejected - only supported on private and presence channels",
        )
        .await;
        return;
    }

    let payload = frame
        .data
        .as_deref()
        .map(parse_event_payload)
        .unwrap_or(Value::Null);

    app.publish(&channel, &frame.event, &payload, Some(conn.socket_id()))
        .await;
}

async fn generic_error(conn: &Arc<Connection>, message: impl Into<String>) {
    conn.publish(&PusherMessage::error(protocol::GENERIC_ERROR, message))
        .await;
}

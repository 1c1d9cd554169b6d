use chrono::Utc;
use http::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{HookEvent, WebhookPayload};
use crate::app::config::App;
use crate::error::{Error, Result};
use crate::protocol::WEBHOOK_TIMEOUT_SECONDS;
use crate::token::Token;
use crate::websocket::SocketId;

const USER_AGENT: &str = concat!("pulso/", env!("CARGO_PKG_VERSION"));

/// Posts signed lifecycle notifications to an application's webhook URL.
/// Deliveries run as independent tasks bounded by the client timeout, so
/// callers on the fan-out path never block on them.
pub struct WebhookDispatcher {
    token: Token,
    url: Option<Url>,
    client: Client,
}

impl WebhookDispatcher {
    pub fn for_app(app: &App) -> Result<Self> {
        let url = if app.webhooks.enabled {
            match Url::parse(&app.webhooks.url) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(
                        app_id = %app.id,
                        url = %app.webhooks.url,
                        "webhooks disabled, invalid URL: {err}"
                    );
                    None
                }
            }
        } else {
            None
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build webhook client: {e}")))?;

        Ok(Self {
            token: app.token(),
            url,
            client,
        })
    }

    pub fn channel_occupied(&self, channel: &str) {
        self.dispatch(HookEvent::channel_occupied(channel));
    }

    pub fn channel_vacated(&self, channel: &str) {
        self.dispatch(HookEvent::channel_vacated(channel));
    }

    pub fn member_added(&self, channel: &str, user_id: &str) {
        self.dispatch(HookEvent::member_added(channel, user_id));
    }

    pub fn member_removed(&self, channel: &str, user_id: &str) {
        self.dispatch(HookEvent::member_removed(channel, user_id));
    }

    pub fn client_event(
        &self,
        channel: &str,
        event: &str,
        data: &Value,
        socket_id: &SocketId,
        user_id: Option<&str>,
    ) {
        self.dispatch(HookEvent::client_event(
            channel,
            event,
            data,
            socket_id.as_str(),
            user_id,
        ));
    }

    fn dispatch(&self, event: HookEvent) {
        let Some(url) = self.url.clone() else {
            return;
        };

        debug!(name = event.name, channel = %event.channel, "dispatching webhook");

        // time_ms carries Unix seconds, as the wire format has always done.
        let payload = WebhookPayload {
            time_ms: Utc::now().timestamp(),
            events: vec![event],
        };

        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(err) => {
                error!("failed to encode webhook payload: {err}");
                return;
            }
        };

        let signature = self.token.sign_bytes(&body);
        let key = self.token.key.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let result = client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header("X-Pusher-Key", key)
                .header("X-Pusher-Signature", signature)
                .body(body)
                .send()
                .await;

            match result {
                // Drain the body so the connection can be reused.
                Ok(response) => {
                    let _ = response.bytes().await;
                }
                Err(err) => warn!("webhook delivery failed: {err}"),
            }
        });
    }
}

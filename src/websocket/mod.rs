pub mod errors;
pub mod handler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::protocol::messages::PusherMessage;
use crate::utils;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub String);

impl SocketId {
    pub fn generate() -> Self {
        Self(utils::generate_socket_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SocketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Write-one-frame capability over some duplex transport. The real server
/// uses the write half of an axum websocket; tests use a recording mock.
#[async_trait]
pub trait FrameSink: Send {
    async fn write_frame(&mut self, payload: String) -> Result<()>;
}

/// One client session. Owns exclusive write access to its transport.
pub struct Connection {
    socket_id: SocketId,
    sink: Mutex<Box<dyn FrameSink>>,
    created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(socket_id: SocketId, sink: Box<dyn FrameSink>) -> Self {
        Self {
            socket_id,
            sink: Mutex::new(sink),
            created_at: Utc::now(),
        }
    }

    pub fn socket_id(&self) -> &SocketId {
        &self.socket_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Serialize `frame` and write it under the per-connection write lock.
    /// A failed write is logged and dropped; the session loop notices
    /// terminal failure on its next read.
    pub async fn publish(&self, frame: &PusherMessage) {
        let payload = match serde_json::to_string(frame) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(socket_id = %self.socket_id, "failed to encode frame: {err}");
                return;
            }
        };

        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.write_frame(payload).await {
            warn!(socket_id = %self.socket_id, "failed to write frame: {err}");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("socket_id", &self.socket_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

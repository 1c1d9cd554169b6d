#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use pulso::app::Application;
use pulso::app::config::App;
use pulso::error::Result;
use pulso::websocket::{Connection, FrameSink, SocketId};

/// Frame sink that records everything written to it. Clones share the same
/// buffer, so a test keeps one half while the connection owns the other.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn write_frame(&mut self, payload: String) -> Result<()> {
        self.frames.lock().unwrap().push(payload);
        Ok(())
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("recorded frame is valid JSON"))
            .collect()
    }

    pub fn frames_named(&self, event: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|frame| frame["event"] == event)
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

pub fn app_config(json: Value) -> App {
    serde_json::from_value(json).expect("valid app config")
}

pub fn make_app(json: Value) -> Arc<Application> {
    Arc::new(Application::new(app_config(json)).expect("app builds"))
}

/// A plain enabled app with client events allowed and webhooks off.
pub fn default_app() -> Arc<Application> {
    make_app(serde_json::json!({
        "name": "test",
        "app_id": "1",
        "key": "K",
        "secret": "S",
        "user_events": true,
    }))
}

pub fn connection(socket_id: &str) -> (Arc<Connection>, RecordingSink) {
    let sink = RecordingSink::new();
    let conn = Arc::new(Connection::new(
        SocketId::from(socket_id),
        Box::new(sink.clone()),
    ));
    (conn, sink)
}

pub mod config;
pub mod manager;
pub mod stats;

use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::channel::{Channel, ChannelObserver};
use crate::error::Result;
use crate::token::Token;
use crate::webhook::sender::WebhookDispatcher;
use crate::websocket::{Connection, SocketId};
use self::config::App;
use self::stats::AppStats;

pub struct Application {
    config: App,
    token: Token,
    channels: DashMap<String, Arc<Channel>, RandomState>,
    connections: DashMap<SocketId, Arc<Connection>, RandomState>,
    stats: Arc<AppStats>,
    hooks: Arc<WebhookDispatcher>,
}

impl Application {
    pub fn new(config: App) -> Result<Self> {
        let hooks = Arc::new(WebhookDispatcher::for_app(&config)?);
        Ok(Self {
            token: config.token(),
            config,
            channels: DashMap::with_hasher(RandomState::new()),
            connections: DashMap::with_hasher(RandomState::new()),
            stats: Arc::new(AppStats::default()),
            hooks,
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn only_ssl(&self) -> bool {
        self.config.only_ssl
    }

    pub fn client_events_enabled(&self) -> bool {
        self.config.enable_client_messages
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn stats(&self) -> &AppStats {
        &self.stats
    }

    pub fn connect(&self, conn: Arc<Connection>) {
        debug!(app_id = %self.config.id, socket_id = %conn.socket_id(), "adding connection");
        self.connections.insert(conn.socket_id().clone(), conn);
        self.stats.connection_opened();
    }

    /// Unsubscribe the socket from every channel it is in, then drop the
    /// connection entry. Unknown sockets are a no-op.
    pub async fn disconnect(&self, socket_id: &SocketId) {
        if !self.connections.contains_key(socket_id) {
            debug!(app_id = %self.config.id, socket_id = %socket_id, "disconnect for unknown socket");
            return;
        }

        info!(app_id = %self.config.id, socket_id = %socket_id, "disconnecting socket");

        let channels: Vec<Arc<Channel>> =
            self.channels.iter().map(|entry| entry.value().clone()).collect();

        for channel in channels {
            if channel.is_subscribed(socket_id).await
                && let Err(err) = self.unsubscribe(&channel, socket_id).await
            {
                error!(channel = channel.id(), "error while unsubscribing: {err}");
            }
        }

        if self.connections.remove(socket_id).is_some() {
            self.stats.connection_closed();
        }
    }

    pub fn find_connection(&self, socket_id: &SocketId) -> Option<Arc<Connection>> {
        self.connections.get(socket_id).map(|entry| entry.value().clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn find_channel(&self, id: &str) -> Option<Arc<Channel>> {
        self.channels.get(id).map(|entry| entry.value().clone())
    }

    pub fn find_or_create_channel(&self, id: &str) -> Arc<Channel> {
        match self.channels.entry(id.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let observers = vec![
                    ChannelObserver::Webhooks(Arc::clone(&self.hooks)),
                    ChannelObserver::Counters(Arc::clone(&self.stats)),
                ];
                let channel = Arc::new(Channel::new(id, observers));
                self.stats.channel_added(channel.kind());
                entry.insert(Arc::clone(&channel));
                channel
            }
        }
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Subscribe `conn`, dropping a channel that was created for a
    /// subscription that then failed.
    pub async fn subscribe(
        &self,
        channel: &Arc<Channel>,
        conn: &Arc<Connection>,
        channel_data: &str,
    ) -> Result<()> {
        let result = channel.subscribe(conn, channel_data).await;
        if result.is_err() && !channel.is_occupied().await {
            self.remove_channel(channel);
        }
        result
    }

    /// Unsubscribe `socket_id`, removing the channel once it goes unoccupied.
    pub async fn unsubscribe(&self, channel: &Arc<Channel>, socket_id: &SocketId) -> Result<()> {
        channel.unsubscribe(socket_id).await?;
        if !channel.is_occupied().await {
            self.remove_channel(channel);
        }
        Ok(())
    }

    pub async fn publish(
        &self,
        channel: &Arc<Channel>,
        event: &str,
        payload: &Value,
        except: Option<&SocketId>,
    ) {
        self.stats.mark_published();
        channel.publish(event, payload, except).await;
    }

    fn remove_channel(&self, channel: &Channel) {
        debug!(app_id = %self.config.id, channel = channel.id(), "removing channel");
        if self.channels.remove(channel.id()).is_some() {
            self.stats.channel_removed(channel.kind());
        }
    }
}

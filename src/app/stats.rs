use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::channel::types::ChannelType;

/// Live per-application counters.
#[derive(Debug, Default)]
pub struct AppStats {
    total_connections: AtomicI64,
    total_channels: AtomicI64,
    presence_channels: AtomicI64,
    private_channels: AtomicI64,
    public_channels: AtomicI64,
    published_messages: AtomicU64,
    client_events: AtomicU64,
}

impl AppStats {
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.total_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn channel_added(&self, kind: ChannelType) {
        self.total_channels.fetch_add(1, Ordering::Relaxed);
        self.by_kind(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn channel_removed(&self, kind: ChannelType) {
        self.total_channels.fetch_sub(1, Ordering::Relaxed);
        self.by_kind(kind).fetch_sub(1, Ordering::Relaxed);
    }

    pub fn mark_published(&self) {
        self.published_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_client_event(&self) {
        self.client_events.fetch_add(1, Ordering::Relaxed);
    }

    fn by_kind(&self, kind: ChannelType) -> &AtomicI64 {
        match kind {
            ChannelType::Presence => &self.presence_channels,
            ChannelType::Private => &self.private_channels,
            ChannelType::Public => &self.public_channels,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_channels: self.total_channels.load(Ordering::Relaxed),
            presence_channels: self.presence_channels.load(Ordering::Relaxed),
            private_channels: self.private_channels.load(Ordering::Relaxed),
            public_channels: self.public_channels.load(Ordering::Relaxed),
            published_messages: self.published_messages.load(Ordering::Relaxed),
            client_events: self.client_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_connections: i64,
    pub total_channels: i64,
    pub presence_channels: i64,
    pub private_channels: i64,
    pub public_channels: i64,
    pub published_messages: u64,
    pub client_events: u64,
}

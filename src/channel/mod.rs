pub mod presence;
pub mod types;

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::app::stats::AppStats;
use crate::error::{Error, Result};
use crate::protocol::messages::PusherMessage;
use crate::utils;
use crate::webhook::sender::WebhookDispatcher;
use crate::websocket::{Connection, SocketId};
use self::presence::{PresenceData, PresenceMember};
use self::types::ChannelType;

#[derive(Clone)]
pub struct Subscription {
    pub connection: Arc<Connection>,
    pub presence: Option<PresenceMember>,
}

pub enum ChannelEvent<'a> {
    Occupied {
        channel: &'a str,
    },
    Vacated {
        channel: &'a str,
    },
    MemberAdded {
        channel: &'a str,
        user_id: &'a str,
    },
    MemberRemoved {
        channel: &'a str,
        user_id: &'a str,
    },
    ClientEvent {
        channel: &'a str,
        event: &'a str,
        data: &'a Value,
        socket_id: &'a SocketId,
        user_id: Option<&'a str>,
    },
}

/// Lifecycle observer wired into a channel at creation time. Observers must
/// not block the fan-out path.
#[derive(Clone)]
pub enum ChannelObserver {
    Webhooks(Arc<WebhookDispatcher>),
    Counters(Arc<AppStats>),
}

impl ChannelObserver {
    fn notify(&self, event: &ChannelEvent<'_>) {
        match self {
            ChannelObserver::Webhooks(hooks) => match event {
                ChannelEvent::Occupied { channel } => hooks.channel_occupied(channel),
                ChannelEvent::Vacated { channel } => hooks.channel_vacated(channel),
                ChannelEvent::MemberAdded { channel, user_id } => {
                    hooks.member_added(channel, user_id)
                }
                ChannelEvent::MemberRemoved { channel, user_id } => {
                    hooks.member_removed(channel, user_id)
                }
                ChannelEvent::ClientEvent {
                    channel,
                    event,
                    data,
                    socket_id,
                    user_id,
                } => hooks.client_event(channel, event, data, socket_id, *user_id),
            },
            ChannelObserver::Counters(stats) => {
                if matches!(event, ChannelEvent::ClientEvent { .. }) {
                    stats.mark_client_event();
                }
            }
        }
    }
}

pub struct Channel {
    id: String,
    kind: ChannelType,
    subscriptions: RwLock<HashMap<SocketId, Subscription>>,
    observers: Vec<ChannelObserver>,
    created_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(id: impl Into<String>, observers: Vec<ChannelObserver>) -> Self {
        let id = id.into();
        debug!(channel = %id, "creating channel");
        Self {
            kind: ChannelType::from_name(&id),
            id,
            subscriptions: RwLock::new(HashMap::new()),
            observers,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ChannelType {
        self.kind
    }

    pub fn is_presence(&self) -> bool {
        self.kind == ChannelType::Presence
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChannelType::Private
    }

    pub fn is_public(&self) -> bool {
        self.kind == ChannelType::Public
    }

    pub fn is_presence_or_private(&self) -> bool {
        self.kind.requires_authentication()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add `conn` to the channel, silently replacing a prior subscription
    /// for the same socket. A presence parse failure leaves no state behind.
    pub async fn subscribe(&self, conn: &Arc<Connection>, channel_data: &str) -> Result<()> {
        debug!(channel = %self.id, socket_id = %conn.socket_id(), "subscribing");

        let member = if self.kind == ChannelType::Presence {
            Some(PresenceMember::from_channel_data(channel_data)?)
        } else {
            None
        };

        let (was_empty, roster) = {
            let mut subs = self.subscriptions.write().await;
            let was_empty = subs.is_empty();
            subs.insert(
                conn.socket_id().clone(),
                Subscription {
                    connection: Arc::clone(conn),
                    presence: member.clone(),
                },
            );
            let roster = member.as_ref().map(|_| {
                PresenceData::from_members(subs.values().filter_map(|s| s.presence.as_ref()))
            });
            (was_empty, roster)
        };

        match (&member, roster) {
            (Some(member), Some(roster)) => {
                // Peers learn about the new member before the joiner is told
                // its subscribe completed.
                let frame = PusherMessage::member_added(
                    &self.id,
                    &member.user_id,
                    member.info_for_broadcast(),
                );
                self.broadcast_except(&frame, Some(conn.socket_id())).await;
                self.notify(&ChannelEvent::MemberAdded {
                    channel: &self.id,
                    user_id: &member.user_id,
                });
                conn.publish(&PusherMessage::subscription_succeeded(
                    &self.id,
                    roster.document(),
                ))
                .await;
            }
            _ => {
                conn.publish(&PusherMessage::subscription_succeeded(&self.id, "{}".into()))
                    .await;
            }
        }

        if was_empty {
            self.notify(&ChannelEvent::Occupied { channel: &self.id });
        }

        Ok(())
    }

    pub async fn unsubscribe(&self, socket_id: &SocketId) -> Result<()> {
        debug!(channel = %self.id, socket_id = %socket_id, "unsubscribing");

        let (removed, now_empty) = {
            let mut subs = self.subscriptions.write().await;
            let removed = subs
                .remove(socket_id)
                .ok_or(Error::SubscriptionNotFound)?;
            (removed, subs.is_empty())
        };

        if let Some(member) = &removed.presence {
            let frame = PusherMessage::member_removed(&self.id, &member.user_id);
            self.broadcast_except(&frame, None).await;
            self.notify(&ChannelEvent::MemberRemoved {
                channel: &self.id,
                user_id: &member.user_id,
            });
        }

        if now_empty {
            self.notify(&ChannelEvent::Vacated { channel: &self.id });
        }

        Ok(())
    }

    /// Fan `event` out to every subscription except `except`; the excepted
    /// sender of a `client-` event gets the client_event lifecycle instead.
    pub async fn publish(&self, event: &str, payload: &Value, except: Option<&SocketId>) {
        let subs = self.subscriptions.read().await;
        for (socket_id, sub) in subs.iter() {
            if Some(socket_id) != except {
                sub.connection
                    .publish(&PusherMessage::channel_event(event, &self.id, payload.clone()))
                    .await;
            } else if utils::is_client_event(event) {
                let user_id = if self.kind == ChannelType::Presence {
                    sub.presence.as_ref().map(|m| m.user_id.as_str())
                } else {
                    None
                };
                self.notify(&ChannelEvent::ClientEvent {
                    channel: &self.id,
                    event,
                    data: payload,
                    socket_id,
                    user_id,
                });
            }
        }
    }

    pub async fn is_subscribed(&self, socket_id: &SocketId) -> bool {
        self.subscriptions.read().await.contains_key(socket_id)
    }

    pub async fn total_subscriptions(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Distinct presence user ids.
    pub async fn total_users(&self) -> usize {
        let subs = self.subscriptions.read().await;
        let mut seen = std::collections::HashSet::new();
        for sub in subs.values() {
            if let Some(member) = &sub.presence {
                seen.insert(member.user_id.clone());
            }
        }
        seen.len()
    }

    pub async fn is_occupied(&self) -> bool {
        !self.subscriptions.read().await.is_empty()
    }

    // One user id per live subscription, sorted.
    pub async fn subscribed_user_ids(&self) -> Vec<String> {
        let subs = self.subscriptions.read().await;
        let mut ids: Vec<String> = subs
            .values()
            .filter_map(|s| s.presence.as_ref().map(|m| m.user_id.clone()))
            .collect();
        ids.sort();
        ids
    }

    async fn broadcast_except(&self, frame: &PusherMessage, except: Option<&SocketId>) {
        let subs = self.subscriptions.read().await;
        for (socket_id, sub) in subs.iter() {
            if Some(socket_id) != except {
                sub.connection.publish(frame).await;
            }
        }
    }

    fn notify(&self, event: &ChannelEvent<'_>) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}

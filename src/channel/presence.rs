use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceMember {
    pub user_id: String,
    pub user_info: Value,
}

impl PresenceMember {
    /// Parse the subscriber-supplied `channel_data` document. `user_id` may
    /// arrive as a JSON string or number; numbers are coerced to their
    /// decimal string form.
    pub fn from_channel_data(channel_data: &str) -> Result<Self> {
        let parsed: Value = serde_json::from_str(channel_data)
            .map_err(|_| Error::Channel("invalid JSON in channel_data".into()))?;

        let user_id = match parsed.get("user_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(Error::Channel("missing user_id in channel_data".into())),
        };

        let user_info = parsed.get("user_info").cloned().unwrap_or(Value::Null);

        Ok(Self { user_id, user_info })
    }

    pub fn info_for_broadcast(&self) -> Option<Value> {
        (!self.user_info.is_null()).then(|| self.user_info.clone())
    }
}

/// The roster sent back inside `pusher_internal:subscription_succeeded`.
#[derive(Debug, Serialize)]
pub struct PresenceData {
    pub ids: Vec<String>,
    pub hash: HashMap<String, Value>,
    pub count: usize,
}

impl PresenceData {
    /// Ids are distinct user ids, sorted so the document is deterministic; a
    /// user subscribed through several sockets appears once.
    pub fn from_members<'a, I>(members: I) -> Self
    where
        I: Iterator<Item = &'a PresenceMember>,
    {
        let mut hash = HashMap::new();
        for member in members {
            hash.insert(member.user_id.clone(), member.user_info.clone());
        }

        let mut ids: Vec<String> = hash.keys().cloned().collect();
        ids.sort();
        let count = ids.len();

        Self { ids, hash, count }
    }

    pub fn document(&self) -> String {
        serde_json::json!({ "presence": self }).to_string()
    }
}

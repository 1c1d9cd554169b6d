use serde::{Deserialize, Serialize};

use crate::token::Token;

/// One configured tenant, as declared in the configuration descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "app_id")]
    pub id: String,
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub only_ssl: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "user_events", default)]
    pub enable_client_messages: bool,
    #[serde(default)]
    pub webhooks: WebhookConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
}

fn default_true() -> bool {
    true
}

impl App {
    pub fn token(&self) -> Token {
        Token::new(self.key.clone(), self.secret.clone())
    }
}

use serde::Deserialize;
use std::path::Path;

use crate::app::config::App;
use crate::error::{Error, Result};

/// The configuration descriptor handed to the process entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub ssl: SslOptions,
    #[serde(default)]
    pub profiling: bool,
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub key_file: String,
    #[serde(default)]
    pub cert_file: String,
}

fn default_host() -> String {
    "0.0.0.0:8080".into()
}

impl ServerOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid configuration file: {e}")))
    }
}

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

use super::Application;
use crate::error::{Error, Result};

/// In-memory store of applications, shared by the wire and control planes.
/// Lookups by app id and by key resolve to the same `Application` in O(1);
/// reads never block each other.
#[derive(Default)]
pub struct AppRegistry {
    by_id: DashMap<String, Arc<Application>, RandomState>,
    by_key: DashMap<String, Arc<Application>, RandomState>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_app(&self, app: Arc<Application>) {
        self.by_id.insert(app.id().to_string(), Arc::clone(&app));
        self.by_key.insert(app.key().to_string(), app);
    }

    pub fn by_app_id(&self, app_id: &str) -> Result<Arc<Application>> {
        self.by_id
            .get(app_id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::AppNotFound)
    }

    pub fn by_key(&self, key: &str) -> Result<Arc<Application>> {
        self.by_key
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(Error::AppNotFound)
    }

    pub fn all(&self) -> Vec<Arc<Application>> {
        self.by_id.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::App;

    fn test_app(id: &str, key: &str) -> Arc<Application> {
        let config: App = serde_json::from_value(serde_json::json!({
            "app_id": id,
            "key": key,
            "secret": "s3cret",
        }))
        .unwrap();
        Arc::new(Application::new(config).unwrap())
    }

    #[test]
    fn lookups_by_id_and_key_return_the_same_app() {
        let registry = AppRegistry::new();
        registry.add_app(test_app("1", "K1"));
        registry.add_app(test_app("2", "K2"));

        let by_id = registry.by_app_id("1").unwrap();
        let by_key = registry.by_key("K1").unwrap();
        assert!(Arc::ptr_eq(&by_id, &by_key));
        assert_eq!(registry.by_app_id("2").unwrap().key(), "K2");
    }

    #[test]
    fn missing_apps_are_a_dedicated_error() {
        let registry = AppRegistry::new();
        assert!(matches!(registry.by_app_id("nope"), Err(Error::AppNotFound)));
        assert!(matches!(registry.by_key("nope"), Err(Error::AppNotFound)));
    }
}

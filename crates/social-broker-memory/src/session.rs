// In-memory session backend. One backend holds many session scopes; each
// scope sees only its own keys, so state from one login attempt can never
// leak into another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use social_broker::session::SessionStore;
use social_broker_core::error::Result;

type Scopes = HashMap<String, HashMap<String, String>>;

/// Shared backend for in-memory sessions.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionBackend {
    scopes: Arc<RwLock<Scopes>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store view scoped to one caller-identified session.
    pub fn session(&self, id: impl Into<String>) -> MemorySessionStore {
        MemorySessionStore {
            scope: id.into(),
            scopes: self.scopes.clone(),
        }
    }
}

/// One session scope.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    scope: String,
    scopes: Arc<RwLock<Scopes>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(self.scope.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let scopes = self.scopes.read().await;
        Ok(scopes.get(&self.scope).and_then(|s| s.get(key)).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut scopes = self.scopes.write().await;
        if let Some(scope) = scopes.get_mut(&self.scope) {
            scope.remove(key);
        }
        Ok(())
    }
}

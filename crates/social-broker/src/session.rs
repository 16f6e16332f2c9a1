// Handshake state that must survive the provider redirect round-trip.
// The broker never touches ambient session state: callers hand in a
// SessionStore scoped to their own session, and the whole attempt is
// serialized under a single key there.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use social_broker_core::error::{BrokerError, Result};

/// The one key the broker writes into a caller's session.
pub const ATTEMPT_KEY: &str = "social_broker.attempt";

/// How long a started handshake may wait for its callback.
pub const ATTEMPT_TTL_MINUTES: i64 = 10;

/// Narrow session interface. Scoped to one caller-identified session;
/// state set for one attempt must never be readable under another scope.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Orchestrator phases. Only `HandshakePending` is ever persisted; the
/// rest are walked within a single callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    ProviderSelected,
    HandshakePending,
    Authenticated,
    Reconciled,
    Done,
    Failed,
}

/// One in-flight login attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub provider: String,
    pub phase: AttemptPhase,
    pub created_at: DateTime<Utc>,
    /// Handshake key/value state: CSRF token, PKCE verifier, redirect target.
    pub state: BTreeMap<String, String>,
}

impl AuthSession {
    pub const STATE_CSRF: &'static str = "csrf";
    pub const STATE_VERIFIER: &'static str = "code_verifier";
    pub const STATE_REDIRECT: &'static str = "redirect";

    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            phase: AttemptPhase::ProviderSelected,
            created_at: Utc::now(),
            state: BTreeMap::new(),
        }
    }

    pub fn with_state(mut self, key: &str, value: impl Into<String>) -> Self {
        self.state.insert(key.to_string(), value.into());
        self
    }

    pub fn state_value(&self, key: &str) -> Option<&str> {
        self.state.get(key).map(String::as_str)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > chrono::Duration::minutes(ATTEMPT_TTL_MINUTES)
    }

    /// Persist under the well-known key in the caller's session scope.
    pub async fn persist(&self, store: &dyn SessionStore) -> Result<()> {
        let serialized = serde_json::to_string(self)
            .map_err(|e| BrokerError::store(format!("failed to serialize attempt state: {e}")))?;
        store.set(ATTEMPT_KEY, &serialized).await
    }

    /// Load the attempt for this session scope, if any.
    pub async fn load(store: &dyn SessionStore) -> Result<Option<Self>> {
        match store.get(ATTEMPT_KEY).await? {
            None => Ok(None),
            Some(serialized) => serde_json::from_str(&serialized)
                .map(Some)
                .map_err(|e| BrokerError::store(format!("corrupt attempt state: {e}"))),
        }
    }

    /// Destroy the attempt state. Called on both terminal outcomes.
    pub async fn clear(store: &dyn SessionStore) -> Result<()> {
        store.remove(ATTEMPT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_round_trips_through_json() {
        let attempt = AuthSession::new("google")
            .with_state(AuthSession::STATE_CSRF, "abc")
            .with_state(AuthSession::STATE_VERIFIER, "xyz");
        let json = serde_json::to_string(&attempt).unwrap();
        let restored: AuthSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.provider, "google");
        assert_eq!(restored.state_value(AuthSession::STATE_CSRF), Some("abc"));
        assert_eq!(restored.phase, AttemptPhase::ProviderSelected);
    }

    #[test]
    fn staleness_window() {
        let mut attempt = AuthSession::new("google");
        let now = Utc::now();
        assert!(!attempt.is_stale(now));
        attempt.created_at = now - chrono::Duration::minutes(ATTEMPT_TTL_MINUTES + 1);
        assert!(attempt.is_stale(now));
    }
}

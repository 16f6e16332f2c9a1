// Reconciliation extension points. An explicit, ordered list of observers
// replaces any implicit event broadcast: external collaborators can add or
// audit fields without the reconciler knowing about them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::profile::SocialProfile;
use crate::stores::StoredUser;

/// Observer invoked at the two defined extension points. Both methods
/// default to no-ops so an implementation can pick one.
#[async_trait]
pub trait ReconcileObserver: Send + Sync {
    /// Before persisting: may add or adjust fields.
    async fn on_before_persist(
        &self,
        _profile: &SocialProfile,
        _fields: &mut BTreeMap<String, String>,
    ) {
    }

    /// After the final record is produced.
    async fn on_after_reconcile(&self, _profile: &SocialProfile, _user: &StoredUser) {}
}

/// Ordered observer registry; invocation order is registration order.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn ReconcileObserver>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn ReconcileObserver>) {
        self.observers.push(observer);
    }

    pub async fn run_before_persist(
        &self,
        profile: &SocialProfile,
        fields: &mut BTreeMap<String, String>,
    ) {
        for observer in &self.observers {
            observer.on_before_persist(profile, fields).await;
        }
    }

    pub async fn run_after_reconcile(&self, profile: &SocialProfile, user: &StoredUser) {
        for observer in &self.observers {
            observer.on_after_reconcile(profile, user).await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagger(&'static str);

    #[async_trait]
    impl ReconcileObserver for Tagger {
        async fn on_before_persist(
            &self,
            _profile: &SocialProfile,
            fields: &mut BTreeMap<String, String>,
        ) {
            let mut trail = fields.get("trail").cloned().unwrap_or_default();
            trail.push_str(self.0);
            fields.insert("trail".into(), trail);
        }
    }

    #[tokio::test]
    async fn observers_run_in_registration_order() {
        let mut registry = ObserverRegistry::new();
        registry.register(Arc::new(Tagger("a")));
        registry.register(Arc::new(Tagger("b")));

        let profile = SocialProfile {
            identifier: "1".into(),
            provider: "google".into(),
            ..Default::default()
        };
        let mut fields = BTreeMap::new();
        registry.run_before_persist(&profile, &mut fields).await;

        assert_eq!(fields.get("trail").map(String::as_str), Some("ab"));
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        let profile = SocialProfile::default();
        let mut fields = BTreeMap::new();
        registry.run_before_persist(&profile, &mut fields).await;
        assert!(fields.is_empty());
    }
}

// In-memory identity store. A Vec of records behind a tokio RwLock;
// uniqueness of (namespace, provider, identifier) is enforced on insert
// the way a database unique constraint would be.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use social_broker::stores::{IdentityStore, NewUser, StoredUser, UserUpdate};
use social_broker_core::error::{BrokerError, Result};

/// In-memory identity store. Data is lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    users: Arc<RwLock<Vec<StoredUser>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Snapshot of all records, for assertions in tests.
    pub async fn snapshot(&self) -> Vec<StoredUser> {
        self.users.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn find_by_id(&self, id: i64) -> Option<StoredUser> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_external_identity(
        &self,
        namespace: i64,
        provider_code: i64,
        identifier: &str,
    ) -> Result<Option<StoredUser>> {
        let users = self.users.read().await;
        let found = users
            .iter()
            .filter(|u| {
                u.namespace == namespace
                    && u.external_provider == provider_code
                    && u.external_identifier == identifier
            })
            // Most recently modified wins; ties resolve to the newest id.
            .max_by_key(|u| (u.updated_at, u.id))
            .cloned();
        Ok(found)
    }

    async fn username_taken(
        &self,
        namespace: i64,
        username: &str,
        excluding_id: i64,
    ) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .any(|u| u.namespace == namespace && u.id != excluding_id && u.username == username))
    }

    async fn insert(&self, namespace: i64, record: NewUser) -> Result<StoredUser> {
        let mut users = self.users.write().await;

        let duplicate = !record.external_identifier.is_empty()
            && users.iter().any(|u| {
                u.namespace == namespace
                    && u.external_provider == record.external_provider
                    && u.external_identifier == record.external_identifier
            });
        if duplicate {
            return Err(BrokerError::store_conflict(format!(
                "external identity ({}, {}) already exists",
                record.external_provider, record.external_identifier
            )));
        }

        let now = Utc::now();
        let user = StoredUser {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            namespace,
            username: record.username,
            external_identifier: record.external_identifier,
            external_provider: record.external_provider,
            fields: record.fields,
            groups: record.groups,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, update: UserUpdate) -> Result<StoredUser> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| BrokerError::store(format!("no user with id {id}")))?;

        if let Some(username) = update.username {
            user.username = username;
        }
        for (key, value) in update.fields {
            user.fields.insert(key, value);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn record(username: &str, identifier: &str) -> NewUser {
        NewUser {
            username: username.into(),
            external_identifier: identifier.into(),
            external_provider: 2,
            fields: BTreeMap::new(),
            groups: BTreeSet::from([1]),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryIdentityStore::new();
        let a = store.insert(1, record("a", "id-a")).await.unwrap();
        let b = store.insert(1, record("b", "id-b")).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn duplicate_external_identity_is_rejected() {
        let store = MemoryIdentityStore::new();
        store.insert(1, record("a", "same")).await.unwrap();
        let err = store.insert(1, record("b", "same")).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn same_identity_in_another_namespace_is_allowed() {
        let store = MemoryIdentityStore::new();
        store.insert(1, record("a", "same")).await.unwrap();
        assert!(store.insert(2, record("b", "same")).await.is_ok());
    }

    #[tokio::test]
    async fn find_returns_most_recently_updated() {
        let store = MemoryIdentityStore::new();
        let first = store.insert(1, record("a", "dup")).await.unwrap();
        // Bypass the uniqueness check to simulate legacy duplicate rows.
        {
            let mut users = store.users.write().await;
            let mut copy = first.clone();
            copy.id = 999;
            copy.username = "a-copy".into();
            users.push(copy);
        }
        store
            .update(999, UserUpdate::default())
            .await
            .unwrap();

        let found = store.find_by_external_identity(1, 2, "dup").await.unwrap().unwrap();
        assert_eq!(found.id, 999);
    }

    #[tokio::test]
    async fn username_taken_excludes_the_given_record() {
        let store = MemoryIdentityStore::new();
        let user = store.insert(1, record("alice", "x")).await.unwrap();
        assert!(!store.username_taken(1, "alice", user.id).await.unwrap());
        assert!(store.username_taken(1, "alice", 0).await.unwrap());
        assert!(!store.username_taken(2, "alice", 0).await.unwrap());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryIdentityStore::new();
        let mut rec = record("a", "x");
        rec.fields.insert("city".into(), "Gent".into());
        let user = store.insert(1, rec).await.unwrap();

        let updated = store
            .update(
                user.id,
                UserUpdate {
                    username: Some("b".into()),
                    fields: BTreeMap::from([("zip".into(), "9000".into())]),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "b");
        assert_eq!(updated.fields.get("city").map(String::as_str), Some("Gent"));
        assert_eq!(updated.fields.get("zip").map(String::as_str), Some("9000"));
        assert!(updated.updated_at >= user.updated_at);
    }
}

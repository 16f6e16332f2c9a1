// Collaborator capabilities the reconciler talks to: the identity store
// holding local user records and the asset store holding profile photos.
// These are the only interfaces the broker needs from its host; a CMS,
// a SQL database, or the in-memory implementations all fit behind them.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use social_broker_core::error::Result;

/// A persisted local user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    /// Store-assigned id.
    pub id: i64,
    /// Namespace the record lives under.
    pub namespace: i64,
    /// Unique within the namespace, across all users.
    pub username: String,
    pub external_identifier: String,
    /// Integer provider code from the reconcile policy.
    pub external_provider: i64,
    /// Free-form profile fields (name, email, address, ...).
    pub fields: BTreeMap<String, String>,
    pub groups: BTreeSet<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    /// Whether the record already carries a linked image.
    pub fn has_image(&self) -> bool {
        self.fields
            .get("image")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false)
    }
}

/// Fields for a fresh user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub external_identifier: String,
    pub external_provider: i64,
    pub fields: BTreeMap<String, String>,
    pub groups: BTreeSet<i64>,
}

/// A partial update against an existing record. `fields` are merged;
/// absent keys are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// The identity store capability.
///
/// `insert` must enforce uniqueness of `(namespace, external_provider,
/// external_identifier)`; a concurrent duplicate insert fails with a
/// unique-violation store error, which the reconciler turns into an
/// update-path retry.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the user for an external identity. When duplicates exist the
    /// most recently modified record wins.
    async fn find_by_external_identity(
        &self,
        namespace: i64,
        provider_code: i64,
        identifier: &str,
    ) -> Result<Option<StoredUser>>;

    /// Whether a username is taken within the namespace by any record
    /// other than `excluding_id`.
    async fn username_taken(
        &self,
        namespace: i64,
        username: &str,
        excluding_id: i64,
    ) -> Result<bool>;

    async fn insert(&self, namespace: i64, record: NewUser) -> Result<StoredUser>;

    async fn update(&self, id: i64, update: UserUpdate) -> Result<StoredUser>;
}

/// Reference to a stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef(pub String);

/// The asset store capability. Failures here must never fail a
/// reconciliation; callers log and move on.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store binary content, returning a reference to it.
    async fn put(&self, content: &[u8], suggested_name: &str) -> Result<AssetRef>;

    /// Link a stored asset to a user record field.
    async fn link(&self, asset: &AssetRef, user_id: i64, field_name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_image_treats_zero_as_absent() {
        let mut user = StoredUser {
            id: 1,
            namespace: 1,
            username: "u".into(),
            external_identifier: "x".into(),
            external_provider: 1,
            fields: BTreeMap::new(),
            groups: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!user.has_image());
        user.fields.insert("image".into(), "0".into());
        assert!(!user.has_image());
        user.fields.insert("image".into(), "asset-7".into());
        assert!(user.has_image());
    }
}

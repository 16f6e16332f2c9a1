// The identity reconciler: maps a canonical profile onto a local user
// record with create-or-update semantics. Lookup-then-write runs under a
// per-identity-key lock so two callbacks for the same external identity
// can never both take the insert branch; a unique-violation from the
// store (an external writer racing us) falls back to the update path.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use social_broker_core::error::{BrokerError, ErrorKind, Result};
use social_broker_core::logger::BrokerLogger;
use social_broker_core::options::ReconcilePolicy;
use social_broker_core::random::generate_placeholder_password;

use crate::observer::ObserverRegistry;
use crate::photo::{photo_file_name, HttpPhotoFetcher, PhotoFetcher};
use crate::profile::SocialProfile;
use crate::stores::{AssetRef, AssetStore, IdentityStore, NewUser, StoredUser, UserUpdate};

/// Result of one reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub user: StoredUser,
    pub is_new: bool,
}

type IdentityKey = (i64, String);

/// Per-identity-key mutual exclusion across the lookup-then-write sequence.
#[derive(Default)]
struct KeyLocks {
    inner: Mutex<HashMap<IdentityKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: IdentityKey) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct Reconciler {
    store: Arc<dyn IdentityStore>,
    assets: Arc<dyn AssetStore>,
    photos: Arc<dyn PhotoFetcher>,
    observers: ObserverRegistry,
    policy: ReconcilePolicy,
    logger: BrokerLogger,
    locks: KeyLocks,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("policy", &self.policy)
            .field("observers", &self.observers)
            .finish()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        assets: Arc<dyn AssetStore>,
        observers: ObserverRegistry,
        policy: ReconcilePolicy,
        logger: BrokerLogger,
    ) -> Self {
        Self {
            store,
            assets,
            photos: Arc::new(HttpPhotoFetcher::new()),
            observers,
            policy,
            logger,
            locks: KeyLocks::default(),
        }
    }

    /// Substitute the photo transport (tests, offline hosts).
    pub fn with_photo_fetcher(mut self, photos: Arc<dyn PhotoFetcher>) -> Self {
        self.photos = photos;
        self
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Reconcile a canonical profile against the identity store.
    pub async fn reconcile(&self, profile: &SocialProfile) -> Result<ReconcileOutcome> {
        if !profile.has_identity_key() {
            return Err(BrokerError::auth(
                ErrorKind::MalformedProfile,
                "profile is missing its external identity key",
            ));
        }

        let namespace = self.policy.storage_namespace;
        let code = self.policy.provider_code(&profile.provider).ok_or_else(|| {
            BrokerError::Config(format!(
                "provider '{}' has no entry in the provider code map",
                profile.provider
            ))
        })?;

        let _guard = self
            .locks
            .acquire((code, profile.identifier.clone()))
            .await;

        let seed = profile.username_seed();
        let mut fields = build_fields(profile);
        let photo = self.stage_photo(profile).await;

        self.observers.run_before_persist(profile, &mut fields).await;

        let existing = self.find_with_retry(namespace, code, &profile.identifier).await?;
        let username_excluded = self.policy.excluded_fields_on_update.contains("username");

        let (mut user, is_new) = match existing {
            Some(current) => {
                let update = self.update_fields(&fields);
                (self.update_with_retry(current.id, update).await?, false)
            }
            None => {
                let record = NewUser {
                    username: seed.clone(),
                    external_identifier: profile.identifier.clone(),
                    external_provider: code,
                    fields: fields.clone(),
                    groups: BTreeSet::from([self.policy.default_group]),
                };
                self.insert_or_fall_back(namespace, code, profile, record, &fields)
                    .await?
            }
        };

        // Username collision resolution, idempotent: the record itself is
        // excluded from the check, so a previously assigned suffix sticks.
        let candidate = if !is_new && username_excluded {
            user.username.clone()
        } else {
            seed
        };
        let unique = self.unique_username(namespace, &candidate, user.id).await?;
        if unique != user.username {
            user = self
                .update_with_retry(
                    user.id,
                    UserUpdate {
                        username: Some(unique),
                        fields: BTreeMap::new(),
                    },
                )
                .await?;
        }

        // An existing image is never overwritten; a fetched photo is linked
        // only for new users or users without one.
        if let Some(asset) = photo {
            if is_new || !user.has_image() {
                user = self.link_photo(user, &asset).await;
            }
        }

        self.observers.run_after_reconcile(profile, &user).await;

        Ok(ReconcileOutcome { user, is_new })
    }

    /// The field set for the update path: policy-excluded fields dropped.
    fn update_fields(&self, fields: &BTreeMap<String, String>) -> UserUpdate {
        let mut update_fields = fields.clone();
        for name in &self.policy.excluded_fields_on_update {
            update_fields.remove(name);
        }
        UserUpdate {
            username: None,
            fields: update_fields,
        }
    }

    /// Insert, retrying once on a transient failure. A unique violation
    /// means a concurrent writer inserted the identity first; re-find and
    /// take the update path instead.
    async fn insert_or_fall_back(
        &self,
        namespace: i64,
        code: i64,
        profile: &SocialProfile,
        record: NewUser,
        fields: &BTreeMap<String, String>,
    ) -> Result<(StoredUser, bool)> {
        let inserted = match self.store.insert(namespace, record.clone()).await {
            Err(e) if e.is_transient_store() => self.store.insert(namespace, record).await,
            other => other,
        };

        match inserted {
            Ok(user) => Ok((user, true)),
            Err(e) if e.is_unique_violation() => {
                self.logger.debug(&format!(
                    "concurrent insert for '{}' identity, switching to update",
                    profile.provider
                ));
                let current = self
                    .find_with_retry(namespace, code, &profile.identifier)
                    .await?
                    .ok_or_else(|| {
                        BrokerError::store("identity vanished after a duplicate-insert conflict")
                    })?;
                let update = self.update_fields(fields);
                Ok((self.update_with_retry(current.id, update).await?, false))
            }
            Err(e) => Err(e),
        }
    }

    async fn find_with_retry(
        &self,
        namespace: i64,
        code: i64,
        identifier: &str,
    ) -> Result<Option<StoredUser>> {
        match self
            .store
            .find_by_external_identity(namespace, code, identifier)
            .await
        {
            Err(e) if e.is_transient_store() => {
                self.store
                    .find_by_external_identity(namespace, code, identifier)
                    .await
            }
            other => other,
        }
    }

    async fn update_with_retry(&self, id: i64, update: UserUpdate) -> Result<StoredUser> {
        match self.store.update(id, update.clone()).await {
            Err(e) if e.is_transient_store() => self.store.update(id, update).await,
            other => other,
        }
    }

    /// Deterministic collision resolution: seed, seed1, seed2, ...
    async fn unique_username(&self, namespace: i64, seed: &str, excluding: i64) -> Result<String> {
        let mut candidate = seed.to_string();
        let mut suffix: u32 = 0;
        loop {
            let taken = match self
                .store
                .username_taken(namespace, &candidate, excluding)
                .await
            {
                Err(e) if e.is_transient_store() => {
                    self.store
                        .username_taken(namespace, &candidate, excluding)
                        .await?
                }
                other => other?,
            };
            if !taken {
                return Ok(candidate);
            }
            suffix += 1;
            if suffix > 10_000 {
                return Err(BrokerError::store(format!(
                    "could not find a free username for seed '{seed}'"
                )));
            }
            candidate = format!("{seed}{suffix}");
        }
    }

    /// Fetch and store the profile photo. Any failure is logged and
    /// swallowed; the reconciliation proceeds without the image.
    async fn stage_photo(&self, profile: &SocialProfile) -> Option<AssetRef> {
        let url = profile.photo_url.as_deref()?;
        let bytes = match self.photos.fetch(url).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(e) => {
                self.logger
                    .warn(&format!("photo fetch for '{}' failed: {e}", profile.provider));
                return None;
            }
        };
        let name = photo_file_name(&profile.provider, &profile.identifier);
        match self.assets.put(&bytes, &name).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                self.logger
                    .warn(&format!("asset store rejected '{name}': {e}"));
                None
            }
        }
    }

    async fn link_photo(&self, user: StoredUser, asset: &AssetRef) -> StoredUser {
        if let Err(e) = self.assets.link(asset, user.id, "image").await {
            self.logger
                .warn(&format!("linking photo to user {} failed: {e}", user.id));
            return user;
        }
        match self
            .update_with_retry(
                user.id,
                UserUpdate {
                    username: None,
                    fields: BTreeMap::from([("image".to_string(), asset.0.clone())]),
                },
            )
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                self.logger
                    .warn(&format!("recording image field on user {} failed: {e}", user.id));
                user
            }
        }
    }
}

/// Build the persisted field set from a profile. Empty values are dropped;
/// the placeholder password and last-login stamp are always present.
fn build_fields(profile: &SocialProfile) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("lastlogin".to_string(), Utc::now().timestamp().to_string());
    fields.insert("password".to_string(), generate_placeholder_password());
    insert_nonempty(&mut fields, "name", &profile.display_name);
    insert_nonempty(&mut fields, "first_name", &profile.first_name);
    insert_nonempty(&mut fields, "last_name", &profile.last_name);
    insert_nonempty(&mut fields, "email", &profile.email);
    insert_nonempty(&mut fields, "telephone", &profile.phone);
    insert_nonempty(&mut fields, "address", &profile.address);
    insert_nonempty(&mut fields, "city", &profile.city);
    insert_nonempty(&mut fields, "zip", &profile.zip);
    insert_nonempty(&mut fields, "country", &profile.country);
    fields
}

fn insert_nonempty(fields: &mut BTreeMap<String, String>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        fields.insert(key.to_string(), v.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fields_drops_empty_values() {
        let profile = SocialProfile {
            identifier: "1".into(),
            provider: "google".into(),
            email: Some("a@b.com".into()),
            display_name: Some("Ada".into()),
            city: Some(String::new()),
            ..Default::default()
        };
        let fields = build_fields(&profile);
        assert_eq!(fields.get("email").map(String::as_str), Some("a@b.com"));
        assert_eq!(fields.get("name").map(String::as_str), Some("Ada"));
        assert!(!fields.contains_key("city"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("lastlogin"));
    }

    #[test]
    fn placeholder_password_changes_per_build() {
        let profile = SocialProfile {
            identifier: "1".into(),
            provider: "google".into(),
            ..Default::default()
        };
        let a = build_fields(&profile);
        let b = build_fields(&profile);
        assert_ne!(a.get("password"), b.get("password"));
    }
}

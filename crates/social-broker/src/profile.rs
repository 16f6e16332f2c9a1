// The canonical, provider-independent profile shape. `(provider,
// identifier)` is the external identity key; both must be non-empty for
// reconciliation to proceed.

use serde::{Deserialize, Serialize};

use social_broker_core::sanitize::clean_username;

/// A normalized social profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialProfile {
    /// Provider-scoped unique identifier. Required.
    pub identifier: String,

    /// Provider name, lower-case. Required.
    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl SocialProfile {
    /// The username seed: the email when present, else the sanitized
    /// display name, else a provider-scoped fallback so the seed is never
    /// empty.
    pub fn username_seed(&self) -> String {
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return email.to_string();
        }
        if let Some(display) = self.display_name.as_deref() {
            let seed = clean_username(display);
            if !seed.is_empty() {
                return seed;
            }
        }
        clean_username(&format!("{}{}", self.provider, self.identifier))
    }

    /// Whether the external identity key is usable.
    pub fn has_identity_key(&self) -> bool {
        !self.identifier.is_empty() && !self.provider.is_empty()
    }
}

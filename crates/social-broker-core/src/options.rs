// Broker configuration: per-provider settings, the reconciliation policy,
// and the top-level options struct. Loaded once at startup, validated with
// fail-fast semantics, immutable afterward.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, Result};

/// OAuth client credentials for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

/// Static per-provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider identifier, lower-case (e.g. "google").
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    pub credentials: Credentials,

    /// Scope override; when absent the provider's defaults apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Authorization dialog display hint (e.g. "page", "popup").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            enabled: true,
            credentials: Credentials {
                id: id.into(),
                secret: secret.into(),
            },
            scope: None,
            display_mode: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_display_mode(mut self, mode: impl Into<String>) -> Self {
        self.display_mode = Some(mode.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Policy driving the identity reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePolicy {
    /// Namespace (record folder) every user row lives under.
    pub storage_namespace: i64,

    /// Group assigned to newly created users.
    pub default_group: i64,

    /// Field names never overwritten when updating an existing user.
    #[serde(default)]
    pub excluded_fields_on_update: HashSet<String>,

    /// Provider name to the integer code stored on the user record.
    #[serde(default = "default_provider_codes")]
    pub provider_code_map: HashMap<String, i64>,
}

impl ReconcilePolicy {
    pub fn new(storage_namespace: i64, default_group: i64) -> Self {
        Self {
            storage_namespace,
            default_group,
            excluded_fields_on_update: HashSet::new(),
            provider_code_map: default_provider_codes(),
        }
    }

    pub fn exclude_on_update(mut self, fields: &[&str]) -> Self {
        self.excluded_fields_on_update = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn provider_code(&self, provider: &str) -> Option<i64> {
        self.provider_code_map.get(provider).copied()
    }
}

/// The stock provider codes. Stable across releases: these values are
/// persisted on user records.
pub fn default_provider_codes() -> HashMap<String, i64> {
    HashMap::from([
        ("facebook".to_string(), 1),
        ("google".to_string(), 2),
        ("twitter".to_string(), 3),
        ("linkedin".to_string(), 4),
        ("instagram".to_string(), 5),
    ])
}

/// Top-level broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerOptions {
    /// Provider configurations, in display order.
    pub providers: Vec<ProviderConfig>,

    pub policy: ReconcilePolicy,

    /// Redirect URI registered with every provider; the callback leg of the
    /// handshake lands here.
    pub callback_url: String,

    /// Where a successful login redirects when the caller supplied no target.
    #[serde(default = "default_post_login_url")]
    pub post_login_url: String,

    /// Where recoverable failures redirect, with `?error=<CODE>` attached.
    #[serde(default = "default_post_login_url")]
    pub fallback_url: String,
}

fn default_post_login_url() -> String {
    "/".to_string()
}

impl BrokerOptions {
    pub fn new(callback_url: impl Into<String>, policy: ReconcilePolicy) -> Self {
        Self {
            providers: Vec::new(),
            policy,
            callback_url: callback_url.into(),
            post_login_url: default_post_login_url(),
            fallback_url: default_post_login_url(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = url.into();
        self
    }

    pub fn with_post_login_url(mut self, url: impl Into<String>) -> Self {
        self.post_login_url = url.into();
        self
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Names of enabled providers, configuration order preserved.
    pub fn enabled_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Fail-fast startup validation.
    pub fn validate(&self) -> Result<()> {
        if self.policy.storage_namespace <= 0 {
            return Err(BrokerError::Config(
                "storage namespace must be set and positive".into(),
            ));
        }
        if self.policy.default_group <= 0 {
            return Err(BrokerError::Config(
                "default user group must be set and positive".into(),
            ));
        }
        if self.callback_url.is_empty() {
            return Err(BrokerError::Config("callback URL must be set".into()));
        }
        for provider in self.providers.iter().filter(|p| p.enabled) {
            if provider.credentials.id.is_empty() || provider.credentials.secret.is_empty() {
                return Err(BrokerError::Config(format!(
                    "provider '{}' is enabled but has no application credentials",
                    provider.name
                )));
            }
            if self.policy.provider_code(&provider.name).is_none() {
                return Err(BrokerError::Config(format!(
                    "provider '{}' has no entry in the provider code map",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_options() -> BrokerOptions {
        BrokerOptions::new("https://example.com/callback", ReconcilePolicy::new(12, 3))
            .with_provider(ProviderConfig::new("google", "cid", "csecret"))
    }

    #[test]
    fn valid_options_pass() {
        assert!(valid_options().validate().is_ok());
    }

    #[test]
    fn missing_namespace_fails_fast() {
        let mut opts = valid_options();
        opts.policy.storage_namespace = 0;
        assert!(matches!(opts.validate(), Err(BrokerError::Config(_))));
    }

    #[test]
    fn missing_default_group_fails_fast() {
        let mut opts = valid_options();
        opts.policy.default_group = 0;
        assert!(matches!(opts.validate(), Err(BrokerError::Config(_))));
    }

    #[test]
    fn enabled_provider_without_credentials_fails() {
        let opts = BrokerOptions::new("https://example.com/cb", ReconcilePolicy::new(1, 1))
            .with_provider(ProviderConfig::new("facebook", "", ""));
        assert!(opts.validate().is_err());
    }

    #[test]
    fn disabled_provider_without_credentials_is_fine() {
        let opts = BrokerOptions::new("https://example.com/cb", ReconcilePolicy::new(1, 1))
            .with_provider(ProviderConfig::new("facebook", "", "").disabled());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn provider_outside_code_map_fails() {
        let opts = BrokerOptions::new("https://example.com/cb", ReconcilePolicy::new(1, 1))
            .with_provider(ProviderConfig::new("myspace", "id", "secret"));
        assert!(opts.validate().is_err());
    }

    #[test]
    fn enabled_providers_preserve_order() {
        let opts = BrokerOptions::new("https://example.com/cb", ReconcilePolicy::new(1, 1))
            .with_provider(ProviderConfig::new("twitter", "a", "b"))
            .with_provider(ProviderConfig::new("google", "c", "d").disabled())
            .with_provider(ProviderConfig::new("facebook", "e", "f"));
        assert_eq!(opts.enabled_providers(), vec!["twitter", "facebook"]);
    }

    #[test]
    fn default_codes_match_stored_values() {
        let policy = ReconcilePolicy::new(1, 1);
        assert_eq!(policy.provider_code("facebook"), Some(1));
        assert_eq!(policy.provider_code("google"), Some(2));
        assert_eq!(policy.provider_code("twitter"), Some(3));
        assert_eq!(policy.provider_code("linkedin"), Some(4));
        assert_eq!(policy.provider_code("instagram"), Some(5));
        assert_eq!(policy.provider_code("github"), None);
    }
}

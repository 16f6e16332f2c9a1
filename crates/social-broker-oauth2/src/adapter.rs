// The ProviderAdapter capability. One instance per configured provider,
// stateless aside from credentials; the orchestrator selects an adapter by
// name and drives the handshake through this interface. Provider-protocol
// errors never cross this boundary untranslated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use social_broker_core::error::{ErrorKind, Result};

use crate::tokens::OAuth2Tokens;

/// Query parameters carried by the provider's callback request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    /// Legacy denial marker some providers send instead of `error`.
    #[serde(default)]
    pub denied: Option<String>,
}

impl CallbackParams {
    /// Classify an error indicator in the callback, if any. Cancellation
    /// variants are distinguished from provider-side failures.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.denied.is_some() {
            return Some(ErrorKind::UserCancelledOrDenied);
        }
        match self.error.as_deref() {
            None => None,
            Some("access_denied") | Some("user_denied") | Some("consent_required") => {
                Some(ErrorKind::UserCancelledOrDenied)
            }
            Some(_) => Some(ErrorKind::ProviderUnavailable),
        }
    }
}

/// Output of `start_authentication`: where to send the visitor, plus the
/// handshake material the caller must persist across the redirect.
#[derive(Debug, Clone)]
pub struct StartedAuthentication {
    pub redirect: url::Url,
    pub state: String,
    pub code_verifier: String,
}

/// Handshake material restored from the session on the callback leg.
#[derive(Debug, Clone)]
pub struct HandshakeProof {
    pub state: String,
    pub code_verifier: String,
}

/// Output of `complete_authentication`.
#[derive(Debug, Clone)]
pub struct CompletedAuthentication {
    /// The provider's profile document, untouched.
    pub raw_profile: serde_json::Value,
    pub access_token: String,
    pub tokens: OAuth2Tokens,
}

/// Capability implemented once per provider. Adding a provider means adding
/// an implementation (or a descriptor for the generic one), never touching
/// the orchestrator.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Provider identifier, lower-case (e.g. "google").
    fn name(&self) -> &str;

    /// Human-readable provider name.
    fn display_name(&self) -> &str;

    /// Build the authorization redirect and fresh handshake material.
    async fn start_authentication(&self) -> Result<StartedAuthentication>;

    /// Exchange the callback's code for tokens and fetch the raw profile.
    /// The CSRF state comparison is the caller's job; `proof` supplies the
    /// PKCE verifier persisted on the start leg.
    async fn complete_authentication(
        &self,
        params: &CallbackParams,
        proof: &HandshakeProof,
    ) -> Result<CompletedAuthentication>;

    /// Fetch the raw profile document for an access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<serde_json::Value>;

    /// Whether the given token still resolves to a profile at the provider.
    async fn is_connected(&self, access_token: &str) -> bool {
        !access_token.is_empty() && self.fetch_profile(access_token).await.is_ok()
    }

    /// Revoke provider-side handshake material. Default: nothing to revoke.
    async fn disconnect(&self, _access_token: &str) -> Result<()> {
        Ok(())
    }
}

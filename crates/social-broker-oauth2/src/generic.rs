// The descriptor-driven adapter: one implementation covers every supported
// provider. All network calls share a bounded-timeout client; a timeout is
// a recoverable ProviderUnavailable, never a hang.

use std::time::Duration;

use async_trait::async_trait;

use social_broker_core::error::{BrokerError, ErrorKind, Result};
use social_broker_core::options::ProviderConfig;
use social_broker_core::random::generate_random_string;
use social_broker_core::sanitize::coerce_utf8;

use crate::adapter::{
    CallbackParams, CompletedAuthentication, HandshakeProof, ProviderAdapter,
    StartedAuthentication,
};
use crate::authorization_url::build_authorization_url;
use crate::code_exchange::{exchange_code, transport_error, CodeExchange};
use crate::descriptor::ProviderDescriptor;
use crate::pkce::generate_code_verifier;

const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);
const STATE_LENGTH: usize = 32;

/// A provider adapter executing a static [`ProviderDescriptor`].
#[derive(Debug, Clone)]
pub struct GenericOAuthAdapter {
    descriptor: &'static ProviderDescriptor,
    config: ProviderConfig,
    redirect_uri: String,
    http: reqwest::Client,
}

impl GenericOAuthAdapter {
    pub fn new(
        descriptor: &'static ProviderDescriptor,
        config: ProviderConfig,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(NETWORK_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            descriptor,
            config,
            redirect_uri: redirect_uri.into(),
            http,
        }
    }

    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        self.descriptor
    }
}

#[async_trait]
impl ProviderAdapter for GenericOAuthAdapter {
    fn name(&self) -> &str {
        self.descriptor.name
    }

    fn display_name(&self) -> &str {
        self.descriptor.display_name
    }

    async fn start_authentication(&self) -> Result<StartedAuthentication> {
        let state = generate_random_string(STATE_LENGTH);
        let code_verifier = generate_code_verifier();

        let redirect = build_authorization_url(
            self.descriptor,
            &self.config,
            &self.redirect_uri,
            &state,
            &code_verifier,
        )
        .map_err(|e| {
            BrokerError::Config(format!(
                "provider '{}' has an invalid authorization endpoint: {e}",
                self.descriptor.name
            ))
        })?;

        Ok(StartedAuthentication {
            redirect,
            state,
            code_verifier,
        })
    }

    async fn complete_authentication(
        &self,
        params: &CallbackParams,
        proof: &HandshakeProof,
    ) -> Result<CompletedAuthentication> {
        if let Some(kind) = params.error_kind() {
            return Err(BrokerError::auth(
                kind,
                format!(
                    "provider '{}' reported '{}'",
                    self.descriptor.name,
                    params.error.as_deref().unwrap_or("denied")
                ),
            ));
        }

        let code = params.code.as_deref().ok_or_else(|| {
            BrokerError::auth(
                ErrorKind::InvalidCredentials,
                format!("callback from '{}' carried no authorization code", self.descriptor.name),
            )
        })?;

        let tokens = exchange_code(
            &self.http,
            CodeExchange {
                descriptor: self.descriptor,
                credentials: &self.config.credentials,
                code,
                redirect_uri: &self.redirect_uri,
                code_verifier: &proof.code_verifier,
            },
        )
        .await?;

        // exchange_code guarantees the token is present
        let access_token = tokens.access_token.clone().unwrap_or_default();
        let raw_profile = self.fetch_profile(&access_token).await?;

        Ok(CompletedAuthentication {
            raw_profile,
            access_token,
            tokens,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<serde_json::Value> {
        let mut request = self
            .http
            .get(self.descriptor.userinfo_endpoint)
            .bearer_auth(access_token);
        for (key, value) in self.descriptor.extra_userinfo_headers {
            request = request.header(*key, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(self.descriptor.name, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::auth(
                ErrorKind::ProfileFetchFailed,
                format!(
                    "userinfo request for '{}' failed with status {}",
                    self.descriptor.name,
                    status.as_u16()
                ),
            ));
        }

        // Coerce rather than reject invalid encoding in the body.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(self.descriptor.name, &e))?;
        let text = coerce_utf8(&bytes);

        serde_json::from_str(&text).map_err(|_| {
            BrokerError::auth(
                ErrorKind::ProfileFetchFailed,
                format!("userinfo response for '{}' was not valid JSON", self.descriptor.name),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor;

    fn adapter() -> GenericOAuthAdapter {
        GenericOAuthAdapter::new(
            &descriptor::GOOGLE,
            ProviderConfig::new("google", "client-1", "secret-1"),
            "https://example.com/callback",
        )
    }

    #[tokio::test]
    async fn start_produces_redirect_and_fresh_material() {
        let started = adapter().start_authentication().await.unwrap();
        assert!(started
            .redirect
            .as_str()
            .starts_with("https://accounts.google.com/"));
        assert_eq!(started.state.len(), 32);
        assert_eq!(started.code_verifier.len(), 43);

        let again = adapter().start_authentication().await.unwrap();
        assert_ne!(started.state, again.state);
    }

    #[tokio::test]
    async fn callback_error_short_circuits_before_network() {
        let params = CallbackParams {
            error: Some("access_denied".into()),
            ..Default::default()
        };
        let proof = HandshakeProof {
            state: "s".into(),
            code_verifier: "v".into(),
        };
        let err = adapter()
            .complete_authentication(&params, &proof)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserCancelledOrDenied);
    }

    #[tokio::test]
    async fn missing_code_is_invalid_credentials() {
        let params = CallbackParams {
            state: Some("s".into()),
            ..Default::default()
        };
        let proof = HandshakeProof {
            state: "s".into(),
            code_verifier: "v".into(),
        };
        let err = adapter()
            .complete_authentication(&params, &proof)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn empty_token_is_not_connected() {
        assert!(!adapter().is_connected("").await);
    }
}

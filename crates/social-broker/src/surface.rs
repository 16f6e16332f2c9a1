// The thin HTTP-facing surface: three operations, all producing redirect
// decisions for the host to render. No UI, no transport; a host framework
// maps its request/response types onto these calls.

use std::sync::Arc;

use social_broker_core::error::ErrorKind;
use social_broker_core::sanitize::error_redirect;

use social_broker_oauth2::adapter::CallbackParams;

use crate::orchestrator::{AuthBroker, AuthResult, BeginOutcome, CallbackOutcome};
use crate::session::SessionStore;

/// A redirect decision plus the machine-readable error, if any.
#[derive(Debug, Clone)]
pub struct SurfaceResponse {
    pub location: String,
    pub error: Option<ErrorKind>,
    /// Present only when a callback completed a login.
    pub result: Option<AuthResult>,
}

impl SurfaceResponse {
    fn redirect(location: String) -> Self {
        Self {
            location,
            error: None,
            result: None,
        }
    }

    fn failure(location: String, kind: ErrorKind) -> Self {
        Self {
            location,
            error: Some(kind),
            result: None,
        }
    }
}

/// The broker's outward face.
#[derive(Debug, Clone)]
pub struct Surface {
    broker: Arc<AuthBroker>,
}

impl Surface {
    pub fn new(broker: Arc<AuthBroker>) -> Self {
        Self { broker }
    }

    /// Enumerate enabled providers, configuration order preserved.
    pub fn providers(&self) -> Vec<String> {
        self.broker
            .list_providers()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Begin authentication with a chosen provider. Unknown or disabled
    /// providers redirect to the fallback target with an error indicator.
    pub async fn begin(
        &self,
        session: &dyn SessionStore,
        provider: &str,
        redirect_target: Option<&str>,
        already_authenticated: bool,
    ) -> SurfaceResponse {
        match self
            .broker
            .begin(session, provider, redirect_target, already_authenticated)
            .await
        {
            Ok(BeginOutcome::Redirect(location))
            | Ok(BeginOutcome::AlreadyAuthenticated(location)) => {
                SurfaceResponse::redirect(location)
            }
            Err(e) => {
                let kind = e.kind();
                SurfaceResponse::failure(
                    error_redirect(&self.broker.options().fallback_url, kind.as_code()),
                    kind,
                )
            }
        }
    }

    /// Handle the provider callback and produce the final redirect.
    pub async fn callback(
        &self,
        session: &dyn SessionStore,
        params: CallbackParams,
    ) -> SurfaceResponse {
        match self.broker.callback(session, params).await {
            CallbackOutcome::Success { result, redirect } => SurfaceResponse {
                location: redirect,
                error: None,
                result: Some(result),
            },
            CallbackOutcome::Failure { kind, redirect } => {
                SurfaceResponse::failure(redirect, kind)
            }
        }
    }
}

// The auth orchestrator: ties providers, session state, normalization and
// reconciliation into one state machine spanning the two legs of the
// handshake. Session scope is an explicit parameter on both entry points;
// no ambient state is ever consulted. Adapters only ever surface taxonomy
// errors, so every failure here branches on a kind.

use std::collections::HashMap;
use std::sync::Arc;

use social_broker_core::error::{BrokerError, ErrorKind, Result};
use social_broker_core::logger::BrokerLogger;
use social_broker_core::options::BrokerOptions;
use social_broker_core::sanitize::{error_redirect, sanitize_redirect_target};

use social_broker_oauth2::adapter::{CallbackParams, HandshakeProof, ProviderAdapter};
use social_broker_oauth2::descriptor;
use social_broker_oauth2::generic::GenericOAuthAdapter;

use crate::normalize::normalize;
use crate::observer::ObserverRegistry;
use crate::photo::PhotoFetcher;
use crate::reconcile::Reconciler;
use crate::session::{AttemptPhase, AuthSession, SessionStore};
use crate::stores::{AssetStore, IdentityStore, StoredUser};

/// The orchestrator's successful output, handed to the external
/// login/session collaborator.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user: StoredUser,
    pub is_new: bool,
    /// Opaque provider access token.
    pub access_token: String,
}

/// Outcome of the start leg.
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// Send the visitor to the provider.
    Redirect(String),
    /// The caller is already authenticated; skip the handshake entirely.
    AlreadyAuthenticated(String),
}

/// Outcome of the callback leg. Terminal either way; the session state is
/// cleared before this is returned.
#[derive(Debug)]
pub enum CallbackOutcome {
    Success {
        result: AuthResult,
        redirect: String,
    },
    Failure {
        kind: ErrorKind,
        redirect: String,
    },
}

impl CallbackOutcome {
    pub fn redirect(&self) -> &str {
        match self {
            Self::Success { redirect, .. } | Self::Failure { redirect, .. } => redirect,
        }
    }
}

/// Everything the broker needs from its host.
pub struct BrokerDeps {
    pub identity_store: Arc<dyn IdentityStore>,
    pub asset_store: Arc<dyn AssetStore>,
    pub observers: ObserverRegistry,
    pub logger: BrokerLogger,
    /// Photo transport override; `None` uses the bounded-timeout HTTP one.
    pub photo_fetcher: Option<Arc<dyn PhotoFetcher>>,
}

pub struct AuthBroker {
    options: BrokerOptions,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    reconciler: Reconciler,
    logger: BrokerLogger,
}

impl std::fmt::Debug for AuthBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthBroker")
            .field("providers", &self.options.enabled_providers())
            .finish()
    }
}

impl AuthBroker {
    /// Construct a broker with explicit adapters. Fails fast on invalid
    /// configuration; nothing is validated lazily after startup.
    pub fn new(
        options: BrokerOptions,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        deps: BrokerDeps,
    ) -> Result<Self> {
        options.validate()?;

        let adapters: HashMap<String, Arc<dyn ProviderAdapter>> = adapters
            .into_iter()
            .map(|a| (a.name().to_string(), a))
            .collect();

        for provider in options.enabled_providers() {
            if !adapters.contains_key(provider) {
                return Err(BrokerError::Config(format!(
                    "provider '{provider}' is enabled but no adapter was supplied"
                )));
            }
        }

        let mut reconciler = Reconciler::new(
            deps.identity_store,
            deps.asset_store,
            deps.observers,
            options.policy.clone(),
            deps.logger.clone(),
        );
        if let Some(photos) = deps.photo_fetcher {
            reconciler = reconciler.with_photo_fetcher(photos);
        }

        Ok(Self {
            options,
            adapters,
            reconciler,
            logger: deps.logger,
        })
    }

    /// Construct a broker with a generic descriptor-driven adapter per
    /// enabled provider.
    pub fn with_generic_adapters(options: BrokerOptions, deps: BrokerDeps) -> Result<Self> {
        let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        for config in options.providers.iter().filter(|p| p.enabled) {
            let descriptor = descriptor::lookup(&config.name).ok_or_else(|| {
                BrokerError::Config(format!("no descriptor for provider '{}'", config.name))
            })?;
            adapters.push(Arc::new(GenericOAuthAdapter::new(
                descriptor,
                config.clone(),
                options.callback_url.clone(),
            )));
        }
        Self::new(options, adapters, deps)
    }

    pub fn options(&self) -> &BrokerOptions {
        &self.options
    }

    /// Enabled provider names, configuration order preserved.
    pub fn list_providers(&self) -> Vec<&str> {
        self.options.enabled_providers()
    }

    fn adapter(&self, provider: &str) -> Result<&Arc<dyn ProviderAdapter>> {
        let enabled = self
            .options
            .provider(provider)
            .map(|p| p.enabled)
            .unwrap_or(false);
        if !enabled {
            return Err(BrokerError::auth(
                ErrorKind::UnknownOrDisabledProvider,
                format!("provider '{provider}' is unknown or disabled"),
            ));
        }
        self.adapters.get(provider).ok_or_else(|| {
            BrokerError::auth(
                ErrorKind::UnknownOrDisabledProvider,
                format!("provider '{provider}' has no adapter"),
            )
        })
    }

    /// Start leg: validate the provider, persist the handshake state into
    /// the caller's session scope, and produce the provider redirect.
    ///
    /// An already-authenticated caller short-circuits straight to the
    /// post-login redirect without touching the provider; reconciliation
    /// is not re-run for an idempotent navigation action.
    pub async fn begin(
        &self,
        session: &dyn SessionStore,
        provider: &str,
        redirect_target: Option<&str>,
        already_authenticated: bool,
    ) -> Result<BeginOutcome> {
        let target = sanitize_redirect_target(
            redirect_target.unwrap_or(&self.options.post_login_url),
        );

        if already_authenticated {
            return Ok(BeginOutcome::AlreadyAuthenticated(target));
        }

        let adapter = self.adapter(provider)?;
        let started = adapter.start_authentication().await?;

        let mut attempt = AuthSession::new(provider)
            .with_state(AuthSession::STATE_CSRF, started.state)
            .with_state(AuthSession::STATE_VERIFIER, started.code_verifier)
            .with_state(AuthSession::STATE_REDIRECT, target);
        attempt.phase = AttemptPhase::HandshakePending;
        attempt.persist(session).await?;

        self.logger
            .debug(&format!("handshake started with '{provider}'"));

        Ok(BeginOutcome::Redirect(started.redirect.to_string()))
    }

    /// Callback leg: restore the attempt, finish the handshake, normalize
    /// and reconcile. Terminal for the attempt: the session state is
    /// cleared on success and on every failure, and failures carry a
    /// redirect to the configured fallback with a machine-readable code.
    pub async fn callback(
        &self,
        session: &dyn SessionStore,
        params: CallbackParams,
    ) -> CallbackOutcome {
        let attempt = match AuthSession::load(session).await {
            Ok(Some(attempt)) => attempt,
            Ok(None) => {
                return self
                    .fail(session, ErrorKind::InvalidCredentials, "callback without a started handshake")
                    .await;
            }
            Err(e) => return self.fail(session, e.kind(), &e.to_string()).await,
        };

        if attempt.phase != AttemptPhase::HandshakePending {
            return self
                .fail(session, ErrorKind::InvalidCredentials, "attempt is not awaiting a callback")
                .await;
        }
        if attempt.is_stale(chrono::Utc::now()) {
            return self
                .fail(session, ErrorKind::InvalidCredentials, "handshake state expired")
                .await;
        }

        // Cancellation or provider error indicator: no network calls needed.
        if let Some(kind) = params.error_kind() {
            return self.fail(session, kind, "provider callback carried an error").await;
        }

        let adapter = match self.adapter(&attempt.provider) {
            Ok(adapter) => adapter,
            Err(e) => return self.fail(session, e.kind(), &e.to_string()).await,
        };

        // CSRF check: the state echoed by the provider must match the one
        // persisted on the start leg.
        let expected_state = attempt.state_value(AuthSession::STATE_CSRF).unwrap_or("");
        if expected_state.is_empty() || params.state.as_deref() != Some(expected_state) {
            return self
                .fail(session, ErrorKind::InvalidCredentials, "state parameter mismatch")
                .await;
        }

        let proof = HandshakeProof {
            state: expected_state.to_string(),
            code_verifier: attempt
                .state_value(AuthSession::STATE_VERIFIER)
                .unwrap_or("")
                .to_string(),
        };

        let completed = match adapter.complete_authentication(&params, &proof).await {
            Ok(completed) => completed,
            Err(e) => return self.fail(session, e.kind(), &e.to_string()).await,
        };

        let profile = match normalize(&attempt.provider, &completed.raw_profile) {
            Ok(profile) => profile,
            Err(e) => {
                // Log the payload shape, never its contents.
                let shape = shape_of(&completed.raw_profile);
                self.logger
                    .warn(&format!("unusable profile from '{}': keys [{shape}]", attempt.provider));
                return self.fail(session, e.kind(), &e.to_string()).await;
            }
        };

        let outcome = match self.reconciler.reconcile(&profile).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(session, e.kind(), &e.to_string()).await,
        };

        if let Err(e) = AuthSession::clear(session).await {
            self.logger
                .warn(&format!("failed to clear attempt state: {e}"));
        }

        let redirect = attempt
            .state_value(AuthSession::STATE_REDIRECT)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.options.post_login_url)
            .to_string();

        self.logger.info(&format!(
            "login via '{}' reconciled user {} (new: {})",
            attempt.provider, outcome.user.id, outcome.is_new
        ));

        CallbackOutcome::Success {
            result: AuthResult {
                user: outcome.user,
                is_new: outcome.is_new,
                access_token: completed.access_token,
            },
            redirect,
        }
    }

    /// Whether the given token still resolves at the provider.
    pub async fn is_connected(&self, provider: &str, access_token: &str) -> bool {
        match self.adapter(provider) {
            Ok(adapter) => adapter.is_connected(access_token).await,
            Err(_) => false,
        }
    }

    /// Discard any in-flight attempt and revoke provider-side material.
    pub async fn disconnect(
        &self,
        session: &dyn SessionStore,
        provider: &str,
        access_token: &str,
    ) -> Result<()> {
        AuthSession::clear(session).await?;
        if let Ok(adapter) = self.adapter(provider) {
            adapter.disconnect(access_token).await?;
        }
        Ok(())
    }

    /// Terminal failure: clear the attempt state, log the kind, redirect to
    /// the fallback target with the machine-readable code attached.
    async fn fail(
        &self,
        session: &dyn SessionStore,
        kind: ErrorKind,
        detail: &str,
    ) -> CallbackOutcome {
        if let Err(e) = AuthSession::clear(session).await {
            self.logger
                .warn(&format!("failed to clear attempt state: {e}"));
        }
        self.logger
            .warn(&format!("login attempt failed ({}): {detail}", kind.as_code()));
        CallbackOutcome::Failure {
            kind,
            redirect: error_redirect(&self.options.fallback_url, kind.as_code()),
        }
    }
}

/// Top-level key names of a JSON object, for diagnostics that must not
/// leak field values.
fn shape_of(value: &serde_json::Value) -> String {
    match value.as_object() {
        Some(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        None => "non-object".to_string(),
    }
}

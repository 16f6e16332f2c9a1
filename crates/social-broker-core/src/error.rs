// Error taxonomy for the social-login broker.
//
// Two layers: `ErrorKind` is the wire-facing machine-readable code that ends
// up in `?error=` redirect parameters, `BrokerError` is the structural error
// the crates propagate. Provider-protocol failures are translated into this
// taxonomy at the adapter boundary; nothing above it sees a raw HTTP error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable failure codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConfigError,
    UnknownOrDisabledProvider,
    UserCancelledOrDenied,
    ProviderUnavailable,
    InvalidCredentials,
    ProfileFetchFailed,
    MalformedProfile,
    StoreError,
    AssetStoreError,
}

impl ErrorKind {
    /// The code as it appears in redirect query strings.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::UnknownOrDisabledProvider => "UNKNOWN_OR_DISABLED_PROVIDER",
            Self::UserCancelledOrDenied => "USER_CANCELLED_OR_DENIED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::ProfileFetchFailed => "PROFILE_FETCH_FAILED",
            Self::MalformedProfile => "MALFORMED_PROFILE",
            Self::StoreError => "STORE_ERROR",
            Self::AssetStoreError => "ASSET_STORE_ERROR",
        }
    }

    /// Everything except a configuration error ends in a redirect, not a crash.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConfigError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ConfigError => "Missing or invalid configuration",
            Self::UnknownOrDisabledProvider => "Unknown or disabled provider",
            Self::UserCancelledOrDenied => {
                "User cancelled the authentication or the provider refused the connection"
            }
            Self::ProviderUnavailable => "Provider could not be reached",
            Self::InvalidCredentials => "Provider rejected the credentials",
            Self::ProfileFetchFailed => "User profile request failed",
            Self::MalformedProfile => "Provider returned an unusable profile",
            Self::StoreError => "Identity store operation failed",
            Self::AssetStoreError => "Asset store operation failed",
        };
        write!(f, "{msg}")
    }
}

/// Structural error type used across the broker crates.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Fatal at startup; never surfaced as a redirect.
    #[error("configuration error: {0}")]
    Config(String),

    /// A recoverable authentication failure carrying its taxonomy kind.
    #[error("{kind}: {message}")]
    Auth { kind: ErrorKind, message: String },

    /// Identity store failure. `transient` failures are retried once,
    /// `unique_violation` signals a concurrent insert for the same
    /// external identity key.
    #[error("store error: {message}")]
    Store {
        message: String,
        transient: bool,
        unique_violation: bool,
    },

    /// Asset store failure. Never fatal to a reconciliation.
    #[error("asset store error: {0}")]
    Asset(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BrokerError {
    pub fn auth(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            transient: false,
            unique_violation: false,
        }
    }

    pub fn store_transient(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            transient: true,
            unique_violation: false,
        }
    }

    pub fn store_conflict(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            transient: false,
            unique_violation: true,
        }
    }

    /// The taxonomy kind of this error, used when branching on failures
    /// and when building error redirects.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Auth { kind, .. } => *kind,
            Self::Store { .. } => ErrorKind::StoreError,
            Self::Asset(_) => ErrorKind::AssetStoreError,
            Self::Other(_) => ErrorKind::ProfileFetchFailed,
        }
    }

    pub fn is_transient_store(&self) -> bool {
        matches!(self, Self::Store { transient: true, .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Store {
                unique_violation: true,
                ..
            }
        )
    }
}

/// Unified result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

// social-broker: a provider-agnostic social-login broker.
//
// Drives the OAuth2 handshake for a closed set of providers, normalizes
// heterogeneous profile payloads into one canonical SocialProfile, and
// reconciles that profile against a local identity store with idempotent
// create-or-update semantics and username-collision resolution.
//
// The host supplies the collaborators: an IdentityStore, an AssetStore,
// and a per-caller SessionStore. The broker never renders UI, never
// touches transport cookies, and never consults ambient state.

pub mod normalize;
pub mod observer;
pub mod orchestrator;
pub mod photo;
pub mod profile;
pub mod reconcile;
pub mod session;
pub mod stores;
pub mod surface;

pub use normalize::normalize;
pub use observer::{ObserverRegistry, ReconcileObserver};
pub use orchestrator::{AuthBroker, AuthResult, BeginOutcome, BrokerDeps, CallbackOutcome};
pub use photo::{HttpPhotoFetcher, PhotoFetcher};
pub use profile::SocialProfile;
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use session::{AttemptPhase, AuthSession, SessionStore, ATTEMPT_KEY};
pub use stores::{AssetRef, AssetStore, IdentityStore, NewUser, StoredUser, UserUpdate};
pub use surface::{Surface, SurfaceResponse};

pub use social_broker_core::{BrokerError, BrokerLogger, BrokerOptions, ErrorKind};
pub use social_broker_oauth2::{CallbackParams, ProviderAdapter};

// social-broker-oauth2: the provider adapter layer.
//
// Everything provider-protocol-specific lives here: the ProviderAdapter
// capability, the static descriptor table, authorization URL building,
// PKCE, the code exchange, and the generic descriptor-driven adapter.
// The handshake itself is standard OAuth2 with S256 PKCE; provider
// differences are data, not code.

pub mod adapter;
pub mod authorization_url;
pub mod code_exchange;
pub mod descriptor;
pub mod generic;
pub mod pkce;
pub mod tokens;

pub use adapter::{
    CallbackParams, CompletedAuthentication, HandshakeProof, ProviderAdapter,
    StartedAuthentication,
};
pub use descriptor::{lookup, ProviderDescriptor, TokenAuthMethod, PROVIDER_NAMES};
pub use generic::GenericOAuthAdapter;
pub use tokens::OAuth2Tokens;

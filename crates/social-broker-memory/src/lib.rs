// social-broker-memory: in-memory store implementations.
//
// HashMap-backed identity, asset, and session stores behind tokio
// RwLocks. Ephemeral by design: tests, prototyping, development.

pub mod asset;
pub mod identity;
pub mod session;

pub use asset::{AssetLink, MemoryAssetStore};
pub use identity::MemoryIdentityStore;
pub use session::{MemorySessionBackend, MemorySessionStore};

// social-broker-core: shared foundation for the social-broker workspace.
//
// Holds the error taxonomy, broker configuration, the structured logger,
// text sanitation, and random-string helpers. Everything here is free of
// I/O so the other crates can depend on it without pulling in a runtime.

pub mod error;
pub mod logger;
pub mod options;
pub mod random;
pub mod sanitize;

pub use error::{BrokerError, ErrorKind, Result};
pub use logger::{BrokerLogger, LogLevel, LoggerConfig};
pub use options::{BrokerOptions, Credentials, ProviderConfig, ReconcilePolicy};

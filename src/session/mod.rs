//! Session layer: connection state, credential storage, pending requests,
//! and the inbound event bus.
//!
//! A session is rebuilt for every transport instance. Only the credential
//! survives across reconnects.

pub mod credential;
pub mod event_bus;
pub mod pending;
pub mod state;

pub use credential::CredentialStore;
pub use event_bus::EventBus;
pub use pending::{CorrelationPolicy, PendingRequests};
pub use state::{ApiFailure, ConnectionState, ConnectionStatus};

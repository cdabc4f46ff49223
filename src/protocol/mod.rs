//! Wire protocol: envelopes, request payloads, inbound classification.
//!
//! Everything here is pure data construction. Nothing in this module
//! touches the transport.

pub mod envelope;
pub mod inbound;
pub mod requests;

pub use envelope::{API_NAME, API_VERSION, RequestEnvelope, RequestKind, ResponseEnvelope};
pub use inbound::Inbound;

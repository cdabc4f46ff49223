//! Client layer: connection manager, request dispatcher, and the handle
//! application code holds.
//!
//! The manager task owns the transport. For every transport it opens, it
//! builds a fresh [`RequestDispatcher`] and hands it out through
//! [`VtsClient::wait_ready`] once authentication succeeds.

pub mod connection;
pub mod dispatcher;
pub mod handle;

pub use connection::ConnectionManager;
pub use dispatcher::RequestDispatcher;
pub use handle::VtsClient;

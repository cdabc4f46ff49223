//! Connection lifecycle states.

use std::fmt;

use chrono::{DateTime, Utc};

/// Lifecycle state of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport; not yet started or between attempts.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Transport open, handshake not started.
    ConnectedUnauthenticated,
    /// Token request sent; waiting for the user to grant it.
    AwaitingToken,
    /// Authentication request sent.
    AwaitingAuth,
    /// Authenticated; requests may be issued.
    Ready,
    /// Session ended by an `APIError`. Terminal.
    ClosedByError,
}

impl ConnectionState {
    /// Returns `true` for states with an open transport.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            Self::ConnectedUnauthenticated | Self::AwaitingToken | Self::AwaitingAuth | Self::Ready
        )
    }

    /// Returns `true` if no further transitions will happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ClosedByError)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::ConnectedUnauthenticated => "connected_unauthenticated",
            Self::AwaitingToken => "awaiting_token",
            Self::AwaitingAuth => "awaiting_auth",
            Self::Ready => "ready",
            Self::ClosedByError => "closed_by_error",
        };
        f.write_str(name)
    }
}

/// The `APIError` that ended a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// Numeric error identifier.
    pub error_id: i64,
    /// Human-readable reason.
    pub message: String,
}

/// A state together with the moment it was entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current state.
    pub state: ConnectionState,
    /// When the state was entered.
    pub since: DateTime<Utc>,
    /// Set once the state is [`ConnectionState::ClosedByError`].
    pub failure: Option<ApiFailure>,
}

impl ConnectionStatus {
    /// Creates a status entered now.
    #[must_use]
    pub fn now(state: ConnectionState) -> Self {
        Self {
            state,
            since: Utc::now(),
            failure: None,
        }
    }

    /// Creates a terminal status carrying `failure`.
    #[must_use]
    pub fn failed(failure: ApiFailure) -> Self {
        Self {
            state: ConnectionState::ClosedByError,
            since: Utc::now(),
            failure: Some(failure),
        }
    }
}

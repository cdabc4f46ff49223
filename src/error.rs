//! Client error types.
//!
//! [`ClientError`] is the central error type for the crate. Lifecycle
//! failures (refused connections, transport drops) are handled inside the
//! connection manager and only reach callers as [`ClientError::SessionClosed`]
//! or [`ClientError::Rejected`].

/// Client-side error enum.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Envelope could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport this request was bound to is gone.
    #[error("session closed before the request completed")]
    SessionClosed,

    /// The remote application answered with an `APIError` and the session
    /// was shut down.
    #[error("api error {error_id}: {message}")]
    Rejected {
        /// Numeric error identifier reported by the remote application.
        error_id: i64,
        /// Human-readable reason.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns `true` for errors that the reconnect loop treats as expected
    /// while the remote application is not running yet.
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::Transport(tokio_tungstenite::tungstenite::Error::Io(e)) | Self::Io(e) => {
                e.kind() == std::io::ErrorKind::ConnectionRefused
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_io_is_transient() {
        let err = ClientError::Transport(tokio_tungstenite::tungstenite::Error::Io(
            std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        ));
        assert!(err.is_connection_refused());
    }

    #[test]
    fn other_errors_are_not_transient() {
        assert!(!ClientError::SessionClosed.is_connection_refused());
        let err = ClientError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!err.is_connection_refused());
    }

    #[test]
    fn rejected_message_includes_id() {
        let err = ClientError::Rejected {
            error_id: 8,
            message: "token invalid".to_string(),
        };
        assert_eq!(err.to_string(), "api error 8: token invalid");
    }
}

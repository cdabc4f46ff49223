//! Classification of inbound envelopes.
//!
//! Lifecycle kinds are consumed by the connection manager. Everything else
//! completes a pending request.

use super::ResponseEnvelope;

/// `messageType` of a successful or failed authentication.
pub const AUTHENTICATION_RESPONSE: &str = "AuthenticationResponse";

/// `messageType` of a freshly issued token.
pub const AUTHENTICATION_TOKEN_RESPONSE: &str = "AuthenticationTokenResponse";

/// `messageType` of a protocol-level error.
pub const API_ERROR: &str = "APIError";

/// An inbound envelope after routing.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `AuthenticationResponse`.
    Authentication {
        /// Whether the token was accepted.
        authenticated: bool,
        /// Reason given by the remote application.
        reason: String,
    },
    /// `AuthenticationTokenResponse` carrying a new credential.
    TokenIssued(String),
    /// `APIError`.
    ApiError {
        /// Numeric error identifier.
        error_id: i64,
        /// Human-readable reason.
        message: String,
    },
    /// Any other message: a completed request or an event.
    Completion(ResponseEnvelope),
}

impl Inbound {
    /// Routes an envelope by its `messageType`.
    ///
    /// Missing payload fields fall back to empty values. An
    /// `AuthenticationResponse` without an `authenticated` flag counts as a
    /// success.
    #[must_use]
    pub fn classify(envelope: ResponseEnvelope) -> Self {
        if !matches!(
            envelope.message_type.as_str(),
            AUTHENTICATION_RESPONSE | AUTHENTICATION_TOKEN_RESPONSE | API_ERROR
        ) {
            return Self::Completion(envelope);
        }

        let data = &envelope.data;
        let str_field = |key: &str| {
            data.get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match envelope.message_type.as_str() {
            AUTHENTICATION_RESPONSE => Self::Authentication {
                authenticated: data
                    .get("authenticated")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(true),
                reason: str_field("reason"),
            },
            AUTHENTICATION_TOKEN_RESPONSE => Self::TokenIssued(str_field("authenticationToken")),
            _ => Self::ApiError {
                error_id: data
                    .get("errorID")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or_default(),
                message: str_field("message"),
            },
        }
    }

    /// Returns `true` for messages the connection manager consumes.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        !matches!(self, Self::Completion(_))
    }
}

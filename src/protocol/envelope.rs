//! Request and response envelopes exchanged with the remote application.

use serde::{Deserialize, Serialize};

/// Value of `apiName` on every outgoing request.
pub const API_NAME: &str = "VTubeStudioPublicAPI";

/// Value of `apiVersion` on every outgoing request.
pub const API_VERSION: &str = "1.0";

/// Request identifiers that never suspend the caller.
///
/// Responses to these are either irrelevant or handled by the connection
/// manager itself (authentication).
pub const NON_BLOCKING_REQUEST_IDS: [&str; 4] = [
    "parameter_inject",
    "subscription",
    "auth_request",
    "auth_token_request",
];

/// Every request kind the client can issue.
///
/// Each kind carries a fixed `requestID` and `messageType` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Authenticate with a previously issued token.
    Authentication,
    /// Ask the user to grant a new token.
    AuthenticationToken,
    /// Read a single parameter value.
    ParameterValue,
    /// Feed tracking parameter values.
    InjectParameterData,
    /// Query the currently loaded model.
    CurrentModel,
    /// List items in the scene and on disk.
    ItemList,
    /// Load an item into the scene.
    ItemLoad,
    /// Unload one or more items.
    ItemUnload,
    /// Move, rotate or resize the model.
    MoveModel,
    /// Pin an item to an art mesh.
    ItemPin,
    /// Subscribe to an event stream.
    EventSubscription,
}

impl RequestKind {
    /// All request kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Authentication,
        Self::AuthenticationToken,
        Self::ParameterValue,
        Self::InjectParameterData,
        Self::CurrentModel,
        Self::ItemList,
        Self::ItemLoad,
        Self::ItemUnload,
        Self::MoveModel,
        Self::ItemPin,
        Self::EventSubscription,
    ];

    /// Fixed `requestID` for this kind.
    #[must_use]
    pub const fn request_id(self) -> &'static str {
        match self {
            Self::Authentication => "auth_request",
            Self::AuthenticationToken => "auth_token_request",
            Self::ParameterValue => "parameter_request",
            Self::InjectParameterData => "parameter_inject",
            Self::CurrentModel => "model_current",
            Self::ItemList => "item_list",
            Self::ItemLoad => "item_load",
            Self::ItemUnload => "item_unload",
            Self::MoveModel => "model_move",
            Self::ItemPin => "item_pin",
            Self::EventSubscription => "subscription",
        }
    }

    /// Fixed `messageType` for this kind.
    #[must_use]
    pub const fn message_type(self) -> &'static str {
        match self {
            Self::Authentication => "AuthenticationRequest",
            Self::AuthenticationToken => "AuthenticationTokenRequest",
            Self::ParameterValue => "ParameterValueRequest",
            Self::InjectParameterData => "InjectParameterDataRequest",
            Self::CurrentModel => "CurrentModelRequest",
            Self::ItemList => "ItemListRequest",
            Self::ItemLoad => "ItemLoadRequest",
            Self::ItemUnload => "ItemUnloadRequest",
            Self::MoveModel => "MoveModelRequest",
            Self::ItemPin => "ItemPinRequest",
            Self::EventSubscription => "EventSubscriptionRequest",
        }
    }

    /// Whether a request of this kind suspends the caller until a response
    /// is observed. Decided by looking the identifier up in
    /// [`NON_BLOCKING_REQUEST_IDS`].
    #[must_use]
    pub fn is_blocking(self) -> bool {
        !NON_BLOCKING_REQUEST_IDS.contains(&self.request_id())
    }
}

/// Outgoing request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Always [`API_NAME`].
    pub api_name: String,
    /// Always [`API_VERSION`].
    pub api_version: String,
    /// Correlation identifier.
    #[serde(rename = "requestID")]
    pub request_id: String,
    /// Request kind discriminator.
    pub message_type: String,
    /// Operation-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RequestEnvelope {
    /// Builds an envelope with the fixed identifier for `kind`.
    #[must_use]
    pub fn new(kind: RequestKind, data: Option<serde_json::Value>) -> Self {
        Self::with_request_id(kind, kind.request_id().to_string(), data)
    }

    /// Builds an envelope with an explicit identifier.
    #[must_use]
    pub fn with_request_id(
        kind: RequestKind,
        request_id: String,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            api_name: API_NAME.to_string(),
            api_version: API_VERSION.to_string(),
            request_id,
            message_type: kind.message_type().to_string(),
            data,
        }
    }
}

/// Inbound envelope: a response to a request, a lifecycle message, or an
/// event notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Message kind discriminator.
    pub message_type: String,
    /// Message payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Identifier echoed from the request, when present.
    #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Server timestamp in milliseconds, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ResponseEnvelope {
    /// Builds an envelope with only a kind and payload.
    #[must_use]
    pub fn new(message_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
            request_id: None,
            timestamp: None,
        }
    }
}

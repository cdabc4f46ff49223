//! Request dispatcher: one method per remote capability.
//!
//! Blocking requests suspend the caller until the connection manager
//! completes their pending slot. Under [`CorrelationPolicy::SingleFlight`]
//! a turn lock admits one blocking request at a time, so responses can be
//! paired with requests by arrival order alone.
//!
//! Whitelisted requests (authentication, token request, parameter
//! injection, event subscription) are sent and forgotten; their methods are
//! plain functions that return as soon as the frame is queued.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;
use crate::protocol::requests::{
    AuthenticationRequest, AuthenticationTokenRequest, EventSubscriptionRequest,
    InjectParameterDataRequest, ItemListRequest, ItemLoadRequest, ItemPinRequest,
    ItemUnloadRequest, MoveModelRequest, ParameterValueRequest,
};
use crate::protocol::{RequestEnvelope, RequestKind, ResponseEnvelope};
use crate::session::{CorrelationPolicy, PendingRequests};

/// Sends requests over one transport instance.
///
/// Cheap to clone; clones share the outbound queue, the pending table and
/// the turn lock. Once the transport is gone every method fails with
/// [`ClientError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingRequests,
    turn: Arc<Mutex<()>>,
}

impl RequestDispatcher {
    /// Creates a dispatcher writing to `outbound` and waiting on `pending`.
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<Message>, pending: PendingRequests) -> Self {
        Self {
            outbound,
            pending,
            turn: Arc::new(Mutex::new(())),
        }
    }

    /// Sends a request of any kind.
    ///
    /// Blocking kinds resolve to `Some(response)`; whitelisted kinds return
    /// `None` right after the frame is queued.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the transport is gone or
    /// closes before the response arrives.
    pub async fn send(
        &self,
        kind: RequestKind,
        data: Option<serde_json::Value>,
    ) -> Result<Option<ResponseEnvelope>, ClientError> {
        if kind.is_blocking() {
            self.call(kind, data).await.map(Some)
        } else {
            self.notify(kind, data).map(|()| None)
        }
    }

    /// Sends an `AuthenticationRequest`. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the transport is gone.
    pub fn authenticate(&self, req: &AuthenticationRequest) -> Result<(), ClientError> {
        self.notify(RequestKind::Authentication, payload(req)?)
    }

    /// Sends an `AuthenticationTokenRequest`. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the transport is gone.
    pub fn request_token(&self, req: &AuthenticationTokenRequest) -> Result<(), ClientError> {
        self.notify(RequestKind::AuthenticationToken, payload(req)?)
    }

    /// Reads a parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_parameter_value(
        &self,
        req: &ParameterValueRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::ParameterValue, payload(req)?).await
    }

    /// Injects tracking parameter values. Does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the transport is gone.
    pub fn inject_parameter_values(
        &self,
        req: &InjectParameterDataRequest,
    ) -> Result<(), ClientError> {
        self.notify(RequestKind::InjectParameterData, payload(req)?)
    }

    /// Queries the currently loaded model.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_current_model(&self) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::CurrentModel, None).await
    }

    /// Lists scene items and item files.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_item_list(
        &self,
        req: &ItemListRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::ItemList, payload(req)?).await
    }

    /// Loads an item into the scene.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_item_load(
        &self,
        req: &ItemLoadRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::ItemLoad, payload(req)?).await
    }

    /// Unloads items from the scene.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_item_unload(
        &self,
        req: &ItemUnloadRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::ItemUnload, payload(req)?).await
    }

    /// Moves, rotates or resizes the model.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_model_move(
        &self,
        req: &MoveModelRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::MoveModel, payload(req)?).await
    }

    /// Pins an item to an art mesh.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session ends first.
    pub async fn request_item_pin(
        &self,
        req: &ItemPinRequest,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.call(RequestKind::ItemPin, payload(req)?).await
    }

    /// Subscribes to an event. Does not wait; events arrive on the
    /// client's event bus.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the transport is gone.
    pub fn request_event_subscription(
        &self,
        req: &EventSubscriptionRequest,
    ) -> Result<(), ClientError> {
        self.notify(RequestKind::EventSubscription, payload(req)?)
    }

    /// Queues a close frame. Nothing queued after it reaches the wire.
    pub(crate) fn close(&self) -> Result<(), ClientError> {
        self.outbound
            .send(Message::Close(None))
            .map_err(|_| ClientError::SessionClosed)
    }

    async fn call(
        &self,
        kind: RequestKind,
        data: Option<serde_json::Value>,
    ) -> Result<ResponseEnvelope, ClientError> {
        let policy = self.pending.policy();
        let _turn = match policy {
            CorrelationPolicy::SingleFlight => Some(self.turn.lock().await),
            CorrelationPolicy::UniqueIds => None,
        };

        let request_id = policy.request_id(kind);
        // Register before sending so a fast response cannot slip past.
        let completion = self.pending.register(request_id.clone()).await;
        self.transmit(RequestEnvelope::with_request_id(kind, request_id, data))?;
        completion.await.map_err(|_| ClientError::SessionClosed)
    }

    fn notify(
        &self,
        kind: RequestKind,
        data: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let request_id = self.pending.policy().request_id(kind);
        self.transmit(RequestEnvelope::with_request_id(kind, request_id, data))
    }

    fn transmit(&self, envelope: RequestEnvelope) -> Result<(), ClientError> {
        let json = serde_json::to_string(&envelope)?;
        tracing::debug!(
            request_id = %envelope.request_id,
            message_type = %envelope.message_type,
            "sending request"
        );
        self.outbound
            .send(Message::text(json))
            .map_err(|_| ClientError::SessionClosed)
    }
}

fn payload<T: Serialize>(req: &T) -> Result<Option<serde_json::Value>, ClientError> {
    Ok(Some(serde_json::to_value(req)?))
}

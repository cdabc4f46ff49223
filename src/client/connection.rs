//! Connection manager: transport lifecycle and authentication state machine.
//!
//! ```text
//! Disconnected ─► Connecting ─► ConnectedUnauthenticated
//!                                 │ token held      │ no token
//!                                 ▼                 ▼
//!                            AwaitingAuth ◄── AwaitingToken
//!                                 │ authenticated
//!                                 ▼
//!                               Ready ── transport closed ──► Disconnected
//!
//! any state ── APIError ──► ClosedByError (terminal)
//! ```
//!
//! Refused connections are expected while the remote application starts
//! and are retried without limit. A shutdown signal ends the loop from any
//! state after the same teardown as a closed session.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::dispatcher::RequestDispatcher;
use crate::config::{ClientConfig, MAX_EVENT_BUS_CAPACITY};
use crate::error::ClientError;
use crate::protocol::requests::{AuthenticationRequest, AuthenticationTokenRequest};
use crate::protocol::{Inbound, ResponseEnvelope};
use crate::session::{
    ApiFailure, ConnectionState, ConnectionStatus, CredentialStore, EventBus, PendingRequests,
};

/// WebSocket stream to the remote application.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WsStream, Message>;

/// How long the writer may take to flush the close frame after an
/// `APIError` or a shutdown.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Transport dropped; reconnect.
    Closed,
    /// `APIError` received; stop.
    Rejected,
    /// Shutdown requested by the owner; stop.
    Shutdown,
}

/// Owns the transport and drives the handshake.
///
/// Built by [`super::VtsClient::start`] and consumed by [`Self::run`],
/// which normally runs on its own task.
#[derive(Debug)]
pub struct ConnectionManager {
    config: Arc<ClientConfig>,
    credentials: CredentialStore,
    events: EventBus,
    status_tx: watch::Sender<ConnectionStatus>,
    dispatcher_tx: watch::Sender<Option<RequestDispatcher>>,
}

impl ConnectionManager {
    /// Creates a manager in [`ConnectionState::Disconnected`], loading any
    /// stored credential.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let credentials = CredentialStore::load(&config.token_file, &config.token_key);
        let events = EventBus::new(config.event_bus_capacity.clamp(1, MAX_EVENT_BUS_CAPACITY));
        let (status_tx, _) = watch::channel(ConnectionStatus::now(ConnectionState::Disconnected));
        let (dispatcher_tx, _) = watch::channel(None);
        Self {
            config: Arc::new(config),
            credentials,
            events,
            status_tx,
            dispatcher_tx,
        }
    }

    /// Receiver for lifecycle state changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Receiver for the dispatcher of the current authenticated session.
    #[must_use]
    pub fn subscribe_dispatcher(&self) -> watch::Receiver<Option<RequestDispatcher>> {
        self.dispatcher_tx.subscribe()
    }

    /// Bus carrying every non-lifecycle inbound message.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Connects, authenticates and serves sessions until an `APIError`
    /// ends the client or `shutdown` turns `true`.
    ///
    /// Dropping the sender of `shutdown` does not stop the manager.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                self.set_state(ConnectionState::Disconnected);
                return;
            }
            self.set_state(ConnectionState::Connecting);
            let config = Arc::clone(&self.config);
            let url = config.websocket_url.as_str();

            let connected = tokio::select! {
                connected = tokio_tungstenite::connect_async(url) => connected,
                () = shutdown_requested(&mut shutdown) => {
                    tracing::info!("shutdown requested while connecting");
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            };

            match connected {
                Ok((ws, _)) => {
                    tracing::info!(url = %url, "websocket connection established");
                    match self.run_session(ws, &mut shutdown).await {
                        SessionEnd::Closed => {
                            tracing::info!("api connection closed; reconnecting");
                            self.set_state(ConnectionState::Disconnected);
                        }
                        SessionEnd::Rejected => {
                            tracing::info!("api connection has shut down");
                            return;
                        }
                        SessionEnd::Shutdown => {
                            tracing::info!("api connection closed on request");
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                    }
                }
                Err(e) => {
                    let err = ClientError::from(e);
                    if err.is_connection_refused() {
                        tracing::warn!(url = %url, "connection to api failed; retrying");
                    } else {
                        tracing::error!(url = %url, error = %err, "websocket error");
                    }
                    self.set_state(ConnectionState::Disconnected);
                }
            }

            if config.reconnect_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    () = tokio::time::sleep(config.reconnect_delay) => {}
                    () = shutdown_requested(&mut shutdown) => {}
                }
            }
        }
    }

    async fn run_session(
        &mut self,
        ws: WsStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (sink, mut stream) = ws.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let mut writer = tokio::spawn(run_write_loop(sink, outbound_rx));

        let pending = PendingRequests::new(self.config.correlation);
        let dispatcher = RequestDispatcher::new(outbound_tx, pending.clone());
        self.set_state(ConnectionState::ConnectedUnauthenticated);

        let end = match self.begin_handshake(&dispatcher) {
            Err(e) => {
                tracing::warn!(error = %e, "could not start handshake");
                SessionEnd::Closed
            }
            Ok(()) => loop {
                let next = tokio::select! {
                    next = stream.next() => next,
                    () = shutdown_requested(shutdown) => {
                        if let Err(e) = dispatcher.close() {
                            tracing::debug!(error = %e, "transport already gone");
                        }
                        break SessionEnd::Shutdown;
                    }
                };
                let Some(frame) = next else {
                    break SessionEnd::Closed;
                };
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Some(end) = self.handle_text(text.as_str(), &dispatcher, &pending).await
                        {
                            break end;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!(frame = ?frame, "api closed the connection");
                        break SessionEnd::Closed;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "websocket error");
                        break SessionEnd::Closed;
                    }
                }
            },
        };

        self.dispatcher_tx.send_replace(None);
        let abandoned = pending.close_all().await;
        if abandoned > 0 {
            tracing::debug!(abandoned, "dropped pending requests");
        }

        match end {
            SessionEnd::Rejected | SessionEnd::Shutdown => {
                if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                    writer.abort();
                }
            }
            SessionEnd::Closed => writer.abort(),
        }
        end
    }

    fn begin_handshake(&mut self, dispatcher: &RequestDispatcher) -> Result<(), ClientError> {
        match self.credentials.token().map(str::to_string) {
            Some(token) => self.authenticate(dispatcher, token),
            None => self.request_token(dispatcher),
        }
    }

    fn authenticate(
        &mut self,
        dispatcher: &RequestDispatcher,
        token: String,
    ) -> Result<(), ClientError> {
        dispatcher.authenticate(&AuthenticationRequest {
            plugin_name: self.config.plugin_name.clone(),
            plugin_developer: self.config.plugin_developer.clone(),
            authentication_token: token,
        })?;
        self.set_state(ConnectionState::AwaitingAuth);
        Ok(())
    }

    fn request_token(&mut self, dispatcher: &RequestDispatcher) -> Result<(), ClientError> {
        dispatcher.request_token(&AuthenticationTokenRequest {
            plugin_name: self.config.plugin_name.clone(),
            plugin_developer: self.config.plugin_developer.clone(),
        })?;
        self.set_state(ConnectionState::AwaitingToken);
        tracing::info!("waiting for the plugin to be allowed in the remote application");
        Ok(())
    }

    /// Routes one text frame. Returns `Some` when the session must end.
    async fn handle_text(
        &mut self,
        text: &str,
        dispatcher: &RequestDispatcher,
        pending: &PendingRequests,
    ) -> Option<SessionEnd> {
        let envelope = match serde_json::from_str::<ResponseEnvelope>(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed message");
                return None;
            }
        };

        match Inbound::classify(envelope) {
            Inbound::Authentication {
                authenticated: true,
                ..
            } => {
                tracing::info!("authentication successful");
                self.set_state(ConnectionState::Ready);
                self.dispatcher_tx.send_replace(Some(dispatcher.clone()));
                None
            }
            Inbound::Authentication {
                authenticated: false,
                reason,
            } => {
                tracing::warn!(reason = %reason, "authentication rejected; requesting a new token");
                self.credentials.forget();
                self.request_token(dispatcher).err().map(|_| SessionEnd::Closed)
            }
            Inbound::TokenIssued(token) => {
                if token.is_empty() {
                    tracing::warn!("token response carried no token");
                    return None;
                }
                if let Err(e) = self.credentials.store(&token).await {
                    tracing::error!(
                        path = %self.credentials.path().display(),
                        error = %e,
                        "failed to save authentication token"
                    );
                }
                self.authenticate(dispatcher, token)
                    .err()
                    .map(|_| SessionEnd::Closed)
            }
            Inbound::ApiError { error_id, message } => {
                tracing::error!(error_id, message = %message, "api error");
                if let Err(e) = dispatcher.close() {
                    tracing::debug!(error = %e, "transport already gone");
                }
                self.status_tx
                    .send_replace(ConnectionStatus::failed(ApiFailure { error_id, message }));
                Some(SessionEnd::Rejected)
            }
            Inbound::Completion(envelope) => {
                if self.events.receiver_count() > 0 {
                    let _ = self.events.publish(envelope.clone());
                }
                if !pending.complete(envelope).await {
                    tracing::trace!("no request waiting for this message");
                }
                None
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = self.status_tx.send_if_modified(|status| {
            if status.state == state {
                return false;
            }
            *status = ConnectionStatus::now(state);
            true
        });
        if changed {
            tracing::debug!(state = %state, "connection state changed");
        }
    }
}

/// Resolves once `shutdown` holds `true`. Never resolves if the sender is
/// gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let requested = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}

/// Forwards queued frames to the socket. Stops after a close frame.
async fn run_write_loop(mut sink: WsSink, mut outbound: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            tracing::warn!(error = %e, "failed to write to websocket");
            break;
        }
        if closing {
            break;
        }
    }
    tracing::debug!("websocket writer stopped");
}

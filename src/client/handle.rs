//! Handle held by application code.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::connection::ConnectionManager;
use super::dispatcher::RequestDispatcher;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::launcher;
use crate::protocol::ResponseEnvelope;
use crate::session::{ConnectionState, ConnectionStatus, EventBus};

/// How long [`VtsClient::join`] waits for the teardown before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running client.
///
/// Dropping the handle leaves the connection task running; call
/// [`VtsClient::shutdown`] to stop it.
#[derive(Debug)]
pub struct VtsClient {
    status: watch::Receiver<ConnectionStatus>,
    dispatcher: watch::Receiver<Option<RequestDispatcher>>,
    events: EventBus,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl VtsClient {
    /// Launches the remote application (if configured) and spawns the
    /// connection manager.
    ///
    /// Launching is fire-and-forget: a failure is logged and the connect
    /// loop simply keeps retrying. Must be called from within a tokio
    /// runtime.
    #[must_use]
    pub fn start(config: ClientConfig) -> Self {
        if config.launch_app
            && let Err(e) = launcher::launch(&config.launch_uri)
        {
            tracing::warn!(uri = %config.launch_uri, error = %e, "could not launch remote application");
        }

        let manager = ConnectionManager::new(config);
        let status = manager.subscribe_status();
        let dispatcher = manager.subscribe_dispatcher();
        let events = manager.events().clone();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(manager.run(shutdown_rx));

        Self {
            status,
            dispatcher,
            events,
            shutdown,
            task,
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Receiver for every non-lifecycle inbound message.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ResponseEnvelope> {
        self.events.subscribe()
    }

    /// Dispatcher of the current session if it is authenticated.
    #[must_use]
    pub fn dispatcher(&self) -> Option<RequestDispatcher> {
        self.dispatcher.borrow().clone()
    }

    /// Waits until a session is authenticated and returns its dispatcher.
    ///
    /// A dispatcher is bound to one transport. After a reconnect, call this
    /// again to get the new one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] if the client was shut down by an
    /// `APIError`, or [`ClientError::SessionClosed`] if the connection task
    /// stopped for any other reason.
    pub async fn wait_ready(&self) -> Result<RequestDispatcher, ClientError> {
        let mut dispatcher = self.dispatcher.clone();
        let mut status = self.status.clone();
        loop {
            if let Some(ready) = dispatcher.borrow_and_update().clone() {
                return Ok(ready);
            }
            if status.borrow_and_update().state.is_terminal() {
                return Err(terminal_error(&status));
            }

            let stopped = tokio::select! {
                changed = dispatcher.changed() => changed.is_err(),
                changed = status.changed() => changed.is_err(),
            };
            if stopped {
                return Err(terminal_error(&status));
            }
        }
    }

    /// Returns `true` once the connection task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the connection task to stop.
    ///
    /// The current session sends a close frame, pending requests fail with
    /// [`ClientError::SessionClosed`] and no reconnect is attempted. Returns
    /// without waiting; use [`Self::join`] to wait for the teardown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Waits for the connection task to finish, aborting it if the teardown
    /// takes longer than a few seconds.
    pub async fn join(mut self) {
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.task)
            .await
            .is_err()
        {
            tracing::warn!("connection task did not stop in time; aborting");
            self.task.abort();
        }
    }
}

fn terminal_error(status: &watch::Receiver<ConnectionStatus>) -> ClientError {
    match status.borrow().failure.clone() {
        Some(failure) => ClientError::Rejected {
            error_id: failure.error_id,
            message: failure.message,
        },
        None => ClientError::SessionClosed,
    }
}

//! # vts-link
//!
//! Client for the VTube Studio plugin API over its local WebSocket.
//!
//! One persistent connection carries every request. The client
//! authenticates the plugin (requesting and saving a token the first time),
//! reconnects whenever the application goes away, and turns the
//! asynchronous socket into request/response calls: most requests suspend
//! the caller until their response arrives, while parameter injection,
//! authentication and event subscription are fire-and-forget.
//!
//! ## Architecture
//!
//! ```text
//! Application code
//!     │
//!     ├── VtsClient (client/handle)
//!     │       └── wait_ready() ─► RequestDispatcher (client/dispatcher)
//!     │                               │ register slot, send, await
//!     │                               ▼
//!     ├── PendingRequests / EventBus (session/)
//!     │                               ▲ complete slot
//!     │                               │
//!     └── ConnectionManager (client/connection)
//!             ├── CredentialStore (session/credential)
//!             └── WebSocket (tokio-tungstenite)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use vts_link::client::VtsClient;
//! use vts_link::config::ClientConfig;
//! use vts_link::protocol::requests::MoveModelRequest;
//!
//! # async fn demo() -> Result<(), vts_link::error::ClientError> {
//! let client = VtsClient::start(ClientConfig::default().with_plugin("My Plugin", "Me"));
//! let vts = client.wait_ready().await?;
//! vts.request_model_move(&MoveModelRequest { position_x: 0.3, ..Default::default() })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Under the default single-flight policy, blocking calls are serialized
//! and responses are paired with requests by arrival order.

pub mod client;
pub mod config;
pub mod error;
pub mod launcher;
pub mod protocol;
pub mod session;

//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default, so an empty
//! environment yields a client pointed at a local VTube Studio instance.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;
use crate::session::CorrelationPolicy;

/// Default endpoint of the VTube Studio plugin API.
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8001";

/// Steam launch URI for VTube Studio (app id 1325860).
pub const DEFAULT_LAUNCH_URI: &str = "steam://rungameid/1325860";

/// Largest accepted event bus capacity. The bus preallocates one slot per
/// message, and [`tokio::sync::broadcast`] panics above `usize::MAX / 2`.
pub const MAX_EVENT_BUS_CAPACITY: usize = 1 << 16;

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`], or built directly
/// with [`ClientConfig::new`] and the `with_*` setters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the remote application.
    pub websocket_url: String,

    /// Plugin name shown to the user in the authorization prompt.
    pub plugin_name: String,

    /// Plugin developer shown to the user in the authorization prompt.
    pub plugin_developer: String,

    /// File the issued token is appended to.
    pub token_file: PathBuf,

    /// Key under which the token is stored in the token file and looked up
    /// in the process environment.
    pub token_key: String,

    /// Pause between reconnect attempts. Zero retries immediately.
    pub reconnect_delay: Duration,

    /// Whether to ask the OS to start the remote application on startup.
    pub launch_app: bool,

    /// URI handed to the OS launcher.
    pub launch_uri: String,

    /// How inbound responses are paired with pending requests.
    pub correlation: CorrelationPolicy,

    /// Capacity of the inbound event bus.
    pub event_bus_capacity: usize,
}

impl ClientConfig {
    /// Creates a configuration for the given endpoint with default values
    /// for everything else.
    #[must_use]
    pub fn new(websocket_url: impl Into<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
            plugin_name: "VTS Link".to_string(),
            plugin_developer: "VTS Link Developers".to_string(),
            token_file: PathBuf::from(".env"),
            token_key: "VTS_TOKEN".to_string(),
            reconnect_delay: Duration::ZERO,
            launch_app: true,
            launch_uri: DEFAULT_LAUNCH_URI.to_string(),
            correlation: CorrelationPolicy::SingleFlight,
            event_bus_capacity: 1024,
        }
    }

    /// Sets the plugin identity presented during authentication.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>, developer: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self.plugin_developer = developer.into();
        self
    }

    /// Sets the token file and key.
    #[must_use]
    pub fn with_token_store(mut self, file: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        self.token_file = file.into();
        self.token_key = key.into();
        self
    }

    /// Sets the correlation policy.
    #[must_use]
    pub fn with_correlation(mut self, policy: CorrelationPolicy) -> Self {
        self.correlation = policy;
        self
    }

    /// Sets the pause between reconnect attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Enables or disables launching the remote application.
    #[must_use]
    pub fn with_launch_app(mut self, launch: bool) -> Self {
        self.launch_app = launch;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `VTS_CORRELATION` is set to an
    /// unknown policy or `VTS_EVENT_BUS_CAPACITY` is zero or larger than
    /// [`MAX_EVENT_BUS_CAPACITY`].
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let mut config = Self::new(
            std::env::var("VTS_WEBSOCKET_URL").unwrap_or_else(|_| DEFAULT_WEBSOCKET_URL.to_string()),
        );

        if let Ok(name) = std::env::var("VTS_PLUGIN_NAME") {
            config.plugin_name = name;
        }
        if let Ok(developer) = std::env::var("VTS_PLUGIN_DEVELOPER") {
            config.plugin_developer = developer;
        }
        if let Ok(file) = std::env::var("VTS_TOKEN_FILE") {
            config.token_file = PathBuf::from(file);
        }
        if let Ok(key) = std::env::var("VTS_TOKEN_KEY") {
            config.token_key = key;
        }
        if let Ok(uri) = std::env::var("VTS_LAUNCH_URI") {
            config.launch_uri = uri;
        }

        config.reconnect_delay = Duration::from_millis(parse_env("VTS_RECONNECT_DELAY_MS", 0));
        config.launch_app = parse_env_bool("VTS_LAUNCH_APP", true);

        if let Ok(policy) = std::env::var("VTS_CORRELATION") {
            config.correlation = policy.parse()?;
        }

        config.event_bus_capacity =
            check_event_bus_capacity(parse_env("VTS_EVENT_BUS_CAPACITY", 1024))?;

        Ok(config)
    }
}

fn check_event_bus_capacity(capacity: usize) -> Result<usize, ClientError> {
    if capacity == 0 {
        return Err(ClientError::Config(
            "VTS_EVENT_BUS_CAPACITY must be greater than zero".to_string(),
        ));
    }
    if capacity > MAX_EVENT_BUS_CAPACITY {
        return Err(ClientError::Config(format!(
            "VTS_EVENT_BUS_CAPACITY must not exceed {MAX_EVENT_BUS_CAPACITY}"
        )));
    }
    Ok(capacity)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WEBSOCKET_URL)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}

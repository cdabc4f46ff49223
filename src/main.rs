//! vts-link entry point.
//!
//! Launches VTube Studio, connects and authenticates, reports the loaded
//! model, then idles until Ctrl-C.

use tracing_subscriber::EnvFilter;

use vts_link::client::VtsClient;
use vts_link::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ClientConfig::from_env()?;
    tracing::info!(
        url = %config.websocket_url,
        plugin = %config.plugin_name,
        "starting vts-link"
    );

    let client = VtsClient::start(config);

    tokio::select! {
        ready = client.wait_ready() => {
            let vts = ready?;
            let model = vts.request_current_model().await?;
            let name = model
                .data
                .get("modelName")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<none>");
            tracing::info!(model = %name, "connected to VTube Studio");
            tokio::signal::ctrl_c().await?;
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("shutting down");
    client.shutdown();
    client.join().await;
    Ok(())
}

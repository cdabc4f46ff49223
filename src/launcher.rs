//! Starts the remote application through the OS URI handler.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::ClientError;

/// Hands `uri` to the platform launcher without waiting for the
/// application to come up.
///
/// # Errors
///
/// Returns [`ClientError::Io`] if the launcher process cannot be spawned.
pub fn launch(uri: &str) -> Result<(), ClientError> {
    let child = launch_command(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    tracing::info!(uri = %uri, pid = ?child.id(), "launching remote application");
    Ok(())
}

/// Builds the platform-specific launcher command for `uri`.
#[must_use]
pub fn launch_command(uri: &str) -> Command {
    // `start` treats its first quoted argument as a window title.
    let (program, leading): (&str, &[&str]) = if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };
    let mut command = Command::new(program);
    command.args(leading).arg(uri);
    command
}

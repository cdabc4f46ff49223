//! Durable storage for the plugin's authentication token.
//!
//! Tokens are appended to a dotenv-style file as `KEY = "token"` lines and
//! never rewritten. Since old lines accumulate, loading takes the last
//! matching entry in the file and only then falls back to the process
//! environment.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::ClientError;

/// Holds the current token and knows where to persist new ones.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    key: String,
    token: Option<String>,
}

impl CredentialStore {
    /// Loads the token stored under `key`, if any.
    ///
    /// A missing or unreadable file is not an error; the store simply
    /// starts empty.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let path = path.into();
        let key = key.into();
        let token = last_entry(&path, &key).or_else(|| {
            std::env::var(&key)
                .ok()
                .filter(|value| !value.is_empty())
        });
        if token.is_some() {
            tracing::debug!(key = %key, "loaded stored credential");
        }
        Self { path, key, token }
    }

    /// Returns the held token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `token` to the token file and holds it in memory.
    ///
    /// Returns `false` without writing when `token` is already the held
    /// token, so a repeated response never produces a duplicate line.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file cannot be opened or written.
    /// The in-memory token is left unchanged in that case.
    pub async fn store(&mut self, token: &str) -> Result<bool, ClientError> {
        if self.token.as_deref() == Some(token) {
            return Ok(false);
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = format!("\n{} = \"{}\"", self.key, token);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.token = Some(token.to_string());
        tracing::info!(path = %self.path.display(), "saved authentication token");
        Ok(true)
    }

    /// Drops the in-memory token. The file is left untouched.
    pub fn forget(&mut self) {
        self.token = None;
    }
}

/// Returns the value of the last `key` entry in the dotenv file at `path`.
fn last_entry(path: &Path, key: &str) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;
    entries
        .filter_map(Result::ok)
        .filter(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v)
        .last()
}

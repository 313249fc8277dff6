//! Persisted token slot for the consent flow.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use docdrive_common::Result;

use super::auth::Tokens;

const TOKEN_FILE_NAME: &str = "token.json";

/// A single local file holding the serialized [`Tokens`].
///
/// Writes go to a sibling temp file that is renamed over the slot, so a
/// reader never observes a half-written token. Callers serialize access.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/docdrive/token.json`, or `./token.json` when the platform
    /// has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("docdrive").join(TOKEN_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted tokens, if any.
    ///
    /// A slot that cannot be parsed is treated as empty.
    pub async fn load(&self) -> Result<Option<Tokens>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!("Ignoring unreadable token slot {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// Overwrite the slot with `tokens`.
    pub async fn save(&self, tokens: &Tokens) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Persisted token to {}", self.path.display());
        Ok(())
    }

    /// Delete the slot. Deleting an empty slot is not an error.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed token slot {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

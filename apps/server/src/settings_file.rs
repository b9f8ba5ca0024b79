//! JSON file backed settings store.
//!
//! The settings document lives in one JSON file that is re-read on every
//! load, so edits made while the server runs are picked up by the next
//! scheduler cycle. Writes go through a sibling temp file and rename so a
//! crash never leaves a half-written document behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aubade_core::{AubadeError, AubadeResult, Settings, SettingsStore};

pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a default settings document if none exists yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "No settings file at {}, creating defaults",
                    self.path.display()
                );
                self.write_document(&Settings::default())
                    .await
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("Failed to write default settings")
            }
            Err(e) => Err(e).context("Failed to inspect settings file"),
        }
    }

    async fn write_document(&self, settings: &Settings) -> AubadeResult<()> {
        let json = serde_json::to_string_pretty(settings)?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| AubadeError::Settings(format!("settings write failed: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| AubadeError::Settings(format!("settings rename failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Option<Settings> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::error!("Settings file {} is invalid: {}", self.path.display(), e);
                None
            }
        }
    }

    async fn replace(&self, settings: Settings) -> AubadeResult<()> {
        self.write_document(&settings).await
    }
}

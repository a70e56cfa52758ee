use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::settings::Settings;

const SETTINGS_FILE: &str = "settings.toml";

/// Reads and writes `settings.toml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsLoader {
    path: PathBuf,
}

impl SettingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for the platform config directory
    pub fn from_default_location() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let proj_dirs = ProjectDirs::from("com", "campus", "campus-session").ok_or_else(|| {
            error!("Failed to determine project directories - this usually indicates an unsupported OS or missing home directory");
            SettingsError::ProjectDirectoriesUnavailable
        })?;

        Ok(proj_dirs.config_dir().join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file does not exist
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub async fn load(&self) -> Result<Settings, SettingsError> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            info!(
                "Settings file {} doesn't exist, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .context("Failed to read settings file")
            .map_err(|e| {
                error!("Failed to read settings file {}: {}", self.path.display(), e);
                SettingsError::FileReadFailed {
                    path: self.path.clone(),
                    source: e,
                }
            })?;

        debug!(
            "Successfully read {} bytes from {}",
            content.len(),
            self.path.display()
        );

        let settings: Settings = toml::from_str(&content)
            .context("Failed to parse settings file")
            .map_err(|e| {
                error!("Failed to parse settings file {}: {}", self.path.display(), e);
                SettingsError::ParsingFailed {
                    path: self.path.clone(),
                    source: e,
                }
            })?;

        info!("Loaded settings from {}", self.path.display());
        Ok(settings)
    }

    /// Load settings, writing the defaults out on first run so there is a
    /// file to edit. A failed write is logged and the defaults still apply.
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub async fn load_or_init(&self) -> Result<Settings, SettingsError> {
        if tokio::fs::metadata(&self.path).await.is_ok() {
            return self.load().await;
        }

        let settings = Settings::default();
        if let Err(e) = self.save(&settings).await {
            warn!("Could not write default settings: {}", e);
        }
        Ok(settings)
    }

    #[instrument(skip(self, settings), fields(path = %self.path.display()), level = "debug")]
    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let dir = self.path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = dir
            && tokio::fs::metadata(dir).await.is_err()
        {
            info!("Settings directory doesn't exist, creating: {}", dir.display());
            tokio::fs::create_dir_all(dir)
                .await
                .context("Failed to create settings directory")
                .map_err(|e| {
                    error!(
                        "Failed to create settings directory {}: {}",
                        dir.display(),
                        e
                    );
                    SettingsError::DirectoryCreationFailed {
                        path: dir.to_path_buf(),
                        source: e,
                    }
                })?;
        }

        let toml = toml::to_string_pretty(settings)
            .context("Failed to serialize settings to TOML")
            .map_err(|e| {
                error!("Failed to serialize settings: {}", e);
                SettingsError::SerializationFailed { source: e }
            })?;

        tokio::fs::write(&self.path, toml)
            .await
            .context("Failed to write settings file")
            .map_err(|e| {
                error!("Failed to write settings file {}: {}", self.path.display(), e);
                SettingsError::FileWriteFailed {
                    path: self.path.clone(),
                    source: e,
                }
            })?;

        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "Project directories are unavailable - this usually indicates an unsupported OS or missing home directory"
    )]
    ProjectDirectoriesUnavailable,

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to read settings file '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write settings file '{path}': {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    ParsingFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to serialize settings: {source}")]
    SerializationFailed {
        #[source]
        source: anyhow::Error,
    },
}

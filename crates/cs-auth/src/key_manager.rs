use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::fs;

use crate::crypto::EncryptionKey;
use crate::errors::StorageError;

/// Supplies the key that encrypts persisted tokens.
///
/// The key is kept apart from the records it protects and lives only as long
/// as the user's session: once it is gone, persisted tokens are unreadable.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync + std::fmt::Debug {
    /// Return the current key, creating one if none exists yet
    async fn load_or_create(&self) -> Result<EncryptionKey, StorageError>;

    /// Forget the key. Safe to call when no key exists.
    async fn discard(&self) -> Result<(), StorageError>;
}

/// Key held only in process memory.
///
/// Records written under this key cannot be read by any later process.
#[derive(Debug, Default)]
pub struct EphemeralKeySource {
    key: Mutex<Option<EncryptionKey>>,
}

impl EphemeralKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeySource for EphemeralKeySource {
    async fn load_or_create(&self) -> Result<EncryptionKey, StorageError> {
        let mut slot = self
            .key
            .lock()
            .map_err(|_| StorageError::Unavailable("Lock poisoned".to_string()))?;
        Ok(slot.get_or_insert_with(EncryptionKey::generate).clone())
    }

    async fn discard(&self) -> Result<(), StorageError> {
        self.key
            .lock()
            .map_err(|_| StorageError::Unavailable("Lock poisoned".to_string()))?
            .take();
        Ok(())
    }
}

/// Key file in the user's runtime directory, which the OS empties when the
/// login session ends.
#[derive(Debug, Clone)]
pub struct RuntimeKeySource {
    path: PathBuf,
}

impl RuntimeKeySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `$XDG_RUNTIME_DIR/campus-session/session.key`, or `fallback_dir` on
    /// platforms without a runtime dir
    pub fn default_location(fallback_dir: impl AsRef<Path>) -> Self {
        let dir = directories::BaseDirs::new()
            .and_then(|dirs| dirs.runtime_dir().map(Path::to_path_buf))
            .map(|dir| dir.join("campus-session"))
            .unwrap_or_else(|| fallback_dir.as_ref().to_path_buf());
        Self::new(dir.join("session.key"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_new(&self) -> Result<EncryptionKey, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let key = EncryptionKey::generate();
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, key.to_base64()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&temp_path, &self.path).await?;
        tracing::debug!("Created session key at {}", self.path.display());
        Ok(key)
    }
}

#[async_trait::async_trait]
impl KeySource for RuntimeKeySource {
    async fn load_or_create(&self) -> Result<EncryptionKey, StorageError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => EncryptionKey::from_base64(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.write_new().await,
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

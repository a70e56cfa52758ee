use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::crypto::{self, EncryptedBlob, EncryptionKey};
use crate::errors::StorageError;
use crate::key_manager::KeySource;
use crate::session::{AccessToken, RefreshToken, TokenPair};
use crate::store::{TokenCell, TokenStore};

const ACCESS_RECORD: &str = "access_token";
const REFRESH_RECORD: &str = "refresh_token";

/// One persisted value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    stored_at: DateTime<Utc>,
    blob: EncryptedBlob,
}

#[derive(Debug, Default)]
struct Backend {
    /// false until `init` succeeds, and after it fails
    available: bool,
    key: Option<EncryptionKey>,
}

/// Memory store backed by encrypted records on disk.
///
/// Survives a restart of the client for as long as the [`KeySource`] keeps
/// its key. Persisted values become unreadable once the key is gone.
///
/// # Directory Structure
/// ```text
/// <storage_dir>/
/// ├── lock                 # Advisory lock file
/// ├── access_token.json    # Encrypted access token
/// └── refresh_token.json   # Encrypted refresh token
/// ```
#[derive(Debug)]
pub struct EncryptedTokenStore {
    storage_dir: PathBuf,
    key_source: Arc<dyn KeySource>,
    cell: TokenCell,
    /// Serializes every write so memory and disk never hold different pairs
    backend: Mutex<Backend>,
}

impl EncryptedTokenStore {
    pub fn new(storage_dir: impl AsRef<Path>, key_source: Arc<dyn KeySource>) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            key_source,
            cell: TokenCell::default(),
            backend: Mutex::new(Backend::default()),
        }
    }

    /// Default storage directory for the current platform
    pub fn default_storage_dir() -> Result<PathBuf, StorageError> {
        let project_dirs = directories::ProjectDirs::from("com", "campus", "campus-session")
            .ok_or_else(|| {
                StorageError::Unavailable("Could not determine data directory".to_string())
            })?;

        Ok(project_dirs.data_local_dir().join("tokens"))
    }

    /// Whether records are being written to disk
    pub async fn is_persistent(&self) -> bool {
        self.backend.lock().await.available
    }

    fn record_path(&self, record_key: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.json", record_key))
    }

    async fn prepare_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.storage_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.storage_dir, std::fs::Permissions::from_mode(0o700))
                .await?;
        }

        Ok(())
    }

    fn acquire_lock(&self) -> Result<std::fs::File, StorageError> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.storage_dir.join("lock"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StorageError::Locked)?;

        Ok(lock_file)
    }

    async fn read_record(
        &self,
        key: &EncryptionKey,
        record_key: &str,
    ) -> Result<Option<String>, StorageError> {
        let content = match fs::read_to_string(self.record_path(record_key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: StoredRecord =
            serde_json::from_str(&content).map_err(|_| StorageError::CorruptedStore)?;
        let plaintext = crypto::decrypt(key, &record.blob, record_key)?;
        let value = String::from_utf8(plaintext).map_err(|_| StorageError::CorruptedStore)?;

        Ok(Some(value))
    }

    async fn write_record(
        &self,
        key: &EncryptionKey,
        record_key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let record = StoredRecord {
            stored_at: Utc::now(),
            blob: crypto::encrypt(key, value.as_bytes(), record_key)?,
        };
        let json = serde_json::to_string_pretty(&record)?;

        // Atomic write: write to temp file, then rename
        let path = self.record_path(record_key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn remove_record(&self, record_key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.record_path(record_key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn purge_records(&self) -> Result<(), StorageError> {
        self.remove_record(ACCESS_RECORD).await?;
        self.remove_record(REFRESH_RECORD).await
    }

    async fn load_pair(&self, key: &EncryptionKey) -> Result<Option<TokenPair>, StorageError> {
        let Some(access) = self.read_record(key, ACCESS_RECORD).await? else {
            return Ok(None);
        };
        let refresh = self.read_record(key, REFRESH_RECORD).await?;

        Ok(Some(TokenPair {
            access: AccessToken::new(access),
            refresh: refresh.map(RefreshToken::new),
        }))
    }

    async fn persist(&self, backend: &mut Backend, pair: &TokenPair) -> Result<(), StorageError> {
        let key = match &backend.key {
            Some(key) => key.clone(),
            None => {
                let key = self.key_source.load_or_create().await?;
                backend.key = Some(key.clone());
                key
            }
        };

        let _lock = self.acquire_lock()?;
        self.write_record(&key, ACCESS_RECORD, pair.access.as_str())
            .await?;
        match &pair.refresh {
            Some(refresh) => {
                self.write_record(&key, REFRESH_RECORD, refresh.as_str())
                    .await
            }
            None => self.remove_record(REFRESH_RECORD).await,
        }
    }

    /// Stop persisting after a failed write. Whatever reached the disk is
    /// made unreadable and removed so it can never be restored over the
    /// in-memory pair.
    async fn abandon_disk(&self, backend: &mut Backend) {
        backend.available = false;
        backend.key = None;

        if let Err(e) = self.key_source.discard().await {
            tracing::warn!("Failed to discard session key: {}", e);
        }
        if let Err(e) = self.purge_records().await {
            tracing::warn!("Failed to remove stale token records: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for EncryptedTokenStore {
    async fn init(&self) {
        let mut backend = self.backend.lock().await;
        if backend.available {
            return;
        }

        let opened = match self.prepare_dir().await {
            Ok(()) => self.key_source.load_or_create().await,
            Err(e) => Err(e),
        };

        match opened {
            Ok(key) => {
                backend.key = Some(key);
                backend.available = true;
                tracing::debug!(
                    "Encrypted token storage ready at {}",
                    self.storage_dir.display()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Encrypted token storage unavailable ({}), keeping tokens in memory only",
                    e
                );
            }
        }
    }

    async fn restore_tokens(&self) -> bool {
        let mut backend = self.backend.lock().await;
        if !backend.available {
            return self.cell.get().is_some();
        }

        let key = match &backend.key {
            Some(key) => key.clone(),
            None => match self.key_source.load_or_create().await {
                Ok(key) => {
                    backend.key = Some(key.clone());
                    key
                }
                Err(e) => {
                    tracing::warn!("Session key unavailable ({}), nothing to restore", e);
                    return false;
                }
            },
        };

        match self.load_pair(&key).await {
            Ok(Some(pair)) => {
                self.cell.replace(Some(pair));
                tracing::debug!("Restored tokens from encrypted storage");
                true
            }
            Ok(None) => false,
            Err(StorageError::CorruptedStore) => {
                tracing::error!("Persisted tokens are unreadable with the current session key, discarding them");
                if let Err(e) = self.purge_records().await {
                    tracing::warn!("Failed to remove unreadable token records: {}", e);
                }
                false
            }
            Err(e) => {
                tracing::error!("Failed to read persisted tokens: {}", e);
                false
            }
        }
    }

    async fn set_tokens(&self, pair: TokenPair) -> Result<(), StorageError> {
        let mut backend = self.backend.lock().await;

        if backend.available
            && let Err(e) = self.persist(&mut backend, &pair).await
        {
            tracing::warn!(
                "Failed to persist tokens ({}), keeping them in memory only",
                e
            );
            self.abandon_disk(&mut backend).await;
        }

        self.cell.replace(Some(pair));
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        let mut backend = self.backend.lock().await;
        self.cell.replace(None);

        if !backend.available {
            return Ok(());
        }

        // key first: records left behind are unreadable without it
        backend.key = None;
        let discarded = self.key_source.discard().await;

        // the lock is advisory; a holder must not keep a cleared session alive
        let _lock = match self.acquire_lock() {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!("Clearing token records without the storage lock: {}", e);
                None
            }
        };
        let purged = self.purge_records().await;

        discarded?;
        purged
    }

    fn tokens(&self) -> Option<TokenPair> {
        self.cell.get()
    }
}

use std::sync::RwLock;

use crate::errors::StorageError;
use crate::session::{AccessToken, RefreshToken, TokenPair};

/// How credentials travel with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// `Authorization: Bearer` header built from the stored access token
    Bearer,
    /// httpOnly cookies carried by the transport's cookie jar. A token pair
    /// held in memory is still sent as a bearer header when present.
    Cookie,
}

/// Holds the current access/refresh pair behind one interface, whatever the
/// backing strategy.
///
/// Reads are synchronous so request construction never has to await them.
/// Writes may hit persistent storage and are async.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Prepare backing storage. Idempotent; on failure the store logs and
    /// keeps working in memory only.
    async fn init(&self);

    /// Populate memory from persistent storage. `false` when no session was
    /// found; never an error.
    async fn restore_tokens(&self) -> bool;

    /// Replace the pair and persist it
    async fn set_tokens(&self, pair: TokenPair) -> Result<(), StorageError>;

    /// Remove in-memory and persisted state. Safe to repeat.
    async fn clear_tokens(&self) -> Result<(), StorageError>;

    /// Consistent snapshot of the whole pair
    fn tokens(&self) -> Option<TokenPair>;

    fn credential_mode(&self) -> CredentialMode {
        CredentialMode::Bearer
    }

    fn access_token(&self) -> Option<AccessToken> {
        self.tokens().map(|pair| pair.access.clone())
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.tokens().and_then(|pair| pair.refresh.clone())
    }
}

/// Single slot holding the pair. Every strategy keeps its in-memory state here.
#[derive(Debug, Default)]
pub(crate) struct TokenCell {
    pair: RwLock<Option<TokenPair>>,
}

impl TokenCell {
    pub(crate) fn get(&self) -> Option<TokenPair> {
        match self.pair.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn replace(&self, pair: Option<TokenPair>) {
        match self.pair.write() {
            Ok(mut guard) => *guard = pair,
            Err(poisoned) => *poisoned.into_inner() = pair,
        }
    }
}

/// Memory-only store. Tokens vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    cell: TokenCell,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        let store = Self::new();
        store.cell.replace(Some(pair));
        store
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn init(&self) {}

    async fn restore_tokens(&self) -> bool {
        self.cell.get().is_some()
    }

    async fn set_tokens(&self, pair: TokenPair) -> Result<(), StorageError> {
        self.cell.replace(Some(pair));
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        self.cell.replace(None);
        Ok(())
    }

    fn tokens(&self) -> Option<TokenPair> {
        self.cell.get()
    }
}

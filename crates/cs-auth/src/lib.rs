//! Client-side session core for the Campus platform API
//!
//! This crate owns everything between "the UI wants to call the API" and
//! "the request hits the wire": where tokens live, how requests are
//! decorated, and what happens when the server answers 401.
//!
//! # Request Flow
//!
//! 1. The request interceptor attaches the bearer token and, on
//!    state-changing methods, the CSRF token
//! 2. The request is sent
//! 3. On 401 the refresh coordinator runs one shared refresh for every
//!    failing request, then each request is replayed exactly once
//! 4. If the refresh fails, tokens are cleared and
//!    [`SessionEvent::Expired`] is emitted before any caller sees the error
//!
//! # Example
//!
//! ```no_run
//! use cs_auth::{ApiClient, AuthConfig, SessionBootstrap, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AuthConfig::new("https://campus.example.com/api/")?;
//!     let client = ApiClient::new(config)?;
//!
//!     // Decide between "show login" and "show dashboard"
//!     let status = SessionBootstrap::new(client.clone()).run().await;
//!     if !status.is_authenticated() {
//!         client.login("ada@school.test", "hunter2").await?;
//!     }
//!
//!     // Navigation stays with the UI
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let SessionEvent::Expired { redirect: Some(to), .. } = event {
//!                 println!("Navigate to {}", to.location());
//!             }
//!         }
//!     });
//!
//!     let quests: serde_json::Value = client.get_json("quests").await?;
//!     println!("{}", quests);
//!     Ok(())
//! }
//! ```
//!
//! # Token Storage
//!
//! Storage is picked per deployment with [`StorageStrategy`]:
//!
//! ## In-Memory Storage
//!
//! ```
//! use cs_auth::{MemoryTokenStore, TokenPair, TokenStore};
//!
//! # async fn example() -> Result<(), cs_auth::StorageError> {
//! let store = MemoryTokenStore::new();
//! assert!(!store.restore_tokens().await);
//!
//! store.set_tokens(TokenPair::new("A1", "R1")).await?;
//! assert_eq!(store.access_token().unwrap().as_str(), "A1");
//!
//! store.clear_tokens().await?;
//! assert!(store.tokens().is_none());
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```
//!
//! ## Encrypted Storage
//!
//! ```no_run
//! use cs_auth::{EncryptedTokenStore, RuntimeKeySource, TokenStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), cs_auth::StorageError> {
//! let dir = EncryptedTokenStore::default_storage_dir()?;
//! let keys = Arc::new(RuntimeKeySource::default_location(&dir));
//! let store = EncryptedTokenStore::new(&dir, keys);
//!
//! // Falls back to memory only if the directory is unusable
//! store.init().await;
//! let restored = store.restore_tokens().await;
//! # let _ = restored;
//! # Ok(())
//! # }
//! ```
//!
//! # Important Notes
//!
//! - Tokens are never logged; their `Debug` output is redacted
//! - The encryption key lives only as long as the login session, so
//!   persisted records are unreadable once it is gone
//! - A missing CSRF token never blocks a request

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod cookie_store;
pub mod crypto;
pub mod csrf;
pub mod errors;
pub mod events;
pub mod file_store;
pub mod key_manager;
pub mod models;
pub mod redirect;
pub mod refresh;
pub mod request;
pub mod session;
pub mod store;

// Re-export main types
pub use bootstrap::{SessionBootstrap, SessionPhase, SessionStatus};
pub use client::{ApiClient, ApiResponse, build_store};
pub use config::{AuthConfig, EndpointPaths, HttpTimeouts, KeyStrategy, StorageStrategy};
pub use cookie_store::CookieTokenStore;
pub use csrf::CsrfProvider;
pub use errors::{AuthError, RefreshError, Result, StorageError};
pub use events::SessionEvent;
pub use file_store::EncryptedTokenStore;
pub use key_manager::{EphemeralKeySource, KeySource, RuntimeKeySource};
pub use models::UserProfile;
pub use redirect::{LoginRedirect, RedirectPolicy};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use request::{ApiRequest, MultipartPart, RequestBody, RequestInterceptor};
pub use session::{AccessToken, RefreshToken, TokenPair};
pub use store::{CredentialMode, MemoryTokenStore, TokenStore};

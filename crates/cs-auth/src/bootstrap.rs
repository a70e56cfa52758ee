use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::client::ApiClient;
use crate::errors::AuthError;
use crate::models::UserProfile;

/// Where the session stands after (or during) bootstrap
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticated(UserProfile),
    /// Credentials were kept but the server could not be reached to
    /// confirm them
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// True until the bootstrap sequence settles; protected views wait on it
    pub loading: bool,
    pub phase: SessionPhase,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match &self.phase {
            SessionPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            loading: true,
            phase: SessionPhase::Anonymous,
        }
    }
}

/// Restores and validates a persisted session once at startup.
///
/// Status starts as loading and only settles when the sequence has finished,
/// so nothing renders an anonymous state for a user who is about to be
/// restored.
#[derive(Debug)]
pub struct SessionBootstrap {
    client: ApiClient,
    status: watch::Sender<SessionStatus>,
}

impl SessionBootstrap {
    pub fn new(client: ApiClient) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        Self { client, status }
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn current(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Run the sequence: initialize storage, restore tokens, then confirm
    /// them with the who-am-I call.
    #[instrument(skip(self))]
    pub async fn run(&self) -> SessionStatus {
        self.status.send_replace(SessionStatus::default());

        let store = self.client.store();
        store.init().await;

        let phase = if !store.restore_tokens().await {
            info!("No stored session");
            SessionPhase::Anonymous
        } else {
            match self.client.current_user().await {
                Ok(user) => {
                    info!("Restored session for user {}", user.id);
                    self.client.announce_authenticated();
                    SessionPhase::Authenticated(user)
                }
                Err(AuthError::Unauthorized { .. }) | Err(AuthError::SessionExpired(_)) => {
                    info!("Stored session is no longer valid");
                    self.client.discard_session().await;
                    SessionPhase::Anonymous
                }
                Err(e) if e.is_network() => {
                    warn!("Could not reach server to confirm session: {}", e);
                    SessionPhase::Unreachable
                }
                Err(e) => {
                    warn!("Session check failed: {}", e);
                    self.client.discard_session().await;
                    SessionPhase::Anonymous
                }
            }
        };

        let settled = SessionStatus {
            loading: false,
            phase,
        };
        self.status.send_replace(settled.clone());
        settled
    }
}

use tokio::sync::broadcast;

use crate::redirect::LoginRedirect;

/// Session transitions the UI layer subscribes to.
///
/// The core never navigates by itself; it reports and lets the UI decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login or session restore succeeded
    Authenticated,
    /// The shared refresh stored a new token pair
    Refreshed,
    /// Refresh failed and every token was cleared. `redirect` is `None` when
    /// the current path tolerates anonymous access.
    Expired {
        redirect: Option<LoginRedirect>,
        reason: String,
    },
    /// Local logout finished (server call may have failed)
    LoggedOut,
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}

//! Global failure policy
//!
//! A single cross-cutting rule set evaluated after every failed query or
//! mutation:
//!
//! - `Unauthenticated` evicts the session principal and everything it gates
//!   (cart, orders, profile) in one atomic sweep, then emits exactly one
//!   [`SyncEvent::SessionExpired`] per expiry episode. A latch keeps
//!   concurrent 401s from producing duplicate redirect triggers; it rearms
//!   when a session is established again.
//! - Any other failed **mutation** emits a [`SyncEvent::Notice`] carrying
//!   the error message, so the UI can show a dismissible notification.
//! - Failed queries emit nothing here; they surface through the returned
//!   `Err` for inline rendering.

use crate::cache::CacheStore;
use crate::error::{ApiError, ErrorKind};
use crate::key::ResourceKey;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Fallback notice when the backend supplied no message.
const GENERIC_NOTICE: &str = "An error occurred";

/// Cross-cutting event emitted by the failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The session expired; subscribers should clear UI state and navigate
    /// to the authentication entry point.
    SessionExpired,
    /// A mutation failed; subscribers should surface a transient,
    /// dismissible notification with this message.
    Notice(String),
}

/// Which side of the read/write split observed a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Query,
    Mutation,
}

pub(crate) struct FailurePolicy {
    events: broadcast::Sender<SyncEvent>,
    session_gated: Vec<ResourceKey>,
    expired: AtomicBool,
}

impl FailurePolicy {
    pub fn new(session_gated: Vec<ResourceKey>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            events,
            session_gated,
            expired: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Evaluate the policy for one classified failure.
    pub fn after_failure(&self, origin: Origin, error: &ApiError, cache: &CacheStore) {
        if error.kind == ErrorKind::Unauthenticated {
            // Latch: the first 401 of an expiry episode escalates; the rest
            // are already covered by that escalation.
            if !self.expired.swap(true, Ordering::SeqCst) {
                let evicted = cache.evict_all(&self.session_gated);
                tracing::info!(evicted, "session expired, evicted session-gated entries");
                let _ = self.events.send(SyncEvent::SessionExpired);
            }
            return;
        }

        match origin {
            Origin::Mutation => {
                let message = if error.message.is_empty() {
                    GENERIC_NOTICE.to_string()
                } else {
                    error.message.clone()
                };
                let _ = self.events.send(SyncEvent::Notice(message));
            }
            Origin::Query => {
                tracing::debug!(kind = %error.kind, status = error.status, "query failed");
            }
        }
    }

    /// Rearm the expiry latch after a session is established.
    pub fn restore_session(&self) {
        self.expired.store(false, Ordering::SeqCst);
    }
}

//! # Session Registry
//!
//! Shared list of live playback sessions. In exclusive mode the player
//! releases every registered session before starting a new one, so at most
//! one session is ever playing.

use crate::session::{PlaybackSession, PlaybackSessionId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Registry of live playback sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<Vec<PlaybackSession>>>,
}

/// Non-owning handle held by sessions to remove themselves on release.
#[derive(Clone)]
pub(crate) struct WeakSessionRegistry {
    sessions: Weak<Mutex<Vec<PlaybackSession>>>,
}

impl WeakSessionRegistry {
    pub(crate) fn upgrade(&self) -> Option<SessionRegistry> {
        self.sessions
            .upgrade()
            .map(|sessions| SessionRegistry { sessions })
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn downgrade(&self) -> WeakSessionRegistry {
        WeakSessionRegistry {
            sessions: Arc::downgrade(&self.sessions),
        }
    }

    pub fn register(&self, session: PlaybackSession) {
        let mut sessions = self.sessions.lock();
        if !sessions.iter().any(|s| s.id() == session.id()) {
            sessions.push(session);
        }
    }

    /// Removes a session; returns `false` when it was not registered.
    pub fn unregister(&self, id: PlaybackSessionId) -> bool {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|s| s.id() != id);
        sessions.len() != before
    }

    /// Stops every registered session and empties the registry.
    ///
    /// Returns the number of sessions stopped.
    pub fn release_all(&self) -> usize {
        let sessions = std::mem::take(&mut *self.sessions.lock());
        let count = sessions.len();

        for session in sessions {
            session.stop();
        }

        if count > 0 {
            debug!(count, "Released active playback sessions");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn active_ids(&self) -> Vec<PlaybackSessionId> {
        self.sessions.lock().iter().map(|s| s.id()).collect()
    }

    pub fn get(&self, id: PlaybackSessionId) -> Option<PlaybackSession> {
        self.sessions.lock().iter().find(|s| s.id() == id).cloned()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("active", &self.active_ids())
            .finish()
    }
}

//! Matchmaking registry - pairs incoming players into sessions

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::game::{
    GameOverCallback, MatchSession, PlayerSlot, SessionError, SessionSettings, SlotIndex,
};

type Sessions = Mutex<Vec<Arc<MatchSession>>>;

/// Where a participant ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seating {
    pub session_id: Uuid,
    pub slot: SlotIndex,
}

/// Live sessions, one lock around every mutation.
///
/// Lock order is registry then session. Sessions call back into the
/// registry only after releasing their own lock.
pub struct MatchmakingRegistry {
    sessions: Arc<Sessions>,
    settings: SessionSettings,
}

impl MatchmakingRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Vec::new())),
            settings,
        }
    }

    /// Seat a participant in the first session waiting for an opponent, or
    /// open a new one. The whole decision is one critical section.
    ///
    /// Pairing keeps at most one session waiting at a time, but the scan
    /// does not rely on it: every waiting session is tried in order.
    pub fn join(&self, slot: Arc<PlayerSlot>) -> Result<Seating, SessionError> {
        let mut sessions = self.sessions.lock();

        for session in sessions.iter().filter(|s| s.is_waiting()) {
            match session.join(Arc::clone(&slot)) {
                Ok(index) => return Ok(Self::seated(session, &slot, index)),
                Err(SessionError::SessionEnded) => {
                    // Its only player left between the check and the join;
                    // the session is on its way out of the registry.
                    warn!(session_id = %session.id(), "Waiting session ended during join");
                }
                Err(e) => {
                    error!(
                        session_id = %session.id(),
                        slot_id = %slot.id(),
                        error = %e,
                        "Join failed"
                    );
                    return Err(e);
                }
            }
        }

        let session = MatchSession::new(self.settings.clone(), rand::random::<u64>());
        session.on_game_over(Self::removal_callback(Arc::downgrade(&self.sessions)));
        sessions.push(Arc::clone(&session));

        info!(
            session_id = %session.id(),
            active_sessions = sessions.len(),
            "Created new session"
        );

        match session.join(Arc::clone(&slot)) {
            Ok(index) => Ok(Self::seated(&session, &slot, index)),
            Err(e) => {
                error!(session_id = %session.id(), slot_id = %slot.id(), error = %e, "Join failed");
                sessions.retain(|s| !Arc::ptr_eq(s, &session));
                Err(e)
            }
        }
    }

    fn seated(session: &MatchSession, slot: &PlayerSlot, index: SlotIndex) -> Seating {
        info!(
            session_id = %session.id(),
            slot_id = %slot.id(),
            slot = index,
            "Player joined session"
        );
        Seating {
            session_id: session.id(),
            slot: index,
        }
    }

    /// Game-over hook handed to each session
    fn removal_callback(sessions: Weak<Sessions>) -> GameOverCallback {
        Box::new(move |session_id| {
            let Some(sessions) = sessions.upgrade() else {
                return;
            };
            let mut sessions = sessions.lock();
            sessions.retain(|s| s.id() != session_id);
            info!(
                session_id = %session_id,
                active_sessions = sessions.len(),
                "Session removed from registry"
            );
        })
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn waiting_sessions(&self) -> usize {
        self.sessions.lock().iter().filter(|s| s.is_waiting()).count()
    }

    pub fn session(&self, id: Uuid) -> Option<Arc<MatchSession>> {
        self.sessions.lock().iter().find(|s| s.id() == id).cloned()
    }
}

impl Default for MatchmakingRegistry {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

//! Match session state machine and physics loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::util::time::{Clock, SystemClock, DEFAULT_TICK_INTERVAL};
use crate::ws::protocol::{wire_coord, ServerMsg};

use super::physics::{advance_ball, Ball, FieldGeometry};
use super::slot::PlayerSlot;
use super::{opponent, SlotIndex, LEFT, RIGHT};

/// Session lifecycle. A finished session is dropped from the registry
/// rather than moving to a further state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotInitiated,
    WaitingForPlayer,
    InProgress,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session already has two players")]
    SessionFull,

    #[error("Session has already ended")]
    SessionEnded,

    #[error("Player slot already belongs to a session")]
    SlotAlreadyJoined,

    #[error("Failed to spawn physics thread: {0}")]
    LoopSpawn(#[from] std::io::Error),
}

/// Invoked once when the session ends, with the session id
pub type GameOverCallback = Box<dyn FnOnce(Uuid) + Send>;

/// Fixed per-session configuration
#[derive(Clone)]
pub struct SessionSettings {
    pub geometry: FieldGeometry,
    pub tick_interval: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            geometry: FieldGeometry::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Everything guarded by the session lock
struct SessionInner {
    state: SessionState,
    ended: bool,
    slots: [Option<Arc<PlayerSlot>>; 2],
    ball: Ball,
    score: [u32; 2],
    rng: ChaCha8Rng,
    on_game_over: Option<GameOverCallback>,
}

impl SessionInner {
    /// Send to both participants. Returns a side that could not keep up.
    fn broadcast(&self, msg: ServerMsg) -> Option<SlotIndex> {
        let mut stalled = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else {
                continue;
            };
            if !slot.send(msg.clone()) {
                stalled.get_or_insert(index);
            }
        }
        stalled
    }
}

/// One match between up to two players
pub struct MatchSession {
    id: Uuid,
    settings: SessionSettings,
    inner: Mutex<SessionInner>,
    /// Observed once per physics iteration
    cancelled: AtomicBool,
}

impl MatchSession {
    pub fn new(settings: SessionSettings, seed: u64) -> Arc<Self> {
        let ball = Ball::kickoff(&settings.geometry);
        Arc::new(Self {
            id: Uuid::new_v4(),
            settings,
            inner: Mutex::new(SessionInner {
                state: SessionState::NotInitiated,
                ended: false,
                slots: [None, None],
                ball,
                score: [0, 0],
                rng: ChaCha8Rng::seed_from_u64(seed),
                on_game_over: None,
            }),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_ended(&self) -> bool {
        self.inner.lock().ended
    }

    /// Still looking for a second player
    pub fn is_waiting(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == SessionState::WaitingForPlayer && !inner.ended
    }

    pub fn score(&self) -> [u32; 2] {
        self.inner.lock().score
    }

    pub fn ball(&self) -> Ball {
        self.inner.lock().ball
    }

    /// Register the callback fired when the session ends
    pub fn on_game_over(&self, callback: GameOverCallback) {
        self.inner.lock().on_game_over = Some(callback);
    }

    /// Seat a participant. The first gets the left paddle, the second the
    /// right one and starts the match.
    pub fn join(self: &Arc<Self>, slot: Arc<PlayerSlot>) -> Result<SlotIndex, SessionError> {
        let mut inner = self.inner.lock();

        if inner.ended {
            return Err(SessionError::SessionEnded);
        }

        let index = inner
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SessionError::SessionFull)?;

        if slot.index().is_some() {
            return Err(SessionError::SlotAlreadyJoined);
        }

        // Spawn before touching state so a failure leaves the session as it was.
        // The thread cannot tick until this lock is released.
        if index == RIGHT {
            let session = Arc::clone(self);
            thread::Builder::new()
                .name(format!("pong-physics-{}", self.id.simple()))
                .spawn(move || session.run_physics())?;
        }

        if !slot.attach(Arc::downgrade(self), index) {
            if index == RIGHT {
                self.cancelled.store(true, Ordering::Release);
            }
            return Err(SessionError::SlotAlreadyJoined);
        }

        // Fresh queue, cannot be full
        slot.send(ServerMsg::PlayerNumber {
            player_number: index as u8,
        });
        inner.slots[index] = Some(Arc::clone(&slot));

        if index == LEFT {
            inner.state = SessionState::WaitingForPlayer;
            info!(session_id = %self.id, slot_id = %slot.id(), "Player waiting for opponent");
        } else {
            inner.state = SessionState::InProgress;
            info!(session_id = %self.id, slot_id = %slot.id(), "Match started");
        }

        Ok(index)
    }

    /// Physics loop body. Runs on a dedicated thread until cancelled.
    fn run_physics(self: Arc<Self>) {
        debug!(session_id = %self.id, "Physics loop running");

        let clock = Arc::clone(&self.settings.clock);
        let mut last = clock.now();

        while !self.cancelled.load(Ordering::Acquire) {
            let now = clock.now();
            self.tick(now.saturating_duration_since(last));
            last = now;

            thread::sleep(self.settings.tick_interval);
        }

        debug!(session_id = %self.id, "Physics loop stopped");
    }

    /// Advance one tick. A participant who cannot keep up with the
    /// broadcasts is disconnected once the session lock is released.
    pub(crate) fn tick(&self, elapsed: Duration) {
        if let Some(stalled) = self.step(elapsed) {
            self.on_player_disconnected(stalled);
        }
    }

    /// Move the ball and broadcast the results, all under the session lock
    fn step(&self, elapsed: Duration) -> Option<SlotIndex> {
        let mut inner = self.inner.lock();

        if inner.ended || inner.state != SessionState::InProgress {
            return None;
        }

        let paddles = match &inner.slots {
            [Some(left), Some(right)] => [left.offset(), right.offset()],
            _ => return None,
        };

        let SessionInner { ball, score, rng, .. } = &mut *inner;
        let geometry = &self.settings.geometry;
        let outcome = advance_ball(ball, score, paddles, geometry, elapsed, rng);

        let mut stalled = None;
        if let Some(scorer) = outcome.scored {
            debug!(session_id = %self.id, scorer, score = ?inner.score, "Point scored");
            stalled = inner.broadcast(ServerMsg::Score { score: inner.score });
        }

        let position = inner.broadcast(ServerMsg::BallPosition {
            x_pos: wire_coord(outcome.position.x),
            y_pos: wire_coord(outcome.position.y),
        });
        stalled.or(position)
    }

    /// Relay a paddle move to the opponent
    pub fn on_player_moved(&self, index: SlotIndex, y_pos: f64) {
        let other = opponent(index);
        let delivered = {
            let inner = self.inner.lock();
            if inner.ended {
                return;
            }

            match &inner.slots[other] {
                Some(slot) => slot.send(ServerMsg::PlayerPosition {
                    y_pos: wire_coord(y_pos),
                }),
                None => true,
            }
        };

        if !delivered {
            self.on_player_disconnected(other);
        }
    }

    /// Stop the match: cancel physics, close the opponent, unregister.
    /// Later calls are no-ops.
    pub fn on_player_disconnected(&self, index: SlotIndex) {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.ended {
                return;
            }
            inner.ended = true;
            self.cancelled.store(true, Ordering::Release);

            if let Some(other) = &inner.slots[opponent(index)] {
                other.close();
            }

            info!(
                session_id = %self.id,
                slot = index,
                score = ?inner.score,
                "Player disconnected, ending match"
            );
            inner.on_game_over.take()
        };

        // Registry lock is taken after the session lock is released
        match callback {
            Some(callback) => callback(self.id),
            None => error!(session_id = %self.id, "Session ended without a game-over listener"),
        }
    }
}

//! Per-connection player slot

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

use super::{MatchSession, SlotIndex};

/// Messages a participant may fall behind before the connection is dropped
pub const OUTBOUND_CAPACITY: usize = 256;

/// Work for the connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMsg),
    /// Close the connection, telling the participant the match is over
    Close,
}

/// Owning session and the side assigned at join time
struct Seat {
    session: Weak<MatchSession>,
    index: SlotIndex,
}

/// One connected participant.
///
/// The paddle offset is written only by [`PlayerSlot::receive_loop`] and read
/// lock-free by the physics tick.
pub struct PlayerSlot {
    id: Uuid,
    /// f64 bits of the paddle center
    offset: AtomicU64,
    seat: OnceLock<Seat>,
    disconnected: AtomicBool,
    /// Set once the outbound queue overflowed; nothing is queued afterwards
    stalled: AtomicBool,
    /// Wakes the receive loop when the slot is torn down from the send side
    shutdown: Notify,
    outbound: mpsc::Sender<Outbound>,
}

impl PlayerSlot {
    /// Create a slot and the receiving end its writer task drains
    pub fn new(initial_offset: f64) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let slot = Arc::new(Self {
            id: Uuid::new_v4(),
            offset: AtomicU64::new(initial_offset.to_bits()),
            seat: OnceLock::new(),
            disconnected: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            shutdown: Notify::new(),
            outbound,
        });
        (slot, outbound_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current paddle center
    pub fn offset(&self) -> f64 {
        f64::from_bits(self.offset.load(Ordering::Acquire))
    }

    /// Side assigned by the session, once joined
    pub fn index(&self) -> Option<SlotIndex> {
        self.seat.get().map(|seat| seat.index)
    }

    /// Bind this slot to its session. Fails if it already belongs to one.
    pub(crate) fn attach(&self, session: Weak<MatchSession>, index: SlotIndex) -> bool {
        self.seat.set(Seat { session, index }).is_ok()
    }

    /// Queue a message for this participant.
    ///
    /// Returns `false` once the participant is [`OUTBOUND_CAPACITY`] messages
    /// behind. The slot is then stalled: later messages are refused and the
    /// receive loop stops, so the participant never sees a gap in the stream.
    /// Messages for a connection that is already gone are discarded.
    pub fn send(&self, msg: ServerMsg) -> bool {
        self.push(Outbound::Message(msg))
    }

    /// Ask the writer task to close the connection
    pub fn close(&self) {
        self.push(Outbound::Close);
    }

    /// Outbound queue overflowed
    pub fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::Acquire)
    }

    fn push(&self, outbound: Outbound) -> bool {
        if self.is_stalled() {
            return false;
        }

        match self.outbound.try_send(outbound) {
            Ok(()) | Err(TrySendError::Closed(_)) => true,
            Err(TrySendError::Full(_)) => {
                if !self.stalled.swap(true, Ordering::AcqRel) {
                    warn!(
                        slot_id = %self.id,
                        capacity = OUTBOUND_CAPACITY,
                        "Outbound queue full, dropping player"
                    );
                }
                self.shutdown.notify_one();
                false
            }
        }
    }

    /// Read paddle updates until the connection closes, sends garbage, or
    /// the slot stalls.
    ///
    /// This is the only place a slot's offset changes. Ends by notifying the
    /// session of the disconnect.
    pub async fn receive_loop<S, E>(self: Arc<Self>, mut frames: S)
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: std::fmt::Display,
    {
        loop {
            let frame = tokio::select! {
                frame = frames.next() => frame,
                _ = self.shutdown.notified() => {
                    debug!(slot_id = %self.id, "Slot stalled, stopping receive loop");
                    break;
                }
            };
            let Some(frame) = frame else {
                break;
            };

            match frame {
                Ok(Message::Text(text)) => match ClientMsg::parse(&text) {
                    Ok(msg) => self.moved(msg.y_pos),
                    Err(e) => {
                        warn!(slot_id = %self.id, error = %e, "Protocol error, dropping player");
                        break;
                    }
                },
                // Paddle updates are JSON text only
                Ok(Message::Binary(_)) => {
                    warn!(
                        slot_id = %self.id,
                        error = %ProtocolError::BinaryFrame,
                        "Protocol error, dropping player"
                    );
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    info!(slot_id = %self.id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    debug!(slot_id = %self.id, error = %e, "WebSocket error");
                    break;
                }
            }
        }

        self.disconnected();
    }

    fn moved(&self, y_pos: f64) {
        self.offset.store(y_pos.to_bits(), Ordering::Release);
        trace!(slot_id = %self.id, y_pos, "Paddle moved");

        if let Some((session, index)) = self.session() {
            session.on_player_moved(index, y_pos);
        }
    }

    /// Raise the disconnect notification, at most once per slot
    fn disconnected(&self) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some((session, index)) = self.session() {
            session.on_player_disconnected(index);
        }
    }

    fn session(&self) -> Option<(Arc<MatchSession>, SlotIndex)> {
        let seat = self.seat.get()?;
        seat.session.upgrade().map(|session| (session, seat.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frames(
        items: Vec<Result<Message, axum::Error>>,
    ) -> impl Stream<Item = Result<Message, axum::Error>> + Unpin {
        futures::stream::iter(items)
    }

    #[tokio::test]
    async fn paddle_updates_set_offset() {
        let (slot, _rx) = PlayerSlot::new(150.0);

        slot.clone()
            .receive_loop(frames(vec![
                Ok(Message::Text(r#"{"YPos":120}"#.to_string())),
                Ok(Message::Ping(vec![1])),
                Ok(Message::Text(r#"{"YPos":97.5}"#.to_string())),
            ]))
            .await;

        assert_eq!(slot.offset(), 97.5);
        assert!(slot.disconnected.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn malformed_frame_stops_receiving() {
        let (slot, _rx) = PlayerSlot::new(150.0);

        slot.clone()
            .receive_loop(frames(vec![
                Ok(Message::Text("not json".to_string())),
                Ok(Message::Text(r#"{"YPos":10}"#.to_string())),
            ]))
            .await;

        assert_eq!(slot.offset(), 150.0);
    }

    #[tokio::test]
    async fn binary_frame_is_a_protocol_error() {
        let (slot, _rx) = PlayerSlot::new(0.0);

        slot.clone()
            .receive_loop(frames(vec![
                Ok(Message::Binary(vec![1, 2, 3])),
                Ok(Message::Text(r#"{"YPos":10}"#.to_string())),
            ]))
            .await;

        assert_eq!(slot.offset(), 0.0);
    }

    #[test]
    fn send_after_writer_is_gone_is_ignored() {
        let (slot, rx) = PlayerSlot::new(0.0);
        drop(rx);

        slot.send(ServerMsg::PlayerPosition { y_pos: 1 });
        slot.close();
    }

    #[test]
    fn send_and_close_queue_in_order() {
        let (slot, mut rx) = PlayerSlot::new(0.0);

        slot.send(ServerMsg::PlayerNumber { player_number: 0 });
        slot.close();

        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Message(ServerMsg::PlayerNumber { player_number: 0 })
        );
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn overflowing_queue_stalls_the_slot() {
        let (slot, mut rx) = PlayerSlot::new(0.0);

        for _ in 0..OUTBOUND_CAPACITY {
            assert!(slot.send(ServerMsg::PlayerPosition { y_pos: 1 }));
        }
        assert!(!slot.is_stalled());
        assert!(!slot.send(ServerMsg::PlayerPosition { y_pos: 2 }));
        assert!(slot.is_stalled());

        // Room frees up, but the stream already has a gap
        rx.try_recv().unwrap();
        assert!(!slot.send(ServerMsg::PlayerPosition { y_pos: 3 }));

        let mut queued = 0;
        while let Ok(msg) = rx.try_recv() {
            assert_eq!(msg, Outbound::Message(ServerMsg::PlayerPosition { y_pos: 1 }));
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_CAPACITY - 1);
    }

    #[tokio::test]
    async fn stalled_slot_stops_receiving() {
        let (slot, _rx) = PlayerSlot::new(150.0);
        for _ in 0..=OUTBOUND_CAPACITY {
            slot.send(ServerMsg::PlayerPosition { y_pos: 1 });
        }

        // A connection that never sends anything
        let frames = futures::stream::pending::<Result<Message, axum::Error>>();
        tokio::time::timeout(Duration::from_secs(1), slot.clone().receive_loop(frames))
            .await
            .expect("receive loop kept running after the slot stalled");

        assert!(slot.disconnected.load(Ordering::Acquire));
    }

    #[test]
    fn attaches_only_once() {
        let (slot, _rx) = PlayerSlot::new(0.0);

        assert!(slot.index().is_none());
        assert!(slot.attach(Weak::new(), 1));
        assert!(!slot.attach(Weak::new(), 0));
        assert_eq!(slot.index(), Some(1));
    }
}

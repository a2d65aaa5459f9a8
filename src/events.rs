//! Event bus (C7, ADDED): a broadcast channel carrying everything an
//! observer (a logger, a spectator UI, a test harness) might want to
//! know about a running game, mirroring the way
//! `engine/events.rs` decouples engine internals from the Tauri event
//! emission layer via its own queueing structures. We use
//! `tokio::sync::broadcast` directly rather than reimplementing a queue,
//! since there's no rate-limited GUI surface to protect against here.

use crate::position::Move;
use crate::stall::{BotId, StallReason};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity; a lagging subscriber drops the oldest
/// events rather than applying backpressure to the game loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    MoveApplied { board: BoardId, mv: MoveRecord, ply: u32 },
    CaptureDelivered { to_board: BoardId, color: Color, piece: Role },
    StallEntered { bot: BotId, piece: Role, reason: StallReason },
    StallExited { bot: BotId, cause: StallExitCause },
    RequestIssued { by: BotId, piece: Role },
    RequestFulfilled { by: BotId },
    ChatLine { bot: BotId, text: String },
    GameOver { status: GameStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardId {
    A,
    B,
}

pub use shakmaty::Color;
pub use shakmaty::Role;

/// A move rendered to a plain string for event consumers that don't want
/// to depend on `shakmaty`/our `Move` type directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub uci: String,
}

impl From<&Move> for MoveRecord {
    fn from(mv: &Move) -> Self {
        MoveRecord { uci: mv.to_uci_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallExitCause {
    Timeout,
    ConditionResolved,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Checkmate { board: BoardId, winner: Color },
    Stalemate { board: BoardId },
    Resignation { board: BoardId, winner: Color },
    Aborted,
}

/// Thin wrapper around a `broadcast::Sender` so call sites don't need to
/// know the capacity constant or handle the "no subscribers" send error,
/// which is expected and harmless (nobody is listening yet).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Ignores the "no receivers" error: the bus has
    /// no way to know in advance whether anyone is watching, and that's
    /// fine — events are best-effort telemetry, not game state.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(GameEvent::GameOver { status: GameStatus::Aborted });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GameEvent::GameOver { status: GameStatus::Aborted }));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(GameEvent::GameOver { status: GameStatus::Aborted });
    }
}

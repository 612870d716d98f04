//! Hooks around a booking commit.

use async_trait::async_trait;

use crate::models::EventRecord;
use crate::types::id::{EventId, OwnerId};
use crate::types::seat::SeatId;

/// Seats that just became committed for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedSeats {
    /// Event that changed.
    pub event_id: EventId,
    /// Owner who committed.
    pub owner_id: OwnerId,
    /// Seats added by this commit.
    pub seats: Vec<SeatId>,
    /// Full committed set after the commit.
    pub all_committed: Vec<SeatId>,
}

/// Follows commits so in-memory state never trails the store.
///
/// Implemented by the lock manager. Every commit that reaches the store is
/// bracketed: [`commit_started`](Self::commit_started) runs before the
/// write, then exactly one of [`seats_committed`](Self::seats_committed) or
/// [`commit_abandoned`](Self::commit_abandoned) runs after it.
#[async_trait]
pub trait CommitListener: Send + Sync + 'static {
    /// Called before the store write. Until the matching completion call,
    /// `seats` must not be handed to anyone else.
    async fn commit_started(&self, _event: &EventRecord, _seats: &[SeatId]) {}

    /// Called once per successful commit, after the store write.
    async fn seats_committed(&self, commit: CommittedSeats);

    /// Called when a started commit wrote nothing (conflict or store error).
    async fn commit_abandoned(&self, _event_id: EventId, _seats: &[SeatId]) {}
}

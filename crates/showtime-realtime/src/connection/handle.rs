//! Individual WebSocket connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, mpsc, watch};

use showtime_core::types::{ConnectionId, OwnerId};

use crate::message::types::OutboundMessage;
use crate::session::state::SessionState;

/// Outbound queue item. Broadcasts share one allocation across receivers.
pub type Outbound = Arc<OutboundMessage>;

/// A handle to a single WebSocket connection.
///
/// Holds the sender for pushing messages to the client, the session state,
/// and liveness bookkeeping.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Owner identity used for lock ownership
    pub owner_id: OwnerId,
    /// Sender for outbound messages
    sender: mpsc::Sender<Outbound>,
    /// Session state. Held for the duration of each session operation so a
    /// connection's requests apply one at a time.
    pub session: Mutex<SessionState>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound request (pongs excluded)
    pub last_activity: RwLock<DateTime<Utc>>,
    /// Last pong received
    pub last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Flipped to `true` once when the connection is closed
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        id: ConnectionId,
        owner_id: OwnerId,
        sender: mpsc::Sender<Outbound>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            sender,
            session: Mutex::new(SessionState::Connected),
            connected_at: now,
            last_activity: RwLock::new(now),
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
            closed: watch::Sender::new(false),
        }
    }

    /// Queue a message without waiting.
    ///
    /// A full queue drops the message; a closed queue marks the connection
    /// dead. Returns whether the message was queued.
    pub fn send(&self, msg: Outbound) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Connection send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Queue a direct reply.
    pub fn reply(&self, msg: OutboundMessage) -> bool {
        self.send(Arc::new(msg))
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark the connection dead and wake everything waiting in [`Self::closed`].
    pub fn close(&self) {
        self.mark_dead();
        self.closed.send_replace(true);
    }

    /// Resolves once [`Self::close`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Update last activity timestamp
    pub async fn touch(&self, now: DateTime<Utc>) {
        *self.last_activity.write().await = now;
    }

    /// Record a pong response
    pub async fn record_pong(&self, now: DateTime<Utc>) {
        *self.last_pong.write().await = now;
    }
}

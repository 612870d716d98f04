//! Session manager: routes client requests and tears sessions down.
//!
//! Every operation runs with the connection's session state locked, so one
//! connection's requests apply in order. Teardown (leave, disconnect, idle
//! expiry, eviction) releases every lock the connection or its owner holds
//! in the watched event and removes the connection from its audience.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use showtime_core::error::AppError;
use showtime_core::traits::clock::Clock;
use showtime_core::types::{ConnectionId, EventId, OwnerId, SeatId};
use showtime_service::booking::{BookingService, CommitResult};

use crate::channel::broker::EventBroker;
use crate::connection::handle::{ConnectionHandle, Outbound};
use crate::connection::heartbeat::{HeartbeatConfig, HeartbeatExit, run_heartbeat};
use crate::connection::manager::{ConnectionManager, Registration};
use crate::lock::manager::LockManager;
use crate::lock::types::AcquireOutcome;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{validate_commit_size, validate_inbound};
use crate::metrics::EngineMetrics;

use super::state::SessionState;

/// Owns the session lifecycle of every connection.
#[derive(Debug)]
pub struct SessionManager {
    connections: Arc<ConnectionManager>,
    broker: Arc<EventBroker>,
    locks: Arc<LockManager>,
    bookings: BookingService,
    metrics: Arc<EngineMetrics>,
    clock: Arc<dyn Clock>,
    heartbeat: HeartbeatConfig,
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        connections: Arc<ConnectionManager>,
        broker: Arc<EventBroker>,
        locks: Arc<LockManager>,
        bookings: BookingService,
        metrics: Arc<EngineMetrics>,
        clock: Arc<dyn Clock>,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        Self {
            connections,
            broker,
            locks,
            bookings,
            metrics,
            clock,
            heartbeat,
        }
    }

    /// Opens a session for a new connection and starts its heartbeat.
    ///
    /// Older connections of the same owner beyond the per-owner limit are
    /// closed with reason `replaced`.
    pub async fn connect(
        self: &Arc<Self>,
        owner_id: Option<OwnerId>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<Outbound>) {
        let Registration {
            handle,
            receiver,
            evicted,
        } = self.connections.register(owner_id);

        for old in evicted {
            self.close_session(&old, "replaced").await;
        }

        let sessions = Arc::clone(self);
        let supervised = handle.clone();
        tokio::spawn(async move {
            let exit = run_heartbeat(
                supervised.clone(),
                sessions.heartbeat.clone(),
                sessions.clock.clone(),
            )
            .await;
            match exit {
                HeartbeatExit::Idle => sessions.close_session(&supervised, "idle").await,
                HeartbeatExit::PongTimeout => sessions.close_session(&supervised, "timeout").await,
                HeartbeatExit::Closed => {}
            }
        });

        (handle, receiver)
    }

    /// Processes one inbound text frame.
    ///
    /// Results and errors go back to the sender only; state changes reach
    /// the event's audience through the lock manager's broadcasts.
    pub async fn handle_inbound(&self, conn_id: ConnectionId, raw: &str) {
        let Some(handle) = self.connections.get(&conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };
        EngineMetrics::inc(&self.metrics.messages_received);

        if let Err(e) = validate_inbound(raw) {
            self.reply(&handle, error_reply(&e));
            return;
        }
        let msg = match deserialize_inbound(raw) {
            Ok(msg) => msg,
            Err(e) => {
                self.reply(
                    &handle,
                    OutboundMessage::error(
                        "INVALID_MESSAGE",
                        format!("Failed to parse message: {e}"),
                    ),
                );
                return;
            }
        };

        let now = self.clock.now();
        if matches!(msg, InboundMessage::Pong { .. }) {
            handle.record_pong(now).await;
            return;
        }
        handle.touch(now).await;

        let kind = msg.kind();
        let result = match msg {
            InboundMessage::Subscribe { event_id } => self.subscribe(&handle, event_id).await,
            InboundMessage::AcquireLock { event_id, seat_id } => {
                self.acquire_lock(&handle, event_id, &seat_id).await
            }
            InboundMessage::ReleaseLock { event_id, seat_id } => {
                self.release_lock(&handle, event_id, &seat_id).await
            }
            InboundMessage::Commit { event_id, seats } => {
                self.commit(&handle, event_id, &seats).await
            }
            InboundMessage::Leave { event_id } => self.leave(&handle, event_id).await,
            InboundMessage::Pong { .. } => Ok(()),
        };

        if let Err(e) = result {
            debug!(conn_id = %conn_id, request = kind, error = %e, "Request failed");
            self.reply(&handle, error_reply(&e));
        }
    }

    /// Starts watching an event, leaving the previous one first.
    pub async fn subscribe(
        &self,
        handle: &ConnectionHandle,
        event_id: EventId,
    ) -> Result<(), AppError> {
        let mut state = handle.session.lock().await;
        if state.is_terminal() {
            return Err(session_closed());
        }

        if let Some(previous) = state.event_id().filter(|prev| *prev != event_id) {
            self.release_event(handle, previous).await;
            *state = SessionState::Connected;
        }

        if !self.locks.is_loaded(event_id) {
            let event = self.bookings.get_event(event_id).await?;
            self.locks.load_event(&event).await;
        }

        let snapshot = self.locks.join(event_id, handle.id).await?;
        *state = SessionState::Subscribed(event_id);
        self.reply(handle, OutboundMessage::snapshot(snapshot));

        info!(conn_id = %handle.id, owner_id = %handle.owner_id, event_id = %event_id, "Session subscribed");
        Ok(())
    }

    /// Requests a soft lock on a seat of the watched event.
    pub async fn acquire_lock(
        &self,
        handle: &ConnectionHandle,
        event_id: EventId,
        raw_seat: &str,
    ) -> Result<(), AppError> {
        let state = handle.session.lock().await;
        require_subscribed(&state, event_id)?;
        let seat = SeatId::parse(raw_seat)?;

        let reply = match self
            .locks
            .acquire(event_id, &seat, &handle.owner_id, handle.id)
            .await?
        {
            AcquireOutcome::Granted(lock) => OutboundMessage::LockGranted {
                event_id,
                seat_id: seat,
                expires_at: lock.expires_at,
            },
            AcquireOutcome::Rejected(reason) => OutboundMessage::LockRejected {
                event_id,
                seat_id: seat,
                code: reason,
                reason: reason.message().to_string(),
            },
        };
        self.reply(handle, reply);
        Ok(())
    }

    /// Drops one of the caller's soft locks. Releasing a seat the caller
    /// does not hold does nothing.
    pub async fn release_lock(
        &self,
        handle: &ConnectionHandle,
        event_id: EventId,
        raw_seat: &str,
    ) -> Result<(), AppError> {
        let state = handle.session.lock().await;
        require_subscribed(&state, event_id)?;
        let seat = SeatId::parse(raw_seat)?;
        self.locks
            .release(event_id, &seat, &handle.owner_id, handle.id)
            .await?;
        Ok(())
    }

    /// Books seats of the watched event.
    pub async fn commit(
        &self,
        handle: &ConnectionHandle,
        event_id: EventId,
        seats: &[String],
    ) -> Result<(), AppError> {
        let state = handle.session.lock().await;
        require_subscribed(&state, event_id)?;
        validate_commit_size(seats)?;

        let reply = match self
            .bookings
            .commit(event_id, &handle.owner_id, seats)
            .await?
        {
            CommitResult::Booked(receipt) => OutboundMessage::CommitSucceeded {
                event_id,
                booking_id: receipt.booking_id,
                amount: receipt.amount,
                seats: receipt.seats,
            },
            CommitResult::Conflict { conflicting_seats } => {
                EngineMetrics::inc(&self.metrics.commits_conflicted);
                OutboundMessage::CommitConflict {
                    event_id,
                    conflicting_seats,
                }
            }
        };
        self.reply(handle, reply);
        Ok(())
    }

    /// Leaves the watched event and ends the session without a reply. A
    /// leave for another event is ignored.
    pub async fn leave(&self, handle: &ConnectionHandle, event_id: EventId) -> Result<(), AppError> {
        let mut state = handle.session.lock().await;
        if state.event_id() != Some(event_id) {
            debug!(conn_id = %handle.id, event_id = %event_id, "Leave for an event not watched, ignoring");
            return Ok(());
        }
        self.teardown(handle, &mut state).await;
        drop(state);

        self.connections.unregister(&handle.id);
        info!(conn_id = %handle.id, owner_id = %handle.owner_id, event_id = %event_id, "Session left");
        Ok(())
    }

    /// Tears a session down after its transport went away. Safe to call
    /// more than once.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        let mut state = handle.session.lock().await;
        self.teardown(handle, &mut state).await;
        drop(state);
        self.connections.unregister(&handle.id);
    }

    /// Ends a session from the server side, telling the client why.
    pub async fn close_session(&self, handle: &ConnectionHandle, reason: &str) {
        let mut state = handle.session.lock().await;
        if !state.is_terminal() {
            self.reply(handle, OutboundMessage::session_closed(reason));
            info!(conn_id = %handle.id, owner_id = %handle.owner_id, reason, "Session closed by server");
        }
        self.teardown(handle, &mut state).await;
        drop(state);
        self.connections.unregister(&handle.id);
    }

    /// Closes every session.
    pub async fn close_all(&self, reason: &str) {
        for handle in self.connections.all_connections() {
            self.close_session(&handle, reason).await;
        }
    }

    /// Direct reply to the connection that made a request.
    fn reply(&self, handle: &ConnectionHandle, msg: OutboundMessage) {
        if !self.broker.send(handle.id, msg) {
            debug!(conn_id = %handle.id, "Reply not delivered");
        }
    }

    async fn teardown(&self, handle: &ConnectionHandle, state: &mut SessionState) {
        debug!(conn_id = %handle.id, state = %state, "Tearing down session");
        if let Some(event_id) = state.event_id() {
            self.release_event(handle, event_id).await;
        }
        *state = SessionState::Disconnected;
    }

    async fn release_event(&self, handle: &ConnectionHandle, event_id: EventId) {
        match self.locks.leave(event_id, handle.id, &handle.owner_id).await {
            Ok(released) => {
                debug!(conn_id = %handle.id, event_id = %event_id, released, "Left event");
            }
            Err(e) => {
                warn!(conn_id = %handle.id, event_id = %event_id, error = %e, "Failed to leave event");
            }
        }
    }
}

fn require_subscribed(state: &SessionState, event_id: EventId) -> Result<(), AppError> {
    match state {
        SessionState::Disconnected => Err(session_closed()),
        SessionState::Subscribed(current) if *current == event_id => Ok(()),
        _ => Err(AppError::validation(format!(
            "Not subscribed to event {event_id}"
        ))),
    }
}

fn session_closed() -> AppError {
    AppError::conflict("Session is closed")
}

fn error_reply(err: &AppError) -> OutboundMessage {
    OutboundMessage::error(err.kind.to_string(), err.message.clone())
}

//! Lock manager: the only writer of soft-lock state.
//!
//! Each loaded event has its own lock table behind an async mutex. Every
//! operation on an event runs under that mutex, and the broadcasts it causes
//! are queued before the mutex is released, so all viewers see one order of
//! changes per event. No operation here performs I/O.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use showtime_core::error::AppError;
use showtime_core::models::EventRecord;
use showtime_core::traits::clock::Clock;
use showtime_core::traits::commit::{CommitListener, CommittedSeats};
use showtime_core::types::{ConnectionId, EventId, OwnerId, SeatId};

use crate::channel::broker::EventBroker;
use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;

use super::table::{EventLockTable, expiry};
use super::types::{AcquireOutcome, EventSnapshot, ReleaseFilter};

/// Coordinates soft locks for every loaded event.
#[derive(Debug)]
pub struct LockManager {
    tables: DashMap<EventId, Arc<Mutex<EventLockTable>>>,
    broker: Arc<EventBroker>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    metrics: Arc<EngineMetrics>,
}

impl LockManager {
    /// Creates a lock manager granting locks for `ttl`.
    pub fn new(
        broker: Arc<EventBroker>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            tables: DashMap::new(),
            broker,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            metrics,
        }
    }

    /// Loads an event, or advances the committed mirror of an already
    /// loaded one with the store's view.
    pub async fn load_event(&self, event: &EventRecord) {
        let table = self.table_or_load(event);
        let mut table = table.lock().await;
        table.merge_committed(&event.committed_seats);
        self.publish_locks(&mut table);
    }

    /// Whether the event has a lock table.
    pub fn is_loaded(&self, event_id: EventId) -> bool {
        self.tables.contains_key(&event_id)
    }

    /// Number of loaded events.
    pub fn loaded_events(&self) -> usize {
        self.tables.len()
    }

    /// Tries to lock `seat` for `owner_id`.
    ///
    /// Expired locks are swept first. A grant (new or refreshed) causes
    /// exactly one `locks_changed` broadcast.
    pub async fn acquire(
        &self,
        event_id: EventId,
        seat: &SeatId,
        owner_id: &OwnerId,
        connection_id: ConnectionId,
    ) -> Result<AcquireOutcome, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        self.sweep(&mut table);
        let now = self.clock.now();

        let outcome = table.acquire(seat, owner_id, connection_id, now, self.ttl)?;
        match &outcome {
            AcquireOutcome::Granted(lock) => {
                EngineMetrics::inc(&self.metrics.locks_granted);
                debug!(
                    event_id = %event_id,
                    seat = %seat,
                    owner_id = %owner_id,
                    expires_at = %lock.expires_at,
                    "Lock granted"
                );
            }
            AcquireOutcome::Rejected(reason) => {
                EngineMetrics::inc(&self.metrics.locks_rejected);
                debug!(event_id = %event_id, seat = %seat, owner_id = %owner_id, reason = %reason, "Lock rejected");
            }
        }

        self.publish_locks(&mut table);
        Ok(outcome)
    }

    /// Releases `seat` if held by `owner_id` or taken through
    /// `connection_id`. Returns whether a lock was removed.
    pub async fn release(
        &self,
        event_id: EventId,
        seat: &SeatId,
        owner_id: &OwnerId,
        connection_id: ConnectionId,
    ) -> Result<bool, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        self.sweep(&mut table);
        let now = self.clock.now();

        let released = table.release(seat, owner_id, connection_id, now)?;
        if released {
            EngineMetrics::inc(&self.metrics.locks_released);
            debug!(event_id = %event_id, seat = %seat, owner_id = %owner_id, "Lock released");
        }

        self.publish_locks(&mut table);
        Ok(released)
    }

    /// Releases every lock in the event selected by `filter`. Returns how
    /// many were removed.
    pub async fn release_all(
        &self,
        event_id: EventId,
        filter: &ReleaseFilter,
    ) -> Result<usize, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        let released = self.release_matching(&mut table, filter);
        self.publish_locks(&mut table);
        Ok(released)
    }

    /// Drops expired locks of one event. Returns how many.
    pub async fn sweep_expired(&self, event_id: EventId) -> Result<usize, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        let expired = self.sweep(&mut table);
        self.publish_locks(&mut table);
        Ok(expired)
    }

    /// Drops expired locks of every loaded event. Returns how many.
    pub async fn sweep_all(&self) -> usize {
        let tables: Vec<_> = self.tables.iter().map(|entry| entry.value().clone()).collect();
        let mut expired = 0;
        for table in tables {
            let mut table = table.lock().await;
            expired += self.sweep(&mut table);
            self.publish_locks(&mut table);
        }
        expired
    }

    /// Current committed seats and live locks of an event.
    pub async fn snapshot(&self, event_id: EventId) -> Result<EventSnapshot, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        self.sweep(&mut table);
        self.publish_locks(&mut table);
        Ok(table.snapshot(self.clock.now()))
    }

    /// Adds a connection to the event's audience and returns the snapshot
    /// it should start from.
    ///
    /// Both happen under the event's lock, so the connection receives every
    /// change made after the snapshot and none made before it.
    pub async fn join(
        &self,
        event_id: EventId,
        connection_id: ConnectionId,
    ) -> Result<EventSnapshot, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        self.sweep(&mut table);
        self.publish_locks(&mut table);
        self.broker.subscribe(event_id, connection_id);
        Ok(table.snapshot(self.clock.now()))
    }

    /// Removes a connection from the event's audience and releases every
    /// lock held by the connection or its owner there.
    pub async fn leave(
        &self,
        event_id: EventId,
        connection_id: ConnectionId,
        owner_id: &OwnerId,
    ) -> Result<usize, AppError> {
        let table = self.table(event_id)?;
        let mut table = table.lock().await;
        self.broker.unsubscribe_from(event_id, connection_id);
        let filter = ReleaseFilter::owner_or_connection(owner_id.clone(), connection_id);
        let released = self.release_matching(&mut table, &filter);
        self.publish_locks(&mut table);
        if released > 0 {
            debug!(event_id = %event_id, conn_id = %connection_id, released, "Released locks on leave");
        }
        Ok(released)
    }

    fn table_or_load(&self, event: &EventRecord) -> Arc<Mutex<EventLockTable>> {
        self.tables
            .entry(event.id)
            .or_insert_with(|| {
                info!(event_id = %event.id, "Event loaded into lock manager");
                Arc::new(Mutex::new(EventLockTable::new(event)))
            })
            .clone()
    }

    fn table(&self, event_id: EventId) -> Result<Arc<Mutex<EventLockTable>>, AppError> {
        self.tables
            .get(&event_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Event {event_id} is not loaded")))
    }

    fn sweep(&self, table: &mut EventLockTable) -> usize {
        let expired = table.sweep(self.clock.now());
        EngineMetrics::add(&self.metrics.locks_expired, expired);
        if expired > 0 {
            debug!(event_id = %table.event_id(), expired, "Swept expired locks");
        }
        expired
    }

    fn release_matching(&self, table: &mut EventLockTable, filter: &ReleaseFilter) -> usize {
        self.sweep(table);
        let released = table.release_matching(filter, self.clock.now());
        EngineMetrics::add(&self.metrics.locks_released, released);
        released
    }

    /// Broadcasts the lock map if the table changed since the last publish.
    fn publish_locks(&self, table: &mut EventLockTable) {
        if let Some(version) = table.take_change() {
            let event_id = table.event_id();
            self.broker.broadcast(
                event_id,
                OutboundMessage::LocksChanged {
                    event_id,
                    locks: table.lock_views(self.clock.now()),
                    version,
                },
            );
        }
    }
}

#[async_trait]
impl CommitListener for LockManager {
    /// Holds the seats as committing so no other owner can lock a seat the
    /// store may already have booked. Loads the event if nobody watches it
    /// yet, so a viewer arriving mid-commit sees the hold too.
    async fn commit_started(&self, event: &EventRecord, seats: &[SeatId]) {
        let table = self.table_or_load(event);
        let mut table = table.lock().await;
        table.merge_committed(&event.committed_seats);
        let now = self.clock.now();
        self.sweep(&mut table);
        table.begin_commit(seats, expiry(now, self.ttl));
        self.publish_locks(&mut table);
    }

    async fn seats_committed(&self, commit: CommittedSeats) {
        let Ok(table) = self.table(commit.event_id) else {
            debug!(event_id = %commit.event_id, "Commit for an event with no viewers");
            return;
        };
        let mut table = table.lock().await;
        let now = self.clock.now();
        self.sweep(&mut table);

        let held: usize = commit
            .seats
            .iter()
            .filter(|seat| table.lock(seat, now).is_some())
            .count();
        table.apply_commit(&commit.seats, &commit.all_committed);
        EngineMetrics::add(&self.metrics.locks_released, held);
        EngineMetrics::inc(&self.metrics.commits_succeeded);

        let event_id = commit.event_id;
        let version = table.next_version();
        self.broker.broadcast(
            event_id,
            OutboundMessage::CommittedSeatsChanged {
                event_id,
                committed_seats: table.committed_seats(),
                version,
            },
        );
        self.publish_locks(&mut table);

        debug!(
            event_id = %event_id,
            owner_id = %commit.owner_id,
            seats = commit.seats.len(),
            "Committed seats applied to lock table"
        );
    }

    async fn commit_abandoned(&self, event_id: EventId, seats: &[SeatId]) {
        let Ok(table) = self.table(event_id) else {
            return;
        };
        let mut table = table.lock().await;
        table.end_commit(seats);
        debug!(event_id = %event_id, seats = seats.len(), "Commit abandoned, seats free again");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use showtime_core::models::Pricing;
    use showtime_core::traits::clock::ManualClock;
    use showtime_core::types::SeatLayout;
    use tokio::sync::mpsc;

    use crate::connection::handle::{ConnectionHandle, Outbound};
    use crate::connection::pool::ConnectionPool;
    use crate::lock::types::RejectReason;

    use super::*;

    struct Fixture {
        manager: LockManager,
        pool: Arc<ConnectionPool>,
        clock: Arc<ManualClock>,
        event_id: EventId,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = Arc::new(ConnectionPool::new());
            let metrics = Arc::new(EngineMetrics::new());
            let broker = Arc::new(EventBroker::new(pool.clone(), metrics.clone()));
            let clock = Arc::new(ManualClock::new(Utc::now()));
            let manager = LockManager::new(broker, clock.clone(), Duration::from_secs(90), metrics);
            let event = EventRecord {
                id: showtime_core::types::EventId::new(),
                title: "Test".to_string(),
                starts_at: Utc::now(),
                layout: SeatLayout::new(10, 10).unwrap(),
                pricing: Pricing::flat(1000),
                committed_seats: BTreeSet::new(),
            };
            let event_id = event.id;
            manager.load_event(&event).await;
            Self {
                manager,
                pool,
                clock,
                event_id,
            }
        }

        async fn viewer(&self, owner: &str) -> (ConnectionId, OwnerId, mpsc::Receiver<Outbound>) {
            let (tx, rx) = mpsc::channel(32);
            let owner = OwnerId::parse(owner).unwrap();
            let handle = Arc::new(ConnectionHandle::new(
                ConnectionId::new(),
                owner.clone(),
                tx,
                self.clock.now(),
            ));
            let id = handle.id;
            self.pool.add(handle);
            self.manager.join(self.event_id, id).await.unwrap();
            (id, owner, rx)
        }
    }

    fn seat(raw: &str) -> SeatId {
        SeatId::parse(raw).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push((*msg).clone());
        }
        out
    }

    #[tokio::test]
    async fn test_contended_seat_single_grant_and_one_broadcast() {
        let fx = Fixture::new().await;
        let (c1, u1, mut rx1) = fx.viewer("u1").await;
        let (c2, u2, mut rx2) = fx.viewer("u2").await;

        let first = fx.manager.acquire(fx.event_id, &seat("D5"), &u1, c1).await.unwrap();
        let second = fx.manager.acquire(fx.event_id, &seat("D5"), &u2, c2).await.unwrap();

        assert!(matches!(first, AcquireOutcome::Granted(_)));
        assert_eq!(second, AcquireOutcome::Rejected(RejectReason::LockedByAnother));

        let seen = drain(&mut rx2);
        assert_eq!(seen.len(), 1);
        let OutboundMessage::LocksChanged { locks, version, .. } = &seen[0] else {
            panic!("expected locks_changed, got {seen:?}");
        };
        assert_eq!(locks[&seat("D5")].owner_id, u1);
        assert_eq!(*version, 1);
        assert_eq!(drain(&mut rx1).len(), 1);
    }

    #[tokio::test]
    async fn test_expired_lock_is_swept_and_regranted() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        let (c2, u2, mut rx2) = fx.viewer("u2").await;

        fx.manager.acquire(fx.event_id, &seat("D5"), &u1, c1).await.unwrap();
        fx.clock.advance(Duration::from_secs(91));
        let outcome = fx.manager.acquire(fx.event_id, &seat("D5"), &u2, c2).await.unwrap();

        assert!(matches!(outcome, AcquireOutcome::Granted(ref lock) if lock.owner_id == u2));
        let last = drain(&mut rx2).pop().unwrap();
        let OutboundMessage::LocksChanged { locks, .. } = last else {
            panic!("expected locks_changed");
        };
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[&seat("D5")].owner_id, u2);
    }

    #[tokio::test]
    async fn test_periodic_sweep_broadcasts_expiry() {
        let fx = Fixture::new().await;
        let (c1, u1, mut rx1) = fx.viewer("u1").await;
        fx.manager.acquire(fx.event_id, &seat("A1"), &u1, c1).await.unwrap();
        drain(&mut rx1);

        assert_eq!(fx.manager.sweep_all().await, 0);
        assert!(drain(&mut rx1).is_empty());

        fx.clock.advance(Duration::from_secs(90));
        assert_eq!(fx.manager.sweep_all().await, 1);
        let seen = drain(&mut rx1);
        assert!(matches!(&seen[..], [OutboundMessage::LocksChanged { locks, .. }] if locks.is_empty()));
    }

    #[tokio::test]
    async fn test_foreign_release_does_not_broadcast() {
        let fx = Fixture::new().await;
        let (c1, u1, mut rx1) = fx.viewer("u1").await;
        let (c2, u2, _rx2) = fx.viewer("u2").await;
        fx.manager.acquire(fx.event_id, &seat("B2"), &u1, c1).await.unwrap();
        drain(&mut rx1);

        let released = fx.manager.release(fx.event_id, &seat("B2"), &u2, c2).await.unwrap();
        assert!(!released);
        assert!(drain(&mut rx1).is_empty());

        let released = fx.manager.release(fx.event_id, &seat("B2"), &u1, c1).await.unwrap();
        assert!(released);
        assert_eq!(drain(&mut rx1).len(), 1);
    }

    #[tokio::test]
    async fn test_commit_clears_locks_and_broadcasts_in_order() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        let (_c2, _u2, mut rx2) = fx.viewer("u2").await;
        fx.manager.acquire(fx.event_id, &seat("C1"), &u1, c1).await.unwrap();
        fx.manager.acquire(fx.event_id, &seat("C2"), &u1, c1).await.unwrap();
        fx.manager.acquire(fx.event_id, &seat("C3"), &u1, c1).await.unwrap();
        drain(&mut rx2);

        fx.manager
            .seats_committed(CommittedSeats {
                event_id: fx.event_id,
                owner_id: u1.clone(),
                seats: vec![seat("C1"), seat("C2")],
                all_committed: vec![seat("C1"), seat("C2")],
            })
            .await;

        let seen = drain(&mut rx2);
        assert_eq!(seen.len(), 2);
        let OutboundMessage::CommittedSeatsChanged {
            committed_seats,
            version: committed_version,
            ..
        } = &seen[0]
        else {
            panic!("expected committed_seats_changed first");
        };
        assert_eq!(committed_seats, &vec![seat("C1"), seat("C2")]);
        let OutboundMessage::LocksChanged { locks, version, .. } = &seen[1] else {
            panic!("expected locks_changed second");
        };
        assert!(version > committed_version);
        assert_eq!(locks.keys().cloned().collect::<Vec<_>>(), vec![seat("C3")]);

        let outcome = fx.manager.acquire(fx.event_id, &seat("C1"), &u1, c1).await.unwrap();
        assert_eq!(outcome, AcquireOutcome::Rejected(RejectReason::AlreadyBooked));
    }

    #[tokio::test]
    async fn test_leave_releases_owner_and_connection_locks() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        let (c2, u2, mut rx2) = fx.viewer("u2").await;
        fx.manager.acquire(fx.event_id, &seat("A1"), &u1, c1).await.unwrap();
        fx.manager.acquire(fx.event_id, &seat("A2"), &u1, c1).await.unwrap();
        fx.manager.acquire(fx.event_id, &seat("A3"), &u2, c2).await.unwrap();
        drain(&mut rx2);

        let released = fx.manager.leave(fx.event_id, c1, &u1).await.unwrap();
        assert_eq!(released, 2);

        let snapshot = fx.manager.snapshot(fx.event_id).await.unwrap();
        assert_eq!(snapshot.locks.keys().cloned().collect::<Vec<_>>(), vec![seat("A3")]);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn test_release_all_by_connection_keeps_other_tabs() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        let (c1b, _, mut rx1b) = fx.viewer("u1").await;
        fx.manager.acquire(fx.event_id, &seat("G1"), &u1, c1).await.unwrap();
        fx.manager.acquire(fx.event_id, &seat("G2"), &u1, c1b).await.unwrap();
        drain(&mut rx1b);

        let released = fx
            .manager
            .release_all(fx.event_id, &ReleaseFilter::connection(c1))
            .await
            .unwrap();

        assert_eq!(released, 1);
        let seen = drain(&mut rx1b);
        assert!(matches!(&seen[..], [OutboundMessage::LocksChanged { locks, .. }]
            if locks.keys().cloned().collect::<Vec<_>>() == vec![seat("G2")]));
    }

    #[tokio::test]
    async fn test_sweep_expired_single_event() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        fx.manager.acquire(fx.event_id, &seat("H1"), &u1, c1).await.unwrap();
        fx.clock.advance(Duration::from_secs(30));
        fx.manager.acquire(fx.event_id, &seat("H2"), &u1, c1).await.unwrap();

        fx.clock.advance(Duration::from_secs(60));
        assert_eq!(fx.manager.sweep_expired(fx.event_id).await.unwrap(), 1);
        assert_eq!(fx.manager.sweep_expired(fx.event_id).await.unwrap(), 0);

        let snapshot = fx.manager.snapshot(fx.event_id).await.unwrap();
        assert_eq!(snapshot.locks.keys().cloned().collect::<Vec<_>>(), vec![seat("H2")]);
    }

    #[tokio::test]
    async fn test_unloaded_event_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx
            .manager
            .acquire(EventId::new(), &seat("A1"), &OwnerId::parse("u1").unwrap(), ConnectionId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, showtime_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_join_snapshot_reflects_current_state() {
        let fx = Fixture::new().await;
        let (c1, u1, _rx1) = fx.viewer("u1").await;
        fx.manager.acquire(fx.event_id, &seat("J4"), &u1, c1).await.unwrap();

        let (tx, _rx) = mpsc::channel(4);
        let late = Arc::new(ConnectionHandle::new(
            ConnectionId::new(),
            OwnerId::parse("u9").unwrap(),
            tx,
            fx.clock.now(),
        ));
        fx.pool.add(late.clone());
        let snapshot = fx.manager.join(fx.event_id, late.id).await.unwrap();

        assert_eq!(snapshot.version, 1);
        assert!(snapshot.locks.contains_key(&seat("J4")));
    }
}

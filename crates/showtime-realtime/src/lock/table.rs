//! Lock table for a single event.
//!
//! The table is plain synchronous state; the caller supplies `now` and
//! serializes access. Every mutation (sweeps included) marks the table
//! changed; [`EventLockTable::take_change`] turns pending changes into a new
//! version number for the next broadcast.
//!
//! Seats whose booking is being written are held as committing: nobody can
//! lock them until the write either lands or is abandoned.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use showtime_core::error::AppError;
use showtime_core::models::EventRecord;
use showtime_core::types::{ConnectionId, EventId, OwnerId, SeatId, SeatLayout};

use super::types::{AcquireOutcome, EventSnapshot, LockView, RejectReason, ReleaseFilter, SoftLock};

/// Soft locks and the committed-seat mirror of one event.
#[derive(Debug)]
pub struct EventLockTable {
    event_id: EventId,
    layout: SeatLayout,
    committed: BTreeSet<SeatId>,
    locks: HashMap<SeatId, SoftLock>,
    committing: HashMap<SeatId, Committing>,
    version: u64,
    changed: bool,
}

/// In-flight commits touching one seat.
#[derive(Debug, Clone, Copy)]
struct Committing {
    writers: usize,
    until: DateTime<Utc>,
}

/// `now + ttl`, saturating at the latest representable instant.
pub fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl EventLockTable {
    /// Creates a table primed with the event's committed seats.
    pub fn new(event: &EventRecord) -> Self {
        Self {
            event_id: event.id,
            layout: event.layout,
            committed: event.committed_seats.clone(),
            locks: HashMap::new(),
            committing: HashMap::new(),
            version: 0,
            changed: false,
        }
    }

    /// Event this table belongs to.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of lock entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the table holds no lock entries.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Removes every lock that is dead at `now`. Returns how many.
    ///
    /// Committing marks past their deadline are dropped too; they are not
    /// visible to viewers and are not counted.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        self.committing.retain(|_, c| c.until > now);
        let before = self.locks.len();
        self.locks.retain(|_, lock| lock.is_live(now));
        let removed = before - self.locks.len();
        if removed > 0 {
            self.changed = true;
        }
        removed
    }

    /// Grants, refreshes or refuses a lock on `seat`.
    ///
    /// A seat outside the layout is an input error and changes nothing.
    pub fn acquire(
        &mut self,
        seat: &SeatId,
        owner_id: &OwnerId,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<AcquireOutcome, AppError> {
        self.check_seat(seat)?;
        self.sweep(now);

        if self.committed.contains(seat) || self.committing.contains_key(seat) {
            return Ok(AcquireOutcome::Rejected(RejectReason::AlreadyBooked));
        }
        if self
            .locks
            .get(seat)
            .is_some_and(|existing| &existing.owner_id != owner_id)
        {
            return Ok(AcquireOutcome::Rejected(RejectReason::LockedByAnother));
        }

        let lock = SoftLock {
            seat: seat.clone(),
            owner_id: owner_id.clone(),
            connection_id,
            expires_at: expiry(now, ttl),
        };
        self.locks.insert(seat.clone(), lock.clone());
        self.changed = true;
        Ok(AcquireOutcome::Granted(lock))
    }

    /// Removes the lock on `seat` if it is held by `owner_id` or was taken
    /// through `connection_id`. Anything else is a no-op.
    pub fn release(
        &mut self,
        seat: &SeatId,
        owner_id: &OwnerId,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.check_seat(seat)?;
        self.sweep(now);

        let matches = self
            .locks
            .get(seat)
            .is_some_and(|lock| &lock.owner_id == owner_id || lock.connection_id == connection_id);
        if matches {
            self.locks.remove(seat);
            self.changed = true;
        }
        Ok(matches)
    }

    /// Removes every lock selected by `filter`. Returns how many.
    pub fn release_matching(&mut self, filter: &ReleaseFilter, now: DateTime<Utc>) -> usize {
        self.sweep(now);
        let before = self.locks.len();
        self.locks.retain(|_, lock| !filter.matches(lock));
        let removed = before - self.locks.len();
        if removed > 0 {
            self.changed = true;
        }
        removed
    }

    /// Holds `seats` as committing until `until` or the matching
    /// [`Self::end_commit`].
    pub fn begin_commit(&mut self, seats: &[SeatId], until: DateTime<Utc>) {
        for seat in seats {
            let entry = self
                .committing
                .entry(seat.clone())
                .or_insert(Committing { writers: 0, until });
            entry.writers += 1;
            entry.until = entry.until.max(until);
        }
    }

    /// Drops one commit's hold on `seats`.
    pub fn end_commit(&mut self, seats: &[SeatId]) {
        for seat in seats {
            if let Some(entry) = self.committing.get_mut(seat) {
                entry.writers = entry.writers.saturating_sub(1);
                if entry.writers == 0 {
                    self.committing.remove(seat);
                }
            }
        }
    }

    /// Whether a commit touching `seat` is in flight.
    pub fn is_committing(&self, seat: &SeatId) -> bool {
        self.committing.contains_key(seat)
    }

    /// Records newly committed seats and clears their locks for every owner.
    ///
    /// `all_committed` is the store's full set after the commit; it is merged
    /// so the mirror never shrinks. Ends the commit's hold on `seats`.
    pub fn apply_commit(&mut self, seats: &[SeatId], all_committed: &[SeatId]) {
        self.committed.extend(all_committed.iter().cloned());
        self.committed.extend(seats.iter().cloned());
        for seat in seats {
            self.locks.remove(seat);
        }
        self.end_commit(seats);
        self.changed = true;
    }

    /// Merges committed seats read from the store.
    pub fn merge_committed(&mut self, committed: &BTreeSet<SeatId>) {
        let before = self.committed.len();
        self.committed.extend(committed.iter().cloned());
        if self.committed.len() != before {
            let committed = &self.committed;
            self.locks.retain(|seat, _| !committed.contains(seat));
            self.changed = true;
        }
    }

    /// Whether `seat` is durably booked.
    pub fn is_committed(&self, seat: &SeatId) -> bool {
        self.committed.contains(seat)
    }

    /// Committed seats, sorted.
    pub fn committed_seats(&self) -> Vec<SeatId> {
        self.committed.iter().cloned().collect()
    }

    /// Live locks at `now`.
    pub fn lock_views(&self, now: DateTime<Utc>) -> BTreeMap<SeatId, LockView> {
        self.locks
            .iter()
            .filter(|(_, lock)| lock.is_live(now))
            .map(|(seat, lock)| (seat.clone(), lock.view()))
            .collect()
    }

    /// The live lock on `seat`, if any.
    pub fn lock(&self, seat: &SeatId, now: DateTime<Utc>) -> Option<&SoftLock> {
        self.locks.get(seat).filter(|lock| lock.is_live(now))
    }

    /// Snapshot at the current version.
    pub fn snapshot(&self, now: DateTime<Utc>) -> EventSnapshot {
        EventSnapshot {
            event_id: self.event_id,
            committed_seats: self.committed_seats(),
            locks: self.lock_views(now),
            version: self.version,
        }
    }

    /// Consumes pending changes, returning the new version if there were any.
    pub fn take_change(&mut self) -> Option<u64> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(self.next_version())
    }

    /// Allocates the next version for a broadcast.
    pub fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn check_seat(&self, seat: &SeatId) -> Result<(), AppError> {
        if self.layout.contains(seat) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Seat {seat} does not exist for this event"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use showtime_core::models::Pricing;

    use super::*;

    fn table() -> EventLockTable {
        EventLockTable::new(&EventRecord {
            id: EventId::new(),
            title: "Test".to_string(),
            starts_at: Utc::now(),
            layout: SeatLayout::new(10, 10).unwrap(),
            pricing: Pricing::flat(1000),
            committed_seats: BTreeSet::new(),
        })
    }

    fn seat(raw: &str) -> SeatId {
        SeatId::parse(raw).unwrap()
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::parse(raw).unwrap()
    }

    fn ttl() -> Duration {
        Duration::seconds(90)
    }

    #[test]
    fn test_exclusive_grant() {
        let mut table = table();
        let now = Utc::now();
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        let first = table.acquire(&seat("D5"), &owner("u1"), c1, now, ttl()).unwrap();
        assert!(matches!(first, AcquireOutcome::Granted(_)));

        let second = table.acquire(&seat("D5"), &owner("u2"), c2, now, ttl()).unwrap();
        assert_eq!(second, AcquireOutcome::Rejected(RejectReason::LockedByAnother));
        assert_eq!(table.lock(&seat("D5"), now).unwrap().owner_id, owner("u1"));
    }

    #[test]
    fn test_expired_lock_no_longer_blocks() {
        let mut table = table();
        let now = Utc::now();
        table
            .acquire(&seat("D5"), &owner("u1"), ConnectionId::new(), now, ttl())
            .unwrap();

        let later = now + Duration::seconds(91);
        let outcome = table
            .acquire(&seat("D5"), &owner("u2"), ConnectionId::new(), later, ttl())
            .unwrap();
        let AcquireOutcome::Granted(lock) = outcome else {
            panic!("expected grant after expiry");
        };
        assert_eq!(lock.owner_id, owner("u2"));
        assert_eq!(lock.expires_at, later + ttl());
    }

    #[test]
    fn test_lock_is_dead_exactly_at_expiry() {
        let mut table = table();
        let now = Utc::now();
        table
            .acquire(&seat("A1"), &owner("u1"), ConnectionId::new(), now, ttl())
            .unwrap();

        let at_expiry = now + ttl();
        assert!(table.lock(&seat("A1"), at_expiry).is_none());
        assert!(table.lock_views(at_expiry).is_empty());
        assert_eq!(table.sweep(at_expiry), 1);
    }

    #[test]
    fn test_same_owner_refreshes() {
        let mut table = table();
        let now = Utc::now();
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());
        table.acquire(&seat("C2"), &owner("u1"), c1, now, ttl()).unwrap();

        let later = now + Duration::seconds(60);
        let outcome = table.acquire(&seat("C2"), &owner("u1"), c2, later, ttl()).unwrap();
        let AcquireOutcome::Granted(lock) = outcome else {
            panic!("expected refresh");
        };
        assert_eq!(lock.expires_at, later + ttl());
        assert_eq!(lock.connection_id, c2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_committed_seat_is_rejected() {
        let mut table = table();
        let now = Utc::now();
        table.apply_commit(&[seat("B1")], &[seat("B1")]);

        let outcome = table
            .acquire(&seat("B1"), &owner("u1"), ConnectionId::new(), now, ttl())
            .unwrap();
        assert_eq!(outcome, AcquireOutcome::Rejected(RejectReason::AlreadyBooked));
    }

    #[test]
    fn test_acquire_release_round_trip() {
        let mut table = table();
        let now = Utc::now();
        let conn = ConnectionId::new();
        table.take_change();
        let before = table.lock_views(now);

        table.acquire(&seat("E7"), &owner("u1"), conn, now, ttl()).unwrap();
        assert!(table.release(&seat("E7"), &owner("u1"), conn, now).unwrap());

        assert_eq!(table.lock_views(now), before);
    }

    #[test]
    fn test_foreign_release_is_a_no_op() {
        let mut table = table();
        let now = Utc::now();
        table
            .acquire(&seat("E7"), &owner("u1"), ConnectionId::new(), now, ttl())
            .unwrap();
        table.take_change();

        let removed = table
            .release(&seat("E7"), &owner("u2"), ConnectionId::new(), now)
            .unwrap();
        assert!(!removed);
        assert!(table.lock(&seat("E7"), now).is_some());
        assert_eq!(table.take_change(), None);
    }

    #[test]
    fn test_release_unknown_seat_is_a_no_op() {
        let mut table = table();
        let removed = table
            .release(&seat("A1"), &owner("u1"), ConnectionId::new(), Utc::now())
            .unwrap();
        assert!(!removed);
    }

    #[test]
    fn test_seat_outside_layout_is_input_error() {
        let mut table = table();
        let err = table
            .acquire(&seat("Z1"), &owner("u1"), ConnectionId::new(), Utc::now(), ttl())
            .unwrap_err();
        assert_eq!(err.kind, showtime_core::error::ErrorKind::Validation);
        assert!(table.is_empty());
    }

    #[test]
    fn test_release_matching_owner_or_connection() {
        let mut table = table();
        let now = Utc::now();
        let (c1, c2, c3) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        table.acquire(&seat("A1"), &owner("u1"), c1, now, ttl()).unwrap();
        table.acquire(&seat("A2"), &owner("u1"), c2, now, ttl()).unwrap();
        table.acquire(&seat("A3"), &owner("u2"), c3, now, ttl()).unwrap();

        let removed = table.release_matching(&ReleaseFilter::owner_or_connection(owner("u1"), c1), now);
        assert_eq!(removed, 2);
        assert_eq!(table.lock_views(now).keys().cloned().collect::<Vec<_>>(), vec![seat("A3")]);

        assert_eq!(table.release_matching(&ReleaseFilter::default(), now), 0);
    }

    #[test]
    fn test_commit_clears_locks_for_committed_seats_only() {
        let mut table = table();
        let now = Utc::now();
        let conn = ConnectionId::new();
        table.acquire(&seat("F1"), &owner("u1"), conn, now, ttl()).unwrap();
        table.acquire(&seat("F2"), &owner("u1"), conn, now, ttl()).unwrap();
        table
            .acquire(&seat("F3"), &owner("u2"), ConnectionId::new(), now, ttl())
            .unwrap();

        table.apply_commit(&[seat("F1"), seat("F3")], &[seat("F1"), seat("F3")]);

        assert!(table.is_committed(&seat("F1")));
        assert!(table.lock(&seat("F1"), now).is_none());
        assert!(table.lock(&seat("F3"), now).is_none());
        assert!(table.lock(&seat("F2"), now).is_some());
    }

    #[test]
    fn test_committing_seat_is_held_until_commit_ends() {
        let mut table = table();
        let now = Utc::now();
        table.begin_commit(&[seat("G1"), seat("G2")], now + ttl());
        table.begin_commit(&[seat("G2")], now + ttl());

        let outcome = table
            .acquire(&seat("G1"), &owner("u2"), ConnectionId::new(), now, ttl())
            .unwrap();
        assert_eq!(outcome, AcquireOutcome::Rejected(RejectReason::AlreadyBooked));

        table.end_commit(&[seat("G1"), seat("G2")]);
        assert!(!table.is_committing(&seat("G1")));
        assert!(table.is_committing(&seat("G2")));
        let outcome = table
            .acquire(&seat("G1"), &owner("u2"), ConnectionId::new(), now, ttl())
            .unwrap();
        assert!(matches!(outcome, AcquireOutcome::Granted(_)));

        table.apply_commit(&[seat("G2")], &[seat("G2")]);
        assert!(!table.is_committing(&seat("G2")));
        assert!(table.is_committed(&seat("G2")));
    }

    #[test]
    fn test_stale_committing_mark_is_swept() {
        let mut table = table();
        let now = Utc::now();
        table.begin_commit(&[seat("H4")], now + ttl());
        table.take_change();

        let later = now + ttl();
        assert_eq!(table.sweep(later), 0);
        assert!(!table.is_committing(&seat("H4")));
        assert_eq!(table.take_change(), None);
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_overflowing() {
        let mut table = table();
        let outcome = table
            .acquire(&seat("A1"), &owner("u1"), ConnectionId::new(), Utc::now(), Duration::MAX)
            .unwrap();
        let AcquireOutcome::Granted(lock) = outcome else {
            panic!("expected grant");
        };
        assert_eq!(lock.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_versions_increase_per_change() {
        let mut table = table();
        let now = Utc::now();
        assert_eq!(table.take_change(), None);

        table
            .acquire(&seat("A1"), &owner("u1"), ConnectionId::new(), now, ttl())
            .unwrap();
        assert_eq!(table.take_change(), Some(1));
        assert_eq!(table.take_change(), None);
        assert_eq!(table.next_version(), 2);
        assert_eq!(table.snapshot(now).version, 2);
    }
}

//! # Reservation Service
//!
//! The facade the HTTP layer calls. One operation, one transaction.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  validate shape (no transaction yet)      ─► INVALID_INPUT / RANGE      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  BEGIN                                                                  │
//! │  first statement is a write (lock)        ─► other writers queue        │
//! │  read, check rules, detect conflicts      ─► NOT_FOUND / CONFLICT / ... │
//! │  write                                                                  │
//! │  COMMIT                                                                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  response                                                               │
//! │                                                                         │
//! │  Any error or timeout before COMMIT drops the transaction: rollback.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use fleetdesk_core::pricing::{self, Quote};
use fleetdesk_core::transition::{plan_cancel, plan_staff};
use fleetdesk_core::validation::{self, validate_create_request};
use fleetdesk_core::{
    CoreError, CreateReservationRequest, RentableUnit, Reservation, ReservationStatus,
    StatusChange, UnitConflict, ValidationError,
};
use fleetdesk_db::repository::{conflict, reservation, unit};
use fleetdesk_db::{ConflictScan, Database, DbError, NewLine, NewReservation};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::lifecycle;

/// Reservation lifecycle operations.
///
/// Cheap to clone; clones share the pool and the clock.
#[derive(Debug, Clone)]
pub struct ReservationService {
    db: Database,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
}

impl ReservationService {
    /// Creates a service over an existing database handle.
    pub fn new(db: Database, clock: Arc<dyn Clock>, request_timeout: Duration) -> Self {
        ReservationService {
            db,
            clock,
            request_timeout,
        }
    }

    /// Opens the database described by `config` (running migrations) and
    /// builds a service on the system clock.
    pub async fn connect(config: &ServiceConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(ReservationService::new(
            db,
            Arc::new(SystemClock),
            config.request_timeout,
        ))
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Customer operations
    // =========================================================================

    /// Books `req.unit_ids` over `[req.start, req.end)` for `customer_id`.
    ///
    /// The reservation starts `pending`; pending reservations do not block
    /// each other, only confirmed and active ones block.
    pub async fn create(
        &self,
        customer_id: &str,
        req: CreateReservationRequest,
    ) -> ServiceResult<Reservation> {
        self.run("create", self.create_inner(customer_id, req)).await
    }

    /// The caller's reservations, newest first; empty `statuses` means all.
    pub async fn list_mine(
        &self,
        customer_id: &str,
        statuses: &[ReservationStatus],
    ) -> ServiceResult<Vec<Reservation>> {
        self.run("list_mine", self.list_mine_inner(customer_id, statuses))
            .await
    }

    /// One reservation, visible to its owner and to staff.
    pub async fn get_by_id(
        &self,
        id: &str,
        caller_id: &str,
        caller_is_staff: bool,
    ) -> ServiceResult<Reservation> {
        self.run("get_by_id", self.get_by_id_inner(id, caller_id, caller_is_staff))
            .await
    }

    /// Cancels the caller's reservation before it starts.
    pub async fn cancel(&self, id: &str, caller_id: &str) -> ServiceResult<Reservation> {
        self.run("cancel", self.cancel_inner(id, caller_id)).await
    }

    // =========================================================================
    // Staff operations
    // =========================================================================

    /// Moves a reservation to `target` (confirmed, declined, active, completed).
    pub async fn staff_transition(
        &self,
        id: &str,
        target: ReservationStatus,
    ) -> ServiceResult<StatusChange> {
        self.run("staff_transition", self.staff_transition_inner(id, target))
            .await
    }

    // =========================================================================
    // Read-only helpers
    // =========================================================================

    /// Every (unit, reservation) pair that would block booking `unit_ids`
    /// over `[start, end)` right now. Not transactional; the answer may be
    /// stale by the time a booking is attempted.
    pub async fn check_availability(
        &self,
        unit_ids: &[String],
        start: &str,
        end: &str,
    ) -> ServiceResult<Vec<UnitConflict>> {
        self.run(
            "check_availability",
            self.check_availability_inner(unit_ids, start, end),
        )
        .await
    }

    /// Prices `unit_ids` over `[start, end)` without booking anything.
    pub async fn quote(&self, unit_ids: &[String], start: &str, end: &str) -> ServiceResult<Quote> {
        self.run("quote", self.quote_inner(unit_ids, start, end)).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Runs one operation under the request timeout and logs rejections.
    ///
    /// On timeout the operation future is dropped, and with it any open
    /// transaction, which rolls back.
    async fn run<T, F>(&self, operation: &'static str, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        let result = match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    operation,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(ServiceError::internal())
            }
        };

        if let Err(e) = &result {
            if e.kind != ErrorKind::Internal {
                warn!(operation, kind = ?e.kind, message = %e.message, "Request rejected");
            }
        }
        result
    }

    async fn list_mine_inner(
        &self,
        customer_id: &str,
        statuses: &[ReservationStatus],
    ) -> ServiceResult<Vec<Reservation>> {
        require_caller(customer_id)?;
        let mut conn = self.db.acquire().await?;
        let reservations = reservation::list_by_customer(&mut conn, customer_id, statuses).await?;
        Ok(reservations)
    }

    async fn get_by_id_inner(
        &self,
        id: &str,
        caller_id: &str,
        caller_is_staff: bool,
    ) -> ServiceResult<Reservation> {
        let mut conn = self.db.acquire().await?;
        let found = reservation::get_with_lines(&mut conn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation", id))?;

        if !caller_is_staff && !found.is_owned_by(caller_id) {
            return Err(CoreError::NotOwner {
                reservation_id: found.id,
            }
            .into());
        }
        Ok(found)
    }

    async fn check_availability_inner(
        &self,
        unit_ids: &[String],
        start: &str,
        end: &str,
    ) -> ServiceResult<Vec<UnitConflict>> {
        let (start, end) = parse_window(start, end)?;
        let unit_ids = validation::validate_unit_ids(unit_ids)?;

        let scan = ConflictScan::new(&unit_ids, start, end).all();
        let mut conn = self.db.acquire().await?;
        let hits = conflict::find_conflicts(&mut conn, &scan).await?;
        Ok(hits)
    }

    async fn quote_inner(&self, unit_ids: &[String], start: &str, end: &str) -> ServiceResult<Quote> {
        let (start, end) = parse_window(start, end)?;
        let unit_ids = validation::validate_unit_ids(unit_ids)?;

        let mut conn = self.db.acquire().await?;
        let units = unit::fetch_units(&mut conn, &unit_ids).await?;
        ensure_bookable(&unit_ids, &units)?;
        Ok(pricing::quote(&units, start, end)?)
    }

    async fn create_inner(
        &self,
        customer_id: &str,
        req: CreateReservationRequest,
    ) -> ServiceResult<Reservation> {
        require_caller(customer_id)?;
        let booking = validate_create_request(&req)?;

        let mut tx = self.db.begin().await?;

        unit::lock_units(&mut *tx, &booking.unit_ids).await?;
        let units = unit::fetch_units(&mut *tx, &booking.unit_ids).await?;
        ensure_bookable(&booking.unit_ids, &units)?;

        let quote = pricing::quote(&units, booking.start, booking.end)?;

        let scan = ConflictScan::new(&booking.unit_ids, booking.start, booking.end);
        if let Some(hit) = conflict::find_conflicts(&mut *tx, &scan)
            .await?
            .into_iter()
            .next()
        {
            return Err(ServiceError::conflict(hit));
        }

        let new = NewReservation {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            start_at: booking.start,
            end_at: booking.end,
            note: booking.note,
            lines: quote
                .lines
                .into_iter()
                .map(|line| NewLine {
                    unit_id: line.unit_id,
                    amount: line.amount,
                })
                .collect(),
            created_at: self.clock.now(),
        };

        let id = reservation::insert_reservation(&mut *tx, &new).await?;
        reservation::insert_lines(&mut *tx, &id, &new.lines).await?;
        let created = reservation::get_with_lines(&mut *tx, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", &id))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            reservation_id = %created.id,
            customer_id = %customer_id,
            units = created.lines.len(),
            total_cents = created.total_cents,
            "Reservation created"
        );
        Ok(created)
    }

    async fn cancel_inner(&self, id: &str, caller_id: &str) -> ServiceResult<Reservation> {
        require_caller(caller_id)?;

        let mut tx = self.db.begin().await?;
        let current = reservation::lock_for_update(&mut *tx, id).await?;

        let now = self.clock.now();
        let plan = plan_cancel(&current, caller_id, now)?;
        let updated = lifecycle::apply(&mut *tx, &current, &plan, now).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            reservation_id = %updated.id,
            from = %plan.from,
            "Reservation cancelled"
        );
        Ok(updated)
    }

    async fn staff_transition_inner(
        &self,
        id: &str,
        target: ReservationStatus,
    ) -> ServiceResult<StatusChange> {
        let mut tx = self.db.begin().await?;
        let current = reservation::lock_for_update(&mut *tx, id).await?;

        let plan = plan_staff(current.status, target)?;
        debug!(reservation_id = %id, transition = ?plan.transition, "Applying staff transition");

        let now = self.clock.now();
        let updated = lifecycle::apply(&mut *tx, &current, &plan, now).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            reservation_id = %updated.id,
            from = %plan.from,
            to = %plan.to,
            "Reservation status changed"
        );
        Ok(StatusChange {
            previous_status: plan.from,
            reservation: updated,
        })
    }
}

fn require_caller(caller_id: &str) -> ServiceResult<()> {
    if caller_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        }
        .into());
    }
    Ok(())
}

fn parse_window(start: &str, end: &str) -> ServiceResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = validation::parse_timestamp("start", start)?;
    let end = validation::parse_timestamp("end", end)?;
    validation::validate_window(start, end)?;
    Ok((start, end))
}

/// Every requested unit exists and is active.
fn ensure_bookable(requested: &[String], units: &[RentableUnit]) -> ServiceResult<()> {
    if let Some(missing) = requested
        .iter()
        .find(|id| !units.iter().any(|u| &u.id == *id))
    {
        return Err(ServiceError::not_found("Unit", missing));
    }

    if let Some(retired) = units.iter().find(|u| !u.is_active) {
        return Err(CoreError::UnitInactive {
            unit_id: retired.id.clone(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use fleetdesk_core::UnitStatus;
    use fleetdesk_db::DbConfig;
    use tempfile::TempDir;

    /// Start of every test window.
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    /// The clock starts a month before `t0`.
    fn clock_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn at(hours: i64) -> String {
        (t0() + ChronoDuration::hours(hours)).to_rfc3339()
    }

    struct Harness {
        svc: ReservationService,
        clock: Arc<FixedClock>,
        db: Database,
    }

    fn harness_on(db: Database, timeout: Duration) -> Harness {
        let clock = Arc::new(FixedClock::new(clock_start()));
        let svc = ReservationService::new(db.clone(), clock.clone(), timeout);
        Harness { svc, clock, db }
    }

    async fn harness() -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        harness_on(db, Duration::from_secs(10))
    }

    async fn file_harness(dir: &TempDir, timeout: Duration) -> Harness {
        let config = DbConfig::new(dir.path().join("fleetdesk.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();
        harness_on(db, timeout)
    }

    async fn add_unit(
        db: &Database,
        name: &str,
        per_hour: i64,
        per_day: Option<i64>,
        is_active: bool,
    ) -> String {
        let unit = RentableUnit {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price_per_hour_cents: per_hour,
            price_per_day_cents: per_day,
            is_active,
            status: UnitStatus::Available,
            created_at: clock_start(),
            updated_at: clock_start(),
        };
        insert_unit(db, unit).await
    }

    async fn insert_unit(db: &Database, unit: RentableUnit) -> String {
        let mut conn = db.acquire().await.unwrap();
        unit::insert_unit(&mut conn, &unit).await.unwrap();
        unit.id
    }

    async fn van(db: &Database) -> String {
        add_unit(db, "Van", 8_000, Some(50_000), true).await
    }

    fn request(units: &[&str], from_h: i64, to_h: i64) -> CreateReservationRequest {
        CreateReservationRequest {
            start: at(from_h),
            end: at(to_h),
            unit_ids: units.iter().map(|u| u.to_string()).collect(),
            note: None,
        }
    }

    async fn unit_status(db: &Database, id: &str) -> UnitStatus {
        let mut conn = db.acquire().await.unwrap();
        unit::get_unit(&mut conn, id).await.unwrap().unwrap().status
    }

    // -------------------------------------------------------------------------
    // create
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_prices_lines_and_persists() {
        let h = harness().await;
        let van = van(&h.db).await;
        let bike = add_unit(&h.db, "Bike", 2_000, None, true).await;

        let mut req = request(&[&van, &bike], 0, 48);
        req.note = Some("child seat".to_string());
        let r = h.svc.create("alice", req).await.unwrap();

        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.customer_id, "alice");
        assert_eq!(r.created_at, clock_start());
        assert_eq!(r.note.as_deref(), Some("child seat"));
        assert_eq!(r.lines.len(), 2);
        // 80/h + 500/day for 48h: 1000.00; 20/h for 48h: 960.00
        assert_eq!(r.lines[0].line_amount_cents, 100_000);
        assert_eq!(r.lines[1].line_amount_cents, 96_000);
        assert_eq!(r.total_cents, 196_000);
        assert_eq!(
            r.total_cents,
            r.lines.iter().map(|l| l.line_amount_cents).sum::<i64>()
        );

        let loaded = h.svc.get_by_id(&r.id, "alice", false).await.unwrap();
        assert_eq!(loaded.total_cents, r.total_cents);
        assert_eq!(loaded.unit_ids(), vec![van, bike]);
    }

    #[tokio::test]
    async fn test_create_conflicting_with_confirmed_persists_nothing() {
        let h = harness().await;
        let van = van(&h.db).await;

        let alice = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        h.svc
            .staff_transition(&alice.id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        let err = h
            .svc
            .create("bob", request(&[&van], 2, 6))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(
            err.conflict,
            Some(UnitConflict {
                unit_id: van.clone(),
                reservation_id: alice.id.clone(),
            })
        );
        assert!(h.svc.list_mine("bob", &[]).await.unwrap().is_empty());

        // retry after the confirmed window
        let retry = h.svc.create("bob", request(&[&van], 4, 6)).await.unwrap();
        assert_eq!(retry.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_pending_reservations_do_not_block_creation() {
        let h = harness().await;
        let van = van(&h.db).await;

        h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        h.svc.create("bob", request(&[&van], 1, 3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_touching_windows_can_both_be_confirmed() {
        let h = harness().await;
        let van = van(&h.db).await;

        let first = h.svc.create("alice", request(&[&van], 0, 2)).await.unwrap();
        let second = h.svc.create("bob", request(&[&van], 2, 4)).await.unwrap();

        for id in [&first.id, &second.id] {
            let change = h
                .svc
                .staff_transition(id, ReservationStatus::Confirmed)
                .await
                .unwrap();
            assert_eq!(change.reservation.status, ReservationStatus::Confirmed);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_before_touching_the_database() {
        let h = harness().await;
        let van = van(&h.db).await;

        let cases = [
            (request(&[], 0, 2), ErrorKind::InvalidInput),
            (request(&[&van, &van], 0, 2), ErrorKind::InvalidInput),
            (request(&["  "], 0, 2), ErrorKind::InvalidInput),
            (request(&[&van], 2, 2), ErrorKind::InvalidRange),
            (request(&[&van], 3, 1), ErrorKind::InvalidRange),
            (
                CreateReservationRequest {
                    start: "next tuesday".to_string(),
                    ..request(&[&van], 0, 2)
                },
                ErrorKind::InvalidInput,
            ),
            (
                CreateReservationRequest {
                    note: Some("x".repeat(fleetdesk_core::MAX_NOTE_LENGTH + 1)),
                    ..request(&[&van], 0, 2)
                },
                ErrorKind::InvalidInput,
            ),
        ];

        for (req, kind) in cases {
            let err = h.svc.create("alice", req).await.unwrap_err();
            assert_eq!(err.kind, kind, "{}", err.message);
        }

        let err = h
            .svc
            .create("", request(&[&van], 0, 2))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);

        assert!(h.svc.list_mine("alice", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_ids_are_opaque() {
        let h = harness().await;
        let unit = RentableUnit {
            id: "42".to_string(),
            name: "Cargo bike".to_string(),
            price_per_hour_cents: 1_500,
            price_per_day_cents: None,
            is_active: true,
            status: UnitStatus::Available,
            created_at: clock_start(),
            updated_at: clock_start(),
        };
        let id = insert_unit(&h.db, unit).await;
        let ids = vec![" 42 ".to_string()];

        let quote = h.svc.quote(&ids, &at(0), &at(2)).await.unwrap();
        assert_eq!(quote.total.cents(), 3_000);

        let r = h.svc.create("alice", request(&[" 42 "], 0, 2)).await.unwrap();
        assert_eq!(r.lines[0].unit_id, id);
        assert_eq!(r.total_cents, 3_000);
        h.svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        let hits = h.svc.check_availability(&ids, &at(1), &at(3)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].unit_id, "42");
        assert_eq!(hits[0].reservation_id, r.id);
    }

    #[tokio::test]
    async fn test_create_with_missing_or_inactive_unit() {
        let h = harness().await;
        let van = van(&h.db).await;
        let retired = add_unit(&h.db, "Old van", 5_000, None, false).await;
        let ghost = Uuid::new_v4().to_string();

        let err = h
            .svc
            .create("alice", request(&[&van, &ghost], 0, 2))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains(&ghost));

        let err = h
            .svc
            .create("alice", request(&[&van, &retired], 0, 2))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Inactive);

        assert!(h.svc.list_mine("alice", &[]).await.unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // staff transitions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_transitions_change_nothing() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();

        let err = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);

        for target in [ReservationStatus::Pending, ReservationStatus::Cancelled] {
            let err = h.svc.staff_transition(&r.id, target).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidTransition);
        }

        let change = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(change.previous_status, ReservationStatus::Pending);

        let err = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);

        let loaded = h.svc.get_by_id(&r.id, "staff", true).await.unwrap();
        assert_eq!(loaded.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_declined_is_terminal() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();

        h.svc
            .staff_transition(&r.id, ReservationStatus::Declined)
            .await
            .unwrap();
        let err = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_transition_on_missing_reservation() {
        let h = harness().await;
        let err = h
            .svc
            .staff_transition("nope", ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_confirm_rechecks_availability() {
        let h = harness().await;
        let van = van(&h.db).await;
        let a = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        let b = h.svc.create("bob", request(&[&van], 2, 6)).await.unwrap();

        h.svc
            .staff_transition(&a.id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        let err = h
            .svc
            .staff_transition(&b.id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(
            err.conflict.map(|c| c.reservation_id),
            Some(a.id.clone())
        );

        let b = h.svc.get_by_id(&b.id, "bob", false).await.unwrap();
        assert_eq!(b.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_full_lifecycle_moves_units() {
        let h = harness().await;
        let van = van(&h.db).await;
        let bike = add_unit(&h.db, "Bike", 2_000, None, true).await;
        let r = h
            .svc
            .create("alice", request(&[&van, &bike], 0, 4))
            .await
            .unwrap();

        h.svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(unit_status(&h.db, &van).await, UnitStatus::Available);

        h.clock.set(t0());
        let change = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Active)
            .await
            .unwrap();
        assert_eq!(change.previous_status, ReservationStatus::Confirmed);
        assert_eq!(change.reservation.updated_at, t0());
        assert_eq!(unit_status(&h.db, &van).await, UnitStatus::InUse);
        assert_eq!(unit_status(&h.db, &bike).await, UnitStatus::InUse);

        let change = h
            .svc
            .staff_transition(&r.id, ReservationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(change.reservation.status, ReservationStatus::Completed);
        assert_eq!(change.reservation.total_cents, r.total_cents);
        assert_eq!(unit_status(&h.db, &van).await, UnitStatus::Available);
        assert_eq!(unit_status(&h.db, &bike).await, UnitStatus::Available);
    }

    // -------------------------------------------------------------------------
    // cancel
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_rules() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();

        let err = h.svc.cancel(&r.id, "bob").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let cancelled = h.svc.cancel(&r.id, "alice").await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let err = h.svc.cancel(&r.id, "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);

        let err = h.svc.cancel("nope", "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancel_at_or_after_start_is_too_late() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        h.svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        h.clock.set(t0());
        let err = h.svc.cancel(&r.id, "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooLate);

        h.clock.advance(ChronoDuration::hours(1));
        let err = h.svc.cancel(&r.id, "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooLate);

        let loaded = h.svc.get_by_id(&r.id, "alice", false).await.unwrap();
        assert_eq!(loaded.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_cancel_active_releases_units() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        h.svc
            .staff_transition(&r.id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        // early pick-up, a minute before the window opens
        h.clock.set(t0() - ChronoDuration::minutes(1));
        h.svc
            .staff_transition(&r.id, ReservationStatus::Active)
            .await
            .unwrap();
        assert_eq!(unit_status(&h.db, &van).await, UnitStatus::InUse);

        let cancelled = h.svc.cancel(&r.id, "alice").await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(unit_status(&h.db, &van).await, UnitStatus::Available);
    }

    // -------------------------------------------------------------------------
    // reads
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_by_id_visibility() {
        let h = harness().await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();

        assert!(h.svc.get_by_id(&r.id, "alice", false).await.is_ok());
        assert!(h.svc.get_by_id(&r.id, "clerk", true).await.is_ok());

        let err = h.svc.get_by_id(&r.id, "bob", false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let err = h.svc.get_by_id("nope", "clerk", true).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_mine_newest_first_and_filtered() {
        let h = harness().await;
        let van = van(&h.db).await;

        let first = h.svc.create("alice", request(&[&van], 0, 2)).await.unwrap();
        h.clock.advance(ChronoDuration::minutes(5));
        let second = h.svc.create("alice", request(&[&van], 4, 6)).await.unwrap();
        h.svc.create("bob", request(&[&van], 8, 10)).await.unwrap();
        h.svc
            .staff_transition(&first.id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        let all = h.svc.list_mine("alice", &[]).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert!(all.iter().all(|r| !r.lines.is_empty()));

        let pending = h
            .svc
            .list_mine("alice", &[ReservationStatus::Pending])
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);

        assert!(h.svc.list_mine("carol", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_availability_lists_every_blocking_hit() {
        let h = harness().await;
        let van = van(&h.db).await;
        let bike = add_unit(&h.db, "Bike", 2_000, None, true).await;

        let a = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        let b = h.svc.create("bob", request(&[&bike], 6, 8)).await.unwrap();
        h.svc.create("carol", request(&[&van], 10, 12)).await.unwrap();
        for id in [&a.id, &b.id] {
            h.svc
                .staff_transition(id, ReservationStatus::Confirmed)
                .await
                .unwrap();
        }

        let ids = vec![van.clone(), bike.clone()];
        let hits = h
            .svc
            .check_availability(&ids, &at(0), &at(24))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].reservation_id, a.id);
        assert_eq!(hits[1].reservation_id, b.id);

        let free = h
            .svc
            .check_availability(&ids, &at(4), &at(6))
            .await
            .unwrap();
        assert!(free.is_empty());

        let err = h
            .svc
            .check_availability(&ids, &at(6), &at(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRange);
    }

    #[tokio::test]
    async fn test_quote_matches_create_without_booking() {
        let h = harness().await;
        let van = van(&h.db).await;
        let ids = vec![van.clone()];

        let quote = h.svc.quote(&ids, &at(0), &at(48)).await.unwrap();
        assert_eq!(quote.billable_hours, 48);
        assert_eq!(quote.total.cents(), 100_000);
        assert!(h.svc.list_mine("alice", &[]).await.unwrap().is_empty());

        let r = h.svc.create("alice", request(&[&van], 0, 48)).await.unwrap();
        assert_eq!(r.total_cents, quote.total.cents());

        let err = h
            .svc
            .quote(&[Uuid::new_v4().to_string()], &at(0), &at(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    // -------------------------------------------------------------------------
    // concurrency and timeouts (file-backed, several connections)
    // -------------------------------------------------------------------------

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_operation_futures_can_be_spawned() {
        let h = harness().await;
        let ids = vec!["any".to_string()];

        assert_send(&h.svc.create("alice", request(&["any"], 0, 4)));
        assert_send(&h.svc.list_mine("alice", &[]));
        assert_send(&h.svc.get_by_id("r", "alice", false));
        assert_send(&h.svc.cancel("r", "alice"));
        assert_send(&h.svc.staff_transition("r", ReservationStatus::Confirmed));
        assert_send(&h.svc.check_availability(&ids, &at(0), &at(4)));
        assert_send(&h.svc.quote(&ids, &at(0), &at(4)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_confirms_exactly_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let h = file_harness(&dir, Duration::from_secs(10)).await;
        let van = van(&h.db).await;
        let r = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let svc = h.svc.clone();
                let id = r.id.clone();
                tokio::spawn(async move {
                    svc.staff_transition(&id, ReservationStatus::Confirmed).await
                })
            })
            .collect();

        let mut won = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(change) => {
                    assert_eq!(change.previous_status, ReservationStatus::Pending);
                    won += 1;
                }
                Err(e) => assert_eq!(e.kind, ErrorKind::InvalidTransition, "{}", e.message),
            }
        }
        assert_eq!(won, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_confirms_of_overlapping_reservations() {
        let dir = tempfile::tempdir().unwrap();
        let h = file_harness(&dir, Duration::from_secs(10)).await;
        let van = van(&h.db).await;
        let a = h.svc.create("alice", request(&[&van], 0, 4)).await.unwrap();
        let b = h.svc.create("bob", request(&[&van], 2, 6)).await.unwrap();

        let tasks: Vec<_> = [a.id.clone(), b.id.clone()]
            .into_iter()
            .map(|id| {
                let svc = h.svc.clone();
                tokio::spawn(async move {
                    svc.staff_transition(&id, ReservationStatus::Confirmed).await
                })
            })
            .collect();

        let mut won = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => won += 1,
                Err(e) => assert_eq!(e.kind, ErrorKind::Conflict, "{}", e.message),
            }
        }
        assert_eq!(won, 1);

        let ids = vec![van];
        let hits = h
            .svc
            .check_availability(&ids, &at(0), &at(6))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_reports_internal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let h = file_harness(&dir, Duration::from_millis(200)).await;
        let van = van(&h.db).await;

        // another writer holds the write lock past the request timeout
        let mut blocker = h.db.begin().await.unwrap();
        unit::lock_units(&mut *blocker, &[van.clone()]).await.unwrap();

        let err = h
            .svc
            .create("alice", request(&[&van], 0, 4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);

        drop(blocker);
        assert!(h.svc.list_mine("alice", &[]).await.unwrap().is_empty());

        let patient = ReservationService::new(h.db.clone(), h.clock.clone(), Duration::from_secs(10));
        patient
            .create("alice", request(&[&van], 0, 4))
            .await
            .unwrap();
    }
}

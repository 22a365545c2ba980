//! # Conflict Detection
//!
//! Finds units that another reservation already holds for an overlapping window.
//!
//! ## Overlap Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Windows are half-open [start, end).                                    │
//! │                                                                         │
//! │  existing.start_at < requested.end  AND  requested.start < existing.end_at
//! │                                                                         │
//! │  existing   [=======)                                                   │
//! │  requested          [=======)     touching: no conflict                 │
//! │  requested      [=======)         overlapping: conflict                 │
//! │                                                                         │
//! │  Only reservations in a blocking status count (confirmed, active).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The query only reads. A caller that gates a write on its answer must
//! already hold the write lock (`unit::lock_units` or
//! `reservation::lock_for_update`) in the same transaction.

use chrono::{DateTime, Utc};
use fleetdesk_core::{ReservationStatus, UnitConflict, BLOCKING_STATUSES};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::db_timestamp;
use crate::error::DbResult;

/// How much of the conflict set to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Stop at the first hit; enough to reject a booking.
    #[default]
    FirstOnly,
    /// Every (unit, reservation) pair; for availability views.
    All,
}

/// Parameters of one conflict query.
#[derive(Debug, Clone, Copy)]
pub struct ConflictScan<'a> {
    pub unit_ids: &'a [String],
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Statuses that hold a unit; [`BLOCKING_STATUSES`] by default.
    pub blocking: &'a [ReservationStatus],
    /// Reservation left out of the search (the one being transitioned).
    pub exclude: Option<&'a str>,
    pub mode: ScanMode,
}

impl<'a> ConflictScan<'a> {
    /// First-hit scan of `unit_ids` over `[start, end)` against blocking reservations.
    pub fn new(unit_ids: &'a [String], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        ConflictScan {
            unit_ids,
            start,
            end,
            blocking: BLOCKING_STATUSES,
            exclude: None,
            mode: ScanMode::FirstOnly,
        }
    }

    /// Leaves `reservation_id` out of the search.
    pub fn excluding(mut self, reservation_id: &'a str) -> Self {
        self.exclude = Some(reservation_id);
        self
    }

    /// Returns every conflicting pair instead of the first one.
    pub fn all(mut self) -> Self {
        self.mode = ScanMode::All;
        self
    }

    /// Overrides the statuses that count as holding a unit.
    pub fn blocking(mut self, statuses: &'a [ReservationStatus]) -> Self {
        self.blocking = statuses;
        self
    }
}

/// Runs a conflict scan.
///
/// Hits are ordered by the existing reservation's start, then unit id.
/// No query is issued when there are no units or no blocking statuses.
pub async fn find_conflicts(
    conn: &mut SqliteConnection,
    scan: &ConflictScan<'_>,
) -> DbResult<Vec<UnitConflict>> {
    if scan.unit_ids.is_empty() || scan.blocking.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT rl.unit_id, r.id AS reservation_id \
         FROM reservation_lines rl \
         JOIN reservations r ON r.id = rl.reservation_id \
         WHERE rl.unit_id IN (",
    );
    let mut units_sep = qb.separated(", ");
    for id in scan.unit_ids {
        units_sep.push_bind(id.as_str());
    }
    units_sep.push_unseparated(") AND r.status IN (");

    let mut status_sep = qb.separated(", ");
    for status in scan.blocking {
        status_sep.push_bind(*status);
    }
    status_sep.push_unseparated(")");

    qb.push(" AND r.start_at < ")
        .push_bind(db_timestamp(scan.end))
        .push(" AND ")
        .push_bind(db_timestamp(scan.start))
        .push(" < r.end_at");

    if let Some(exclude) = scan.exclude {
        qb.push(" AND r.id <> ").push_bind(exclude);
    }

    qb.push(" ORDER BY r.start_at, rl.unit_id");
    if scan.mode == ScanMode::FirstOnly {
        qb.push(" LIMIT 1");
    }

    let hits: Vec<UnitConflict> = qb.build_query_as().fetch_all(&mut *conn).await?;

    debug!(
        units = scan.unit_ids.len(),
        mode = ?scan.mode,
        hits = hits.len(),
        "Conflict scan"
    );
    Ok(hits)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Reservation Store
//!
//! Persistence of reservations and their lines.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREATE (one transaction, opened by the caller)                         │
//! │     unit::lock_units ─► checks ─► insert_reservation ─► insert_lines    │
//! │                                                                         │
//! │  TRANSITION (one transaction, opened by the caller)                     │
//! │     lock_for_update ─► checks ─► update_status [─► unit side effect]    │
//! │                                                                         │
//! │  Lines are written once at creation and never updated.                  │
//! │  Reservations are never deleted.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use fleetdesk_core::{Money, Reservation, ReservationLine, ReservationStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::debug;

use super::db_timestamp;
use crate::error::{DbError, DbResult};

const RESERVATION_COLUMNS: &str = "id, customer_id, start_at, end_at, status, \
     total_cents, note, created_at, updated_at";

/// A priced line to be written with a new reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub unit_id: String,
    pub amount: Money,
}

/// A reservation about to be created; always starts `pending`.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub id: String,
    pub customer_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub note: Option<String>,
    pub lines: Vec<NewLine>,
    pub created_at: DateTime<Utc>,
}

impl NewReservation {
    /// Sum of the line amounts, `None` on overflow.
    pub fn total(&self) -> Option<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.amount))
    }
}

/// Inserts the reservation row (status `pending`, total = sum of lines).
///
/// Lines are written separately with [`insert_lines`], in the same transaction.
pub async fn insert_reservation(
    conn: &mut SqliteConnection,
    new: &NewReservation,
) -> DbResult<String> {
    let total = new
        .total()
        .ok_or_else(|| DbError::Internal("reservation total overflows".to_string()))?;

    debug!(
        reservation_id = %new.id,
        customer_id = %new.customer_id,
        total_cents = total.cents(),
        "Inserting reservation"
    );

    let created_at = db_timestamp(new.created_at);

    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, customer_id, start_at, end_at, status,
            total_cents, note, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(&new.id)
    .bind(&new.customer_id)
    .bind(db_timestamp(new.start_at))
    .bind(db_timestamp(new.end_at))
    .bind(ReservationStatus::Pending)
    .bind(total.cents())
    .bind(new.note.as_deref())
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(new.id.clone())
}

/// Writes all lines of a reservation in one multi-row `INSERT`.
pub async fn insert_lines(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    lines: &[NewLine],
) -> DbResult<()> {
    if lines.is_empty() {
        return Ok(());
    }

    debug!(reservation_id = %reservation_id, count = lines.len(), "Inserting reservation lines");

    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO reservation_lines (reservation_id, unit_id, line_amount_cents) ",
    );
    qb.push_values(lines, |mut row, line| {
        row.push_bind(reservation_id)
            .push_bind(line.unit_id.as_str())
            .push_bind(line.amount.cents());
    });
    qb.build().execute(&mut *conn).await?;

    Ok(())
}

/// Gets a reservation and its lines.
pub async fn get_with_lines(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Reservation>> {
    fetch_with_lines(&mut *conn, id).await
}

/// Lists a customer's reservations, newest first.
///
/// An empty `statuses` slice means every status. Reservations created at the
/// same instant come back in reverse insertion order.
pub async fn list_by_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
    statuses: &[ReservationStatus],
) -> DbResult<Vec<Reservation>> {
    debug!(customer_id = %customer_id, statuses = statuses.len(), "Listing reservations");

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    qb.push(RESERVATION_COLUMNS)
        .push(" FROM reservations WHERE customer_id = ")
        .push_bind(customer_id);
    if !statuses.is_empty() {
        qb.push(" AND status IN (");
        let mut status_sep = qb.separated(", ");
        for status in statuses {
            status_sep.push_bind(*status);
        }
        status_sep.push_unseparated(")");
    }
    qb.push(" ORDER BY created_at DESC, rowid DESC");

    let mut reservations: Vec<Reservation> = qb.build_query_as().fetch_all(&mut *conn).await?;
    if reservations.is_empty() {
        return Ok(reservations);
    }

    let ids: Vec<&str> = reservations.iter().map(|r| r.id.as_str()).collect();
    let mut lines = load_lines(&mut *conn, &ids).await?;
    for reservation in &mut reservations {
        reservation.lines = lines.remove(&reservation.id).unwrap_or_default();
    }

    Ok(reservations)
}

/// Locks a reservation for the rest of the transaction and returns it.
///
/// SQLite has no row locks. The no-op write here makes the transaction the
/// database's single writer until it commits or rolls back, which covers the
/// row. Fails with [`DbError::NotFound`] when the id does not exist.
pub async fn lock_for_update(conn: &mut SqliteConnection, id: &str) -> DbResult<Reservation> {
    let touched = sqlx::query("UPDATE reservations SET updated_at = updated_at WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if touched == 0 {
        return Err(DbError::not_found("Reservation", id));
    }

    debug!(reservation_id = %id, "Locked reservation");
    fetch_with_lines(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Reservation", id))
}

/// Sets the status and `updated_at` of a reservation and returns it.
///
/// The caller has already checked the transition.
pub async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: ReservationStatus,
    now: DateTime<Utc>,
) -> DbResult<Reservation> {
    debug!(reservation_id = %id, %status, "Updating reservation status");

    let updated = sqlx::query("UPDATE reservations SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(db_timestamp(now))
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(DbError::not_found("Reservation", id));
    }

    fetch_with_lines(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Reservation", id))
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_with_lines(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Reservation>> {
    let reservation = sqlx::query_as::<_, Reservation>(
        r#"
        SELECT id, customer_id, start_at, end_at, status,
               total_cents, note, created_at, updated_at
        FROM reservations
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(mut reservation) = reservation else {
        return Ok(None);
    };

    reservation.lines = sqlx::query_as::<_, ReservationLine>(
        r#"
        SELECT reservation_id, unit_id, line_amount_cents
        FROM reservation_lines
        WHERE reservation_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(reservation))
}

async fn load_lines(
    conn: &mut SqliteConnection,
    reservation_ids: &[&str],
) -> DbResult<HashMap<String, Vec<ReservationLine>>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT reservation_id, unit_id, line_amount_cents FROM reservation_lines \
         WHERE reservation_id IN (",
    );
    let mut ids_sep = qb.separated(", ");
    for id in reservation_ids {
        ids_sep.push_bind(*id);
    }
    ids_sep.push_unseparated(") ORDER BY rowid");

    let rows: Vec<ReservationLine> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut grouped: HashMap<String, Vec<ReservationLine>> = HashMap::new();
    for line in rows {
        grouped.entry(line.reservation_id.clone()).or_default().push(line);
    }
    Ok(grouped)
}

// =============================================================================
// Unit Tests
// =============================================================================

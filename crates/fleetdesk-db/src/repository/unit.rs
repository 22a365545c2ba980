//! # Unit Store
//!
//! Rentable units belong to fleet management; reservations only read them,
//! lock them while booking, and flip `status` on pick-up and return.

use chrono::{DateTime, Utc};
use fleetdesk_core::{RentableUnit, UnitStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::debug;

use super::db_timestamp;
use crate::error::DbResult;

const UNIT_COLUMNS: &str = "id, name, price_per_hour_cents, price_per_day_cents, \
     is_active, status, created_at, updated_at";

/// Inserts a unit (fleet onboarding, seeding, tests).
pub async fn insert_unit(conn: &mut SqliteConnection, unit: &RentableUnit) -> DbResult<()> {
    debug!(unit_id = %unit.id, name = %unit.name, "Inserting unit");

    sqlx::query(
        r#"
        INSERT INTO units (
            id, name, price_per_hour_cents, price_per_day_cents,
            is_active, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&unit.id)
    .bind(&unit.name)
    .bind(unit.price_per_hour_cents)
    .bind(unit.price_per_day_cents)
    .bind(unit.is_active)
    .bind(unit.status)
    .bind(db_timestamp(unit.created_at))
    .bind(db_timestamp(unit.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a unit by ID.
pub async fn get_unit(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RentableUnit>> {
    let unit = sqlx::query_as::<_, RentableUnit>(
        r#"
        SELECT id, name, price_per_hour_cents, price_per_day_cents,
               is_active, status, created_at, updated_at
        FROM units
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(unit)
}

/// Fetches the units with the given ids, in the order of `ids`.
///
/// Ids with no row are simply absent from the result; the caller compares
/// lengths to report which one is missing.
pub async fn fetch_units(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> DbResult<Vec<RentableUnit>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    debug!(count = ids.len(), "Fetching units");

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    qb.push(UNIT_COLUMNS).push(" FROM units WHERE id IN (");
    let mut ids_sep = qb.separated(", ");
    for id in ids {
        ids_sep.push_bind(id.as_str());
    }
    ids_sep.push_unseparated(")");

    let rows: Vec<RentableUnit> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut by_id: HashMap<String, RentableUnit> =
        rows.into_iter().map(|u| (u.id.clone(), u)).collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Takes the database write lock on behalf of a booking.
///
/// A no-op write on the requested unit rows. Run it as the first statement of
/// the create transaction: SQLite then holds the write lock until commit, so
/// the conflict check and the insert cannot interleave with another writer.
/// Returns the number of unit rows touched.
pub async fn lock_units(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE units SET status = status WHERE id IN (");
    if ids.is_empty() {
        // still a write statement, still takes the lock
        qb.push("NULL");
    } else {
        let mut ids_sep = qb.separated(", ");
        for id in ids {
            ids_sep.push_bind(id.as_str());
        }
    }
    qb.push(")");

    let touched = qb.build().execute(&mut *conn).await?.rows_affected();
    debug!(requested = ids.len(), touched, "Locked units");
    Ok(touched)
}

/// Writes `status` to every unit booked by `reservation_id`.
///
/// Returns the number of units updated.
pub async fn set_units_status(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    status: UnitStatus,
    now: DateTime<Utc>,
) -> DbResult<u64> {
    let updated = sqlx::query(
        r#"
        UPDATE units
        SET status = ?1, updated_at = ?2
        WHERE id IN (
            SELECT unit_id FROM reservation_lines WHERE reservation_id = ?3
        )
        "#,
    )
    .bind(status)
    .bind(db_timestamp(now))
    .bind(reservation_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    debug!(reservation_id = %reservation_id, %status, updated, "Updated unit status");
    Ok(updated)
}

/// Counts all units.
pub async fn count_units(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM units")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================

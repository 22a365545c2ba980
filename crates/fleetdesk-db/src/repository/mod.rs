//! # Repository Module
//!
//! Store functions for units and reservations.
//!
//! ## Calling Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every function takes `conn: &mut SqliteConnection`                    │
//! │                                                                         │
//! │  let mut conn = db.acquire().await?;                                   │
//! │  reservation::get_with_lines(&mut conn, id)      plain read, pooled    │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                       │
//! │  reservation::lock_for_update(&mut *tx, id)      inside a transaction  │
//! │  reservation::update_status(&mut *tx, ...)                             │
//! │  tx.commit().await?;                              caller decides       │
//! │                                                                         │
//! │  Functions never begin, commit or roll back.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Modules
//!
//! - [`unit`] - Rentable unit reads, write locks and status side effects
//! - [`reservation`] - Reservation and line persistence
//! - [`conflict`] - Overlap queries against blocking reservations

pub mod conflict;
pub mod reservation;
pub mod unit;

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp the way every timestamp column stores it.
///
/// Fixed width (`2026-05-01T09:00:00.000000Z`) so SQL text comparison orders
/// instants correctly.
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

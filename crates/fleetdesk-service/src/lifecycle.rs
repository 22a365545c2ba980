//! # Lifecycle Engine
//!
//! Executes a [`TransitionPlan`] inside the caller's transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lock_for_update (caller)  ─►  plan (fleetdesk-core)  ─►  apply (here)  │
//! │                                                                         │
//! │  apply:                                                                 │
//! │    1. plan.check_availability? conflict scan, excluding itself          │
//! │         hit ─► CONFLICT, nothing written                                │
//! │    2. update_status                                                     │
//! │    3. plan.unit_status?        set_units_status                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use fleetdesk_core::{Reservation, TransitionPlan};
use fleetdesk_db::repository::{conflict, reservation, unit};
use fleetdesk_db::ConflictScan;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Applies `plan` to `current`, which the caller has locked on `conn`.
pub(crate) async fn apply(
    conn: &mut SqliteConnection,
    current: &Reservation,
    plan: &TransitionPlan,
    now: DateTime<Utc>,
) -> ServiceResult<Reservation> {
    if plan.check_availability {
        let unit_ids = current.unit_ids();
        let scan = ConflictScan::new(&unit_ids, current.start_at, current.end_at).excluding(&current.id);
        let hits = conflict::find_conflicts(&mut *conn, &scan).await?;

        if let Some(hit) = hits.into_iter().next() {
            debug!(
                reservation_id = %current.id,
                unit_id = %hit.unit_id,
                held_by = %hit.reservation_id,
                transition = ?plan.transition,
                "Transition blocked by overlapping reservation"
            );
            return Err(ServiceError::conflict(hit));
        }
    }

    let updated = reservation::update_status(&mut *conn, &current.id, plan.to, now).await?;

    if let Some(unit_status) = plan.unit_status {
        let touched = unit::set_units_status(&mut *conn, &current.id, unit_status, now).await?;
        debug!(reservation_id = %current.id, %unit_status, touched, "Unit side effect applied");
    }

    Ok(updated)
}

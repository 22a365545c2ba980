//! # Reservation Status Transitions
//!
//! The state machine every reservation moves through.
//!
//! ## Transition Table
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  From                       To          Trigger         Re-check  Units  │
//! │  ─────────────────────────  ──────────  ──────────────  ────────  ─────── │
//! │  pending                    confirmed   staff confirm   yes       -      │
//! │  pending                    declined    staff decline   no        -      │
//! │  confirmed                  active      staff activate  yes       in_use │
//! │  active                     completed   staff complete  no        avail. │
//! │  pending|confirmed|active   cancelled   customer cancel no        *      │
//! │                                                                          │
//! │  * cancelling an active rental hands its units back (available)          │
//! │  Creation (→ pending) is not a transition; it is checked by the facade.  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is decided from the current status alone (plus, for
//! cancellation, the caller and the clock reading passed in), so the table can
//! be tested without a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Reservation, ReservationStatus, UnitStatus};

/// A status change that can be requested on an existing reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Confirm,
    Decline,
    Activate,
    Complete,
    Cancel,
}

impl Transition {
    /// Every transition, staff ones first.
    pub const ALL: [Transition; 5] = [
        Transition::Confirm,
        Transition::Decline,
        Transition::Activate,
        Transition::Complete,
        Transition::Cancel,
    ];

    /// Status the reservation ends up in.
    pub const fn target(self) -> ReservationStatus {
        match self {
            Transition::Confirm => ReservationStatus::Confirmed,
            Transition::Decline => ReservationStatus::Declined,
            Transition::Activate => ReservationStatus::Active,
            Transition::Complete => ReservationStatus::Completed,
            Transition::Cancel => ReservationStatus::Cancelled,
        }
    }

    /// Statuses this transition may start from.
    pub const fn allowed_from(self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            Transition::Confirm | Transition::Decline => &[Pending],
            Transition::Activate => &[Confirmed],
            Transition::Complete => &[Active],
            Transition::Cancel => &[Pending, Confirmed, Active],
        }
    }

    /// Transitions that newly claim exclusive use of the units re-run
    /// conflict detection before writing.
    pub const fn requires_availability_check(self) -> bool {
        match self {
            Transition::Confirm | Transition::Activate => true,
            Transition::Decline | Transition::Complete | Transition::Cancel => false,
        }
    }

    /// Status written to the reservation's units, if any.
    pub const fn unit_side_effect(self, from: ReservationStatus) -> Option<UnitStatus> {
        match (self, from) {
            (Transition::Activate, _) => Some(UnitStatus::InUse),
            (Transition::Complete, _) => Some(UnitStatus::Available),
            (Transition::Cancel, ReservationStatus::Active) => Some(UnitStatus::Available),
            _ => None,
        }
    }

    /// Staff drive every transition except cancellation.
    pub const fn is_staff_action(self) -> bool {
        !matches!(self, Transition::Cancel)
    }

    /// The staff transition that reaches `target`.
    ///
    /// `pending` is only reachable through creation and `cancelled` only
    /// through the customer, so both return `None`.
    pub const fn staff_for(target: ReservationStatus) -> Option<Transition> {
        match target {
            ReservationStatus::Confirmed => Some(Transition::Confirm),
            ReservationStatus::Declined => Some(Transition::Decline),
            ReservationStatus::Active => Some(Transition::Activate),
            ReservationStatus::Completed => Some(Transition::Complete),
            ReservationStatus::Pending | ReservationStatus::Cancelled => None,
        }
    }
}

/// What executing a transition involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub transition: Transition,
    pub from: ReservationStatus,
    pub to: ReservationStatus,
    /// Run conflict detection against blocking reservations before writing.
    pub check_availability: bool,
    /// Write this status to every unit of the reservation.
    pub unit_status: Option<UnitStatus>,
}

/// Checks `transition` against the table for a reservation in `current`.
pub fn plan(current: ReservationStatus, transition: Transition) -> CoreResult<TransitionPlan> {
    if !transition.allowed_from().contains(&current) {
        return Err(CoreError::InvalidTransition {
            from: current,
            to: transition.target(),
        });
    }

    Ok(TransitionPlan {
        transition,
        from: current,
        to: transition.target(),
        check_availability: transition.requires_availability_check(),
        unit_status: transition.unit_side_effect(current),
    })
}

/// Plans a staff-requested move to `target`.
pub fn plan_staff(current: ReservationStatus, target: ReservationStatus) -> CoreResult<TransitionPlan> {
    match Transition::staff_for(target) {
        Some(transition) => plan(current, transition),
        None => Err(CoreError::InvalidTransition {
            from: current,
            to: target,
        }),
    }
}

/// Plans a customer cancellation.
///
/// ## Checks, in order
/// 1. `caller_id` owns the reservation, else [`CoreError::NotOwner`]
/// 2. the status allows cancelling, else [`CoreError::InvalidTransition`]
/// 3. `now` is before `start_at`, else [`CoreError::CancellationWindowClosed`]
pub fn plan_cancel(
    reservation: &Reservation,
    caller_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<TransitionPlan> {
    if !reservation.is_owned_by(caller_id) {
        return Err(CoreError::NotOwner {
            reservation_id: reservation.id.clone(),
        });
    }

    let plan = plan(reservation.status, Transition::Cancel)?;

    if now >= reservation.start_at {
        return Err(CoreError::CancellationWindowClosed {
            reservation_id: reservation.id.clone(),
        });
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ReservationStatus::*;

    fn reservation(status: ReservationStatus) -> Reservation {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        Reservation {
            id: "r1".to_string(),
            customer_id: "alice".to_string(),
            start_at: start,
            end_at: start + Duration::hours(4),
            status,
            total_cents: 1000,
            note: None,
            created_at: start - Duration::days(3),
            updated_at: start - Duration::days(3),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_table_is_exhaustive() {
        // (from, transition) pairs that must succeed; every other pair fails
        let allowed = [
            (Pending, Transition::Confirm),
            (Pending, Transition::Decline),
            (Confirmed, Transition::Activate),
            (Active, Transition::Complete),
            (Pending, Transition::Cancel),
            (Confirmed, Transition::Cancel),
            (Active, Transition::Cancel),
        ];

        for from in ReservationStatus::ALL {
            for transition in Transition::ALL {
                let result = plan(from, transition);
                if allowed.contains(&(from, transition)) {
                    let p = result.unwrap();
                    assert_eq!(p.from, from);
                    assert_eq!(p.to, transition.target());
                } else {
                    assert!(
                        matches!(result, Err(CoreError::InvalidTransition { .. })),
                        "{from} via {transition:?} should be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exit() {
        for from in ReservationStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for transition in Transition::ALL {
                assert!(plan(from, transition).is_err());
            }
        }
    }

    #[test]
    fn test_complete_on_pending_is_invalid() {
        let err = plan(Pending, Transition::Complete).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: Pending,
                to: Completed
            }
        ));
    }

    #[test]
    fn test_confirm_twice_is_invalid() {
        assert!(plan(Pending, Transition::Confirm).is_ok());
        assert!(plan(Confirmed, Transition::Confirm).is_err());
    }

    #[test]
    fn test_availability_checks_only_on_confirm_and_activate() {
        assert!(plan(Pending, Transition::Confirm).unwrap().check_availability);
        assert!(plan(Confirmed, Transition::Activate).unwrap().check_availability);
        assert!(!plan(Pending, Transition::Decline).unwrap().check_availability);
        assert!(!plan(Active, Transition::Complete).unwrap().check_availability);
        assert!(!plan(Pending, Transition::Cancel).unwrap().check_availability);
    }

    #[test]
    fn test_unit_side_effects() {
        assert_eq!(
            plan(Confirmed, Transition::Activate).unwrap().unit_status,
            Some(UnitStatus::InUse)
        );
        assert_eq!(
            plan(Active, Transition::Complete).unwrap().unit_status,
            Some(UnitStatus::Available)
        );
        assert_eq!(
            plan(Active, Transition::Cancel).unwrap().unit_status,
            Some(UnitStatus::Available)
        );
        assert_eq!(plan(Pending, Transition::Confirm).unwrap().unit_status, None);
        assert_eq!(plan(Confirmed, Transition::Cancel).unwrap().unit_status, None);
    }

    #[test]
    fn test_staff_cannot_target_pending_or_cancelled() {
        assert!(plan_staff(Pending, Pending).is_err());
        assert!(plan_staff(Pending, Cancelled).is_err());
        assert_eq!(
            plan_staff(Pending, Confirmed).unwrap().transition,
            Transition::Confirm
        );
        assert!(Transition::ALL
            .into_iter()
            .filter(|t| t.is_staff_action())
            .all(|t| Transition::staff_for(t.target()) == Some(t)));
    }

    #[test]
    fn test_cancel_by_owner_before_start() {
        let r = reservation(Pending);
        let now = r.start_at - Duration::minutes(1);
        let p = plan_cancel(&r, "alice", now).unwrap();
        assert_eq!(p.to, Cancelled);
    }

    #[test]
    fn test_cancel_by_other_customer_is_forbidden() {
        let r = reservation(Pending);
        let now = r.start_at - Duration::days(1);
        assert!(matches!(
            plan_cancel(&r, "mallory", now),
            Err(CoreError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_cancel_at_or_after_start_is_too_late() {
        let r = reservation(Confirmed);
        assert!(matches!(
            plan_cancel(&r, "alice", r.start_at),
            Err(CoreError::CancellationWindowClosed { .. })
        ));
        assert!(matches!(
            plan_cancel(&r, "alice", r.start_at + Duration::hours(1)),
            Err(CoreError::CancellationWindowClosed { .. })
        ));
    }

    #[test]
    fn test_cancel_terminal_is_invalid_transition() {
        let r = reservation(Declined);
        let now = r.start_at - Duration::days(1);
        assert!(matches!(
            plan_cancel(&r, "alice", now),
            Err(CoreError::InvalidTransition { .. })
        ));
    }
}

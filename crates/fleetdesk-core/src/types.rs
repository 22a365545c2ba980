//! # Domain Types
//!
//! Core domain types used throughout Fleetdesk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Reservation    │1 n│ ReservationLine │n 1│  RentableUnit   │       │
//! │  │  ─────────────  │──►│  ─────────────  │──►│  ─────────────  │       │
//! │  │  id (UUID)      │   │  reservation_id │   │  id (opaque)    │       │
//! │  │  customer_id    │   │  unit_id        │   │  hourly rate    │       │
//! │  │  start_at/end_at│   │  line_amount    │   │  daily rate?    │       │
//! │  │  status         │   └─────────────────┘   │  is_active      │       │
//! │  │  total_cents    │                         │  status         │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ReservationStatus: pending → confirmed → active → completed           │
//! │                        └──► declined      (any open) ──► cancelled     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Windows are half-open: `[start_at, end_at)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Reservation Status
// =============================================================================

/// The status of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Requested by the customer, waiting for staff.
    Pending,
    /// Accepted by staff; the units are held for the window.
    Confirmed,
    /// Units picked up.
    Active,
    /// Units returned.
    Completed,
    /// Rejected by staff.
    Declined,
    /// Withdrawn by the customer.
    Cancelled,
}

impl ReservationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Active,
        ReservationStatus::Completed,
        ReservationStatus::Declined,
        ReservationStatus::Cancelled,
    ];

    /// Lowercase name, identical to the stored value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Declined => "declined",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses end the reservation's life.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Declined | ReservationStatus::Cancelled
        )
    }

    /// Whether a reservation in this status holds its units exclusively.
    pub const fn is_blocking(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed | ReservationStatus::Active)
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown status '{}'", s.trim()),
            })
    }
}

// =============================================================================
// Unit Status
// =============================================================================

/// Physical state of a rentable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// On the lot, ready for pick-up.
    Available,
    /// Out with a customer.
    InUse,
    /// In the workshop.
    Maintenance,
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Available
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Available => "available",
            UnitStatus::InUse => "in_use",
            UnitStatus::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Rentable Unit
// =============================================================================

/// Rates a unit is billed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    /// Price for each started hour.
    pub per_hour: Money,
    /// Price for each started day, when the unit offers one.
    pub per_day: Option<Money>,
}

impl Rates {
    /// Builds rates from raw cent values.
    pub fn new(per_hour_cents: i64, per_day_cents: Option<i64>) -> Self {
        Rates {
            per_hour: Money::from_cents(per_hour_cents),
            per_day: per_day_cents.map(Money::from_cents),
        }
    }
}

/// A vehicle (or any other resource) that can be rented.
///
/// Owned by the fleet management collaborator; the reservation core only
/// reads it and flips `status` on pick-up and return.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RentableUnit {
    pub id: String,
    pub name: String,
    /// Hourly rate in cents.
    pub price_per_hour_cents: i64,
    /// Daily rate in cents; `None` when the unit is only rented by the hour.
    pub price_per_day_cents: Option<i64>,
    /// Inactive units are retired from booking.
    pub is_active: bool,
    pub status: UnitStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RentableUnit {
    /// Returns the unit's rates.
    #[inline]
    pub fn rates(&self) -> Rates {
        Rates::new(self.price_per_hour_cents, self.price_per_day_cents)
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// One unit booked by a reservation, priced at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReservationLine {
    pub reservation_id: String,
    pub unit_id: String,
    pub line_amount_cents: i64,
}

impl ReservationLine {
    /// Returns the line amount as Money.
    #[inline]
    pub fn line_amount(&self) -> Money {
        Money::from_cents(self.line_amount_cents)
    }
}

/// A customer's booking of one or more units over a time window.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub customer_id: String,
    #[ts(as = "String")]
    pub start_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_at: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Sum of line amounts, frozen at creation.
    pub total_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from `reservation_lines`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<ReservationLine>,
}

impl Reservation {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether `customer_id` owns this reservation.
    #[inline]
    pub fn is_owned_by(&self, customer_id: &str) -> bool {
        self.customer_id == customer_id
    }

    /// Ids of the booked units, in line order.
    pub fn unit_ids(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.unit_id.clone()).collect()
    }
}

// =============================================================================
// Conflicts
// =============================================================================

/// A unit that is already held by another reservation for an overlapping window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UnitConflict {
    pub unit_id: String,
    pub reservation_id: String,
}

// =============================================================================
// Requests and Results
// =============================================================================

/// Raw booking request as received from the HTTP layer.
///
/// Timestamps stay strings until [`crate::validation::validate_create_request`]
/// parses them, so malformed input is reported as a validation error.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateReservationRequest {
    /// RFC 3339 timestamp, e.g. `2026-05-01T09:00:00+02:00`.
    pub start: String,
    /// RFC 3339 timestamp; must be after `start`.
    pub end: String,
    pub unit_ids: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Outcome of a status transition.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusChange {
    pub previous_status: ReservationStatus,
    pub reservation: Reservation,
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # fleetdesk-core: Pure Business Logic for Fleetdesk
//!
//! Everything about a reservation that can be decided without touching the
//! database lives here: what a reservation costs, which status changes are
//! legal, and whether a request is well formed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fleetdesk Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer (auth, uploads, reports)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          fleetdesk-service (ReservationService facade)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fleetdesk-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │ transition │  │ validation│  │   │
//! │  │   │Reservation│  │  hourly / │  │ state      │  │  request  │  │   │
//! │  │   │   Unit    │  │  daily    │  │ machine    │  │  shape    │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 fleetdesk-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Reservation, ReservationLine, RentableUnit, statuses)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Line pricing over a rental window
//! - [`transition`] - The reservation status state machine
//! - [`validation`] - Request shape validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use fleetdesk_core::pricing::compute_line_amount;
//! use fleetdesk_core::Rates;
//!
//! let rates = Rates::new(8_000, Some(50_000)); // 80.00/h, 500.00/day
//! let start = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
//! let end = start + Duration::hours(48);
//!
//! // 48 hourly periods cost 3840.00, two daily periods cost 1000.00
//! let amount = compute_line_amount(&rates, start, end).unwrap();
//! assert_eq!(amount.cents(), 100_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod transition;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{LineQuote, Quote};
pub use transition::{Transition, TransitionPlan};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of units booked by a single reservation.
///
/// ## Business Reason
/// A single customer renting more than a small convoy is a fleet contract,
/// which is handled outside the self-service flow.
pub const MAX_UNITS_PER_RESERVATION: usize = 20;

/// Maximum length of the free-text note on a reservation.
pub const MAX_NOTE_LENGTH: usize = 1000;

/// Statuses that hold a unit exclusively for their window.
///
/// Pending reservations are requests; they never block anyone.
pub const BLOCKING_STATUSES: &[ReservationStatus] =
    &[ReservationStatus::Confirmed, ReservationStatus::Active];

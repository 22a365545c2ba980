//! # Service Error Type
//!
//! The single error type every [`crate::ReservationService`] operation returns.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Fleetdesk                              │
//! │                                                                         │
//! │  ValidationError ─► CoreError ──┐                                      │
//! │                                  ├──► ServiceError { kind, message }   │
//! │  sqlx::Error ─────► DbError ────┘         │                            │
//! │                                            ▼                            │
//! │                                 HTTP layer maps kind → status code     │
//! │                                                                         │
//! │  INVALID_INPUT, INVALID_RANGE         400                               │
//! │  FORBIDDEN                            403                               │
//! │  NOT_FOUND                            404                               │
//! │  CONFLICT, INVALID_TRANSITION         409                               │
//! │  INACTIVE, TOO_LATE                   422                               │
//! │  INTERNAL                             500  (detail only in the logs)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "kind": "CONFLICT",
//!   "message": "Unit 4f1c… is already reserved by 9a2e…",
//!   "conflict": { "unitId": "4f1c…", "reservationId": "9a2e…" }
//! }
//! ```

use fleetdesk_core::{CoreError, UnitConflict};
use fleetdesk_db::DbError;
use serde::Serialize;

/// Caller-facing error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error kind
    pub kind: ErrorKind,

    /// Human-readable error message for display
    pub message: String,

    /// The unit and the reservation holding it, for `CONFLICT`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<UnitConflict>,
}

/// Error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed request: bad timestamp, empty/duplicate/unknown-format ids, note too long
    InvalidInput,
    /// The window ends at or before its start
    InvalidRange,
    /// Reservation or unit does not exist
    NotFound,
    /// A requested unit is retired from booking
    Inactive,
    /// A unit is held by an overlapping confirmed or active reservation
    Conflict,
    /// The status change is not allowed from the current status
    InvalidTransition,
    /// The caller may not see or change this reservation
    Forbidden,
    /// The rental already started; it can no longer be cancelled
    TooLate,
    /// Infrastructure failure or timeout
    Internal,
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Creates a new service error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServiceError {
            kind,
            message: message.into(),
            conflict: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorKind::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a conflict error carrying the clashing pair.
    pub fn conflict(hit: UnitConflict) -> Self {
        ServiceError {
            kind: ErrorKind::Conflict,
            message: format!(
                "Unit {} is already reserved by {}",
                hit.unit_id, hit.reservation_id
            ),
            conflict: Some(hit),
        }
    }

    /// Creates an internal error with a generic message.
    ///
    /// Log the detail before calling this; it never reaches the caller.
    pub fn internal() -> Self {
        ServiceError::new(ErrorKind::Internal, "Internal error, please retry later")
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let kind = match &err {
            CoreError::InvalidRange => ErrorKind::InvalidRange,
            CoreError::UnitInactive { .. } => ErrorKind::Inactive,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CoreError::NotOwner { .. } => ErrorKind::Forbidden,
            CoreError::CancellationWindowClosed { .. } => ErrorKind::TooLate,
            // only reachable with absurd windows or rates
            CoreError::AmountOverflow => ErrorKind::InvalidInput,
            CoreError::Validation(_) => ErrorKind::InvalidInput,
        };
        ServiceError::new(kind, err.to_string())
    }
}

impl From<fleetdesk_core::ValidationError> for ServiceError {
    fn from(err: fleetdesk_core::ValidationError) -> Self {
        ServiceError::new(ErrorKind::InvalidInput, err.to_string())
    }
}

/// Converts database errors to service errors.
///
/// Only a missing row is the caller's business; everything else is logged
/// and reported as `INTERNAL`.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ServiceError::internal()
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Database operation failed");
                ServiceError::internal()
            }
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

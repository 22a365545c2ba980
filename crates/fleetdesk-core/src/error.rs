//! # Error Types
//!
//! Domain-specific error types for fleetdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fleetdesk-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Request shape failures                         │
//! │                                                                         │
//! │  fleetdesk-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  fleetdesk-service errors                                              │
//! │  └── ServiceError     - What callers see (kind + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                           DbError ──┴─► ServiceError → HTTP layer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::ReservationStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The rental window is empty or reversed.
    #[error("Reservation must end after it starts")]
    InvalidRange,

    /// A unit exists but cannot be booked.
    #[error("Unit {unit_id} is not available for booking")]
    UnitInactive { unit_id: String },

    /// The requested status change is not in the transition table.
    ///
    /// ## When This Occurs
    /// - Completing a reservation that was never picked up
    /// - Confirming a reservation twice (the second attempt sees `confirmed`)
    /// - Cancelling something already declined, completed or cancelled
    /// - Staff asking for `pending` or `cancelled` as a target
    #[error("Reservation cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// The caller does not own the reservation.
    #[error("Reservation {reservation_id} does not belong to the caller")]
    NotOwner { reservation_id: String },

    /// Cancellation attempted at or after the start of the rental.
    #[error("Reservation {reservation_id} has already started and can no longer be cancelled")]
    CancellationWindowClosed { reservation_id: String },

    /// Price arithmetic left the i64 range.
    #[error("Reservation amount exceeds the supported range")]
    AmountOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Collection has too many entries.
    #[error("{field} must contain at most {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., timestamp without offset).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value in a collection that must be unique.
    #[error("{field} contains '{value}' more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message_uses_lowercase_statuses() {
        let err = CoreError::InvalidTransition {
            from: ReservationStatus::Pending,
            to: ReservationStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Reservation cannot move from pending to completed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "unit_ids".to_string(),
        };
        assert_eq!(err.to_string(), "unit_ids is required");

        let err = ValidationError::Duplicate {
            field: "unit_ids".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "unit_ids contains 'abc' more than once");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "start".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

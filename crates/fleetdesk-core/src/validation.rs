//! # Validation Module
//!
//! Request shape validation, run before any transaction is opened.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer                                                    │
//! │  └── Deserialization, authentication                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── timestamps parse, end > start                                      │
//! │  ├── unit ids present, unique (ids are opaque; lookup reports missing)  │
//! │  └── note length                                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (end_at > start_at), CHECK (status IN ...)                   │
//! │  └── Foreign keys lines → reservations, units                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::CreateReservationRequest;
use crate::{MAX_NOTE_LENGTH, MAX_UNITS_PER_RESERVATION};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A booking request that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Unique, in request order.
    pub unit_ids: Vec<String>,
    /// Trimmed; `None` when blank.
    pub note: Option<String>,
}

/// Validates a create request and normalizes it.
///
/// Reversed windows fail with [`CoreError::InvalidRange`]; every other
/// problem is a [`CoreError::Validation`].
pub fn validate_create_request(req: &CreateReservationRequest) -> CoreResult<ValidatedBooking> {
    let start = parse_timestamp("start", &req.start)?;
    let end = parse_timestamp("end", &req.end)?;
    validate_window(start, end)?;
    let unit_ids = validate_unit_ids(&req.unit_ids)?;
    let note = validate_note(req.note.as_deref())?;

    Ok(ValidatedBooking {
        start,
        end,
        unit_ids,
        note,
    })
}

/// Parses an RFC 3339 timestamp (offset required) into UTC, truncated to
/// microseconds, the precision timestamps are stored at.
///
/// ## Example
/// ```rust
/// use fleetdesk_core::validation::parse_timestamp;
///
/// let t = parse_timestamp("start", "2026-05-01T11:00:00+02:00").unwrap();
/// assert_eq!(t.to_rfc3339(), "2026-05-01T09:00:00+00:00");
/// assert!(parse_timestamp("start", "2026-05-01 11:00").is_err());
/// ```
pub fn parse_timestamp(field: &str, value: &str) -> ValidationResult<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected an RFC 3339 timestamp with offset ({e})"),
        })
}

/// The window must be non-empty: `end > start`.
pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
    if end <= start {
        return Err(CoreError::InvalidRange);
    }
    Ok(())
}

/// Validates the list of units to book and returns the ids trimmed.
///
/// ## Rules
/// - At least one, at most [`MAX_UNITS_PER_RESERVATION`]
/// - Each non-blank; ids are otherwise opaque, unknown ones are reported by
///   the unit lookup as not found
/// - No repeats (a unit is booked once per reservation)
pub fn validate_unit_ids(unit_ids: &[String]) -> ValidationResult<Vec<String>> {
    if unit_ids.is_empty() {
        return Err(ValidationError::Required {
            field: "unit_ids".to_string(),
        });
    }

    if unit_ids.len() > MAX_UNITS_PER_RESERVATION {
        return Err(ValidationError::TooMany {
            field: "unit_ids".to_string(),
            max: MAX_UNITS_PER_RESERVATION,
        });
    }

    let mut seen = HashSet::with_capacity(unit_ids.len());
    for id in unit_ids {
        let id = validate_id("unit_ids", id)?;
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: "unit_ids".to_string(),
                value: id.to_string(),
            });
        }
    }

    Ok(unit_ids.iter().map(|id| id.trim().to_string()).collect())
}

/// Validates the optional note, returning it trimmed (`None` if blank).
pub fn validate_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(Some(note.to_string()))
}

/// Validates an opaque identifier and returns it trimmed.
///
/// ## Example
/// ```rust
/// use fleetdesk_core::validation::validate_id;
///
/// assert_eq!(validate_id("id", " 42 ").unwrap(), "42");
/// assert!(validate_id("id", "   ").is_err());
/// ```
pub fn validate_id<'a>(field: &str, id: &'a str) -> ValidationResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

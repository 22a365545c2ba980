//! # Pricing
//!
//! Computes what a unit costs over a rental window.
//!
//! ## Billing Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  window = end - start                                                   │
//! │                                                                         │
//! │  hours = ceil(window in hours)         every started hour is billed     │
//! │  hourly_total = per_hour × hours                                        │
//! │                                                                         │
//! │  if the unit has a daily rate:                                          │
//! │     days = ceil(hours / 24)                                             │
//! │     daily_total = per_day × days                                        │
//! │     amount = min(hourly_total, daily_total)                             │
//! │  else                                                                   │
//! │     amount = hourly_total                                               │
//! │                                                                         │
//! │  80/h, 500/day, 48h:  3840 vs 1000  → 1000                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Rates, RentableUnit};

const HOURS_PER_DAY: i64 = 24;

/// Number of billable hours in `[start, end)`, rounded up.
///
/// Fails with [`CoreError::InvalidRange`] unless `end` is strictly after `start`.
pub fn billable_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<i64> {
    let span = end - start;
    if span <= Duration::zero() {
        return Err(CoreError::InvalidRange);
    }

    // exact at any resolution: whole hours, plus one for any remainder
    let whole = span.num_hours();
    if span - Duration::hours(whole) > Duration::zero() {
        Ok(whole + 1)
    } else {
        Ok(whole)
    }
}

/// Prices one unit over `[start, end)`.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use fleetdesk_core::pricing::compute_line_amount;
/// use fleetdesk_core::Rates;
///
/// let start = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
///
/// // 90 minutes bill as 2 hours
/// let hourly_only = Rates::new(1_500, None);
/// let amount = compute_line_amount(&hourly_only, start, start + Duration::minutes(90)).unwrap();
/// assert_eq!(amount.cents(), 3_000);
///
/// // Reversed windows are rejected
/// assert!(compute_line_amount(&hourly_only, start, start).is_err());
/// ```
pub fn compute_line_amount(
    rates: &Rates,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CoreResult<Money> {
    price_hours(rates, billable_hours(start, end)?).ok_or(CoreError::AmountOverflow)
}

fn price_hours(rates: &Rates, hours: i64) -> Option<Money> {
    let hourly_total = rates.per_hour.checked_mul(hours)?;

    match rates.per_day {
        Some(per_day) => {
            let days = (hours + HOURS_PER_DAY - 1) / HOURS_PER_DAY;
            let daily_total = per_day.checked_mul(days)?;
            Some(hourly_total.min(daily_total))
        }
        None => Some(hourly_total),
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// Price of one unit within a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineQuote {
    pub unit_id: String,
    pub amount: Money,
}

/// Priced lines plus their total, for a set of units over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Quote {
    pub billable_hours: i64,
    pub lines: Vec<LineQuote>,
    pub total: Money,
}

/// Prices every unit over `[start, end)` and sums the lines.
///
/// Lines keep the order of `units`.
pub fn quote(units: &[RentableUnit], start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Quote> {
    let hours = billable_hours(start, end)?;

    let mut lines = Vec::with_capacity(units.len());
    let mut total = Money::zero();
    for unit in units {
        let amount = price_hours(&unit.rates(), hours).ok_or(CoreError::AmountOverflow)?;
        total = total.checked_add(amount).ok_or(CoreError::AmountOverflow)?;
        lines.push(LineQuote {
            unit_id: unit.id.clone(),
            amount,
        });
    }

    Ok(Quote {
        billable_hours: hours,
        lines,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

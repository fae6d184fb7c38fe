// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Recurrence Calculator
//!
//! Maps a series anchor, a pattern and a reference instant to the next
//! occurrence strictly after the reference.
//!
//! Occurrences are always computed from the anchor (`anchor + k * step`),
//! never by stepping from the previous occurrence, so a monthly series
//! anchored on the 31st clamps to the end of shorter months and returns to
//! the 31st afterwards.
//!
//! All computations are closed-form; no occurrence-by-occurrence loop.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::models::RecurrencePattern;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// The instant a series anchored on `date` starts: midnight UTC.
pub fn anchor_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Next occurrence of the series strictly after `reference`.
///
/// - If the anchor lies strictly after `reference`, the anchor is returned.
/// - Otherwise the first `anchor + k * step` (k >= 1) greater than
///   `reference` is returned. Landing exactly on `reference` does not count.
/// - An unrecognized pattern yields `reference + 1 day`.
pub fn next_occurrence(
    anchor: NaiveDate,
    pattern: RecurrencePattern,
    reference: DateTime<Utc>,
) -> DateTime<Utc> {
    let start = anchor_instant(anchor);
    if start > reference {
        return start;
    }

    let next = match pattern {
        RecurrencePattern::Daily => next_fixed_step(start, SECONDS_PER_DAY, reference),
        RecurrencePattern::Weekly => next_fixed_step(start, SECONDS_PER_WEEK, reference),
        RecurrencePattern::Monthly => next_month(start, reference),
        RecurrencePattern::Unrecognized => None,
    };

    next.unwrap_or_else(|| fallback(reference))
}

/// `start + k * step` for the smallest k with a result after `reference`.
///
/// Requires `start <= reference`.
fn next_fixed_step(
    start: DateTime<Utc>,
    step_secs: i64,
    reference: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    // Truncating toward zero: a sub-second remainder still rounds down, so
    // `steps * step_secs` never overshoots `reference - start`.
    let elapsed = (reference - start).num_seconds();
    let steps = elapsed / step_secs + 1;
    let offset = TimeDelta::try_seconds(steps.checked_mul(step_secs)?)?;
    start.checked_add_signed(offset)
}

/// `start + k months` for the smallest k with a result after `reference`.
///
/// Requires `start <= reference`.
fn next_month(start: DateTime<Utc>, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let months = (reference.year() - start.year()) * 12
        + (reference.month() as i32 - start.month() as i32);
    let months = u32::try_from(months).ok()?;

    // `start + months` lands in the reference's month. If it is still not
    // past the reference, the following month is.
    let candidate = start.checked_add_months(Months::new(months))?;
    if candidate > reference {
        return Some(candidate);
    }
    start.checked_add_months(Months::new(months.checked_add(1)?))
}

fn fallback(reference: DateTime<Utc>) -> DateTime<Utc> {
    reference
        .checked_add_signed(TimeDelta::days(1))
        .unwrap_or(reference)
}

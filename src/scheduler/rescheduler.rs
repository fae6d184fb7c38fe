// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rescheduler: moves an item's next execution past the tick that just
//! booked it.

use chrono::{DateTime, Utc};

use crate::error::SchedulerResult;
use crate::models::RecurringItem;
use crate::recurrence::{anchor_instant, next_occurrence};
use crate::storage::RecurringStore;

/// The item's next execution after `now`, or `None` once the next
/// occurrence would fall after the item's end date.
pub fn next_execution_for(item: &RecurringItem, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let next = next_occurrence(item.start_date, item.pattern, now);

    let series_end = item
        .end_date
        .and_then(|end| end.succ_opt())
        .map(anchor_instant);
    match series_end {
        Some(end) if next >= end => None,
        _ => Some(next),
    }
}

/// Compute and persist the item's next execution. Returns what was stored.
///
/// Only the recurrence anchor and `now` feed the result, so repeating the
/// call with the same `now` stores the same value.
pub fn reschedule<S>(
    store: &S,
    item: &RecurringItem,
    now: DateTime<Utc>,
) -> SchedulerResult<Option<DateTime<Utc>>>
where
    S: RecurringStore + ?Sized,
{
    let next = next_execution_for(item, now);
    store.set_next_execution(&item.id, next)?;
    Ok(next)
}

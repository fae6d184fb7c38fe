// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment materializer: turns one due recurring item into a ledger entry
//! plus a balance adjustment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::WalletLocks;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{LedgerEntry, Payment, PaymentOutcome, RecurringItem};
use crate::storage::PaymentStore;

/// What materializing an item did.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// A new entry was booked and the balance adjusted.
    Booked(LedgerEntry),
    /// The pending occurrence had already been booked by an earlier tick.
    AlreadyBooked { entry_id: String },
    /// The item changed since it was scanned (paused, cancelled or
    /// rescheduled); nothing was booked and it must not be rescheduled.
    Stale,
}

/// Book `item`'s pending occurrence at tick time `now`.
///
/// The wallet lock is held for the whole booking. On any error nothing has
/// been written and the item remains due.
pub fn materialize<S>(
    store: &S,
    locks: &WalletLocks,
    item: &RecurringItem,
    now: DateTime<Utc>,
) -> SchedulerResult<Materialized>
where
    S: PaymentStore + ?Sized,
{
    if item.amount <= Decimal::ZERO {
        return Err(SchedulerError::validation(format!(
            "recurring item {} has non-positive amount {}",
            item.id, item.amount
        )));
    }

    let payment = Payment::for_item(item, now).ok_or_else(|| {
        SchedulerError::validation(format!(
            "recurring item {} has no pending occurrence",
            item.id
        ))
    })?;

    let outcome = locks.with_wallet(&item.wallet_id, || store.apply_payment(&payment))?;

    match outcome {
        PaymentOutcome::Applied { entry, wallet } => {
            debug!(
                recurring_id = %item.id,
                wallet_id = %wallet.id,
                entry_id = %entry.id,
                kind = ?entry.kind,
                amount = %entry.amount,
                balance = %wallet.balance,
                "Booked recurring payment"
            );
            Ok(Materialized::Booked(entry))
        }
        PaymentOutcome::AlreadyApplied { entry_id } => {
            debug!(
                recurring_id = %item.id,
                entry_id = %entry_id,
                "Occurrence already booked"
            );
            Ok(Materialized::AlreadyBooked { entry_id })
        }
        PaymentOutcome::Stale => {
            debug!(recurring_id = %item.id, "Item changed since scan, skipped");
            Ok(Materialized::Stale)
        }
    }
}

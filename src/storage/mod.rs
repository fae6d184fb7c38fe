// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Store interfaces consumed by the scheduler and services, and their
//! implementation on an embedded redb database.
//!
//! ## Interfaces
//!
//! - [`RecurringStore`]: due-item lookup and next-execution updates
//! - [`LedgerStore`]: append-only ledger entries
//! - [`WalletStore`]: wallet lookup and balance updates
//! - [`PaymentStore`]: one occurrence booked as a single unit of work
//!
//! ## Consistency
//!
//! `PaymentStore::apply_payment` inserts the ledger entry and updates the
//! balance in one write transaction; either both are visible or neither.
//! The separate `LedgerStore::append` and `WalletStore::set_balance` calls
//! exist for manual corrections and carry no such guarantee when combined.

pub mod ledger_db;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{LedgerEntry, NewLedgerEntry, Payment, PaymentOutcome, RecurringItem, Wallet};

pub use ledger_db::{LedgerDatabase, StoreError, StoreResult};

/// Persisted recurring items.
pub trait RecurringStore {
    /// All active items whose `next_execution` is at or before `now`.
    fn find_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecurringItem>>;

    fn get_recurring(&self, id: &str) -> StoreResult<RecurringItem>;

    /// Replace the item's next execution. `None` means never due again.
    fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> StoreResult<()>;
}

/// Append-only ledger.
pub trait LedgerStore {
    /// Insert an entry, assigning its identity and creation timestamp.
    fn append(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry>;

    /// Entries of a wallet, newest first.
    fn list_by_wallet(&self, wallet_id: &str, limit: usize) -> StoreResult<Vec<LedgerEntry>>;
}

/// Wallets and their balances.
pub trait WalletStore {
    fn get_wallet(&self, id: &str) -> StoreResult<Wallet>;

    fn set_balance(&self, id: &str, balance: Decimal) -> StoreResult<()>;
}

/// A store able to book a recurring payment atomically.
pub trait PaymentStore: RecurringStore + LedgerStore + WalletStore {
    /// Append the payment's ledger entry and apply it to the wallet balance
    /// as one unit of work.
    ///
    /// Booking the same `(recurring_id, scheduled_for)` twice returns
    /// [`PaymentOutcome::AlreadyApplied`] and changes nothing.
    fn apply_payment(&self, payment: &Payment) -> StoreResult<PaymentOutcome>;
}

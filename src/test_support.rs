// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::models::{
    Direction, LedgerEntry, NewLedgerEntry, Payment, PaymentOutcome, RecurrencePattern,
    RecurringItem, RecurringStatus, Wallet, WalletKind,
};
use crate::storage::{
    LedgerDatabase, LedgerStore, PaymentStore, RecurringStore, StoreError, StoreResult,
    WalletStore,
};

pub fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = LedgerDatabase::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn sample_wallet(id: &str, balance: &str) -> Wallet {
    Wallet {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: format!("Wallet {id}"),
        kind: WalletKind::Cash,
        currency: "EUR".to_string(),
        balance: dec(balance),
        created_at: ts(2024, 1, 1, 0),
    }
}

/// A monthly item anchored on 2024-02-05, due on 2024-03-05.
pub fn sample_item(id: &str, wallet_id: &str, direction: Direction, amount: &str) -> RecurringItem {
    RecurringItem {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        wallet_id: wallet_id.to_string(),
        direction,
        amount: dec(amount),
        currency: "EUR".to_string(),
        description: format!("Recurring {id}"),
        pattern: RecurrencePattern::Monthly,
        start_date: date(2024, 2, 5),
        end_date: None,
        next_execution: Some(ts(2024, 3, 5, 0)),
        status: RecurringStatus::Active,
        created_at: ts(2024, 1, 1, 0),
        updated_at: ts(2024, 1, 1, 0),
    }
}

/// Wraps a [`LedgerDatabase`] and injects failures on demand.
pub struct FlakyStore {
    pub inner: LedgerDatabase,
    pub fail_scan: AtomicBool,
    pub fail_wallets: Mutex<HashSet<String>>,
    pub fail_reschedule: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new(inner: LedgerDatabase) -> Self {
        Self {
            inner,
            fail_scan: AtomicBool::new(false),
            fail_wallets: Mutex::new(HashSet::new()),
            fail_reschedule: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_payments_for(&self, wallet_id: &str) {
        self.fail_wallets.lock().unwrap().insert(wallet_id.to_string());
    }

    pub fn fail_reschedule_for(&self, recurring_id: &str) {
        self.fail_reschedule
            .lock()
            .unwrap()
            .insert(recurring_id.to_string());
    }

    pub fn heal(&self) {
        self.fail_scan.store(false, Ordering::SeqCst);
        self.fail_wallets.lock().unwrap().clear();
        self.fail_reschedule.lock().unwrap().clear();
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Io(std::io::Error::other(format!("injected failure: {what}")))
    }
}

impl RecurringStore for FlakyStore {
    fn find_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecurringItem>> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(Self::injected("scan"));
        }
        self.inner.find_due(now)
    }

    fn get_recurring(&self, id: &str) -> StoreResult<RecurringItem> {
        self.inner.get_recurring(id)
    }

    fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> StoreResult<()> {
        if self.fail_reschedule.lock().unwrap().contains(id) {
            return Err(Self::injected("reschedule"));
        }
        self.inner.set_next_execution(id, next)
    }
}

impl LedgerStore for FlakyStore {
    fn append(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        self.inner.append(entry)
    }

    fn list_by_wallet(&self, wallet_id: &str, limit: usize) -> StoreResult<Vec<LedgerEntry>> {
        self.inner.list_by_wallet(wallet_id, limit)
    }
}

impl WalletStore for FlakyStore {
    fn get_wallet(&self, id: &str) -> StoreResult<Wallet> {
        self.inner.get_wallet(id)
    }

    fn set_balance(&self, id: &str, balance: Decimal) -> StoreResult<()> {
        self.inner.set_balance(id, balance)
    }
}

impl PaymentStore for FlakyStore {
    fn apply_payment(&self, payment: &Payment) -> StoreResult<PaymentOutcome> {
        if self.fail_wallets.lock().unwrap().contains(&payment.wallet_id) {
            return Err(Self::injected("payment"));
        }
        self.inner.apply_payment(payment)
    }
}

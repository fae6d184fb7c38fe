// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `recurring`: recurring_id → serialized RecurringItem
//! - `due_index`: composite key (next_execution|recurring_id) → recurring_id
//! - `wallets`: wallet_id → serialized Wallet
//! - `ledger`: entry_id → serialized LedgerEntry
//! - `wallet_ledger_index`: composite key (len(wallet_id)|wallet_id|!created_at|entry_id) → entry_id
//! - `applied_payments`: `recurring_id|scheduled_for` → entry_id

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;

use super::{LedgerStore, PaymentStore, RecurringStore, WalletStore};
use crate::clock::{Clock, SystemClock};
use crate::models::{
    EntryKind, LedgerEntry, NewLedgerEntry, Payment, PaymentOutcome, RecurringItem,
    RecurringStatus, Wallet,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: recurring_id → serialized RecurringItem (JSON bytes).
const RECURRING: TableDefinition<&str, &[u8]> = TableDefinition::new("recurring");

/// Index of schedulable items.
/// Key format: `sortable_micros(next_execution) ++ recurring_id`, ascending.
/// Only active items with a next execution are indexed.
const DUE_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("due_index");

/// Primary table: wallet_id → serialized Wallet (JSON bytes).
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Primary table: entry_id → serialized LedgerEntry (JSON bytes).
const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

/// Index: `len_be32(wallet_id) ++ wallet_id ++ !created_at_be ++ entry_id` → entry_id,
/// newest first.
const WALLET_LEDGER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("wallet_ledger_index");

/// Occurrences already booked: `recurring_id|scheduled_for_micros` → entry_id.
const APPLIED_PAYMENTS: TableDefinition<&str, &str> = TableDefinition::new("applied_payments");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("balance overflow: {0}")]
    BalanceOverflow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Big-endian encoding of a timestamp that sorts like the signed value.
fn sortable_micros(micros: i64) -> [u8; 8] {
    ((micros as u64) ^ (1 << 63)).to_be_bytes()
}

/// Build a composite key for the due_index table.
fn make_due_key(next_execution: DateTime<Utc>, recurring_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + recurring_id.len());
    key.extend_from_slice(&sortable_micros(next_execution.timestamp_micros()));
    key.extend_from_slice(recurring_id.as_bytes());
    key
}

/// Exclusive upper bound of all due keys at or before `now`.
fn make_due_bound(now: DateTime<Utc>) -> [u8; 8] {
    sortable_micros(now.timestamp_micros().saturating_add(1))
}

/// Timestamp bytes that sort newest first when scanning forward.
fn inverted_micros(at: DateTime<Utc>) -> [u8; 8] {
    (!u64::from_be_bytes(sortable_micros(at.timestamp_micros()))).to_be_bytes()
}

/// Prefix shared by all index keys of one wallet.
///
/// The id is length-prefixed so no wallet's prefix is a prefix of another's.
fn make_ledger_prefix(wallet_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + wallet_id.len());
    prefix.extend_from_slice(&(wallet_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(wallet_id.as_bytes());
    prefix
}

/// Build a composite key for the wallet_ledger_index table.
fn make_ledger_key(wallet_id: &str, created_at: DateTime<Utc>, entry_id: &str) -> Vec<u8> {
    let mut key = make_ledger_prefix(wallet_id);
    key.reserve(8 + entry_id.len());
    key.extend_from_slice(&inverted_micros(created_at));
    key.extend_from_slice(entry_id.as_bytes());
    key
}

fn make_applied_key(recurring_id: &str, scheduled_for: DateTime<Utc>) -> String {
    format!("{recurring_id}|{}", scheduled_for.timestamp_micros())
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID database for wallets, recurring items and the ledger.
pub struct LedgerDatabase {
    db: Database,
    /// Stamps `created_at` on new ledger entries
    clock: Arc<dyn Clock>,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECURRING)?;
            let _ = write_txn.open_table(DUE_INDEX)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(WALLET_LEDGER_INDEX)?;
            let _ = write_txn.open_table(APPLIED_PAYMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` to stamp new ledger entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    /// Insert a new wallet.
    pub fn create_wallet(&self, wallet: &Wallet) -> StoreResult<()> {
        let json = serde_json::to_vec(wallet)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            if table.get(wallet.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Wallet {}", wallet.id)));
            }
            table.insert(wallet.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All wallets owned by a user.
    pub fn list_wallets_by_user(&self, user_id: &str) -> StoreResult<Vec<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        let mut wallets = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let wallet: Wallet = serde_json::from_slice(entry.1.value())?;
            if wallet.user_id == user_id {
                wallets.push(wallet);
            }
        }
        Ok(wallets)
    }

    // =========================================================================
    // Recurring items
    // =========================================================================

    /// Insert a new recurring item and index it if schedulable.
    pub fn create_recurring(&self, item: &RecurringItem) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let table = write_txn.open_table(RECURRING)?;
            if table.get(item.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Recurring item {}",
                    item.id
                )));
            }
        }
        put_recurring(&write_txn, item, None)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Replace an existing recurring item, keeping the due index in sync.
    pub fn update_recurring(&self, item: &RecurringItem) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        let previous = load_recurring(&write_txn, &item.id)?;
        put_recurring(&write_txn, item, Some(&previous))?;
        write_txn.commit()?;
        Ok(())
    }

    /// All recurring items owned by a user, cancelled ones included.
    pub fn list_recurring_by_user(&self, user_id: &str) -> StoreResult<Vec<RecurringItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECURRING)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let item: RecurringItem = serde_json::from_slice(entry.1.value())?;
            if item.user_id == user_id {
                items.push(item);
            }
        }
        Ok(items)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Look up a single ledger entry.
    pub fn get_entry(&self, entry_id: &str) -> StoreResult<LedgerEntry> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER)?;
        let value = table
            .get(entry_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Ledger entry {entry_id}")))?;
        Ok(serde_json::from_slice(value.value())?)
    }

    /// Append a manual entry and apply it to the wallet balance as one unit
    /// of work. Returns the entry and the updated wallet.
    pub fn record_transaction(
        &self,
        entry: NewLedgerEntry,
    ) -> StoreResult<(LedgerEntry, Wallet)> {
        let entry = self.new_entry(entry);

        let write_txn = self.db.begin_write()?;
        let wallet = adjust_balance(&write_txn, &entry.wallet_id, entry.kind, entry.amount)?;
        insert_entry(&write_txn, &entry)?;
        write_txn.commit()?;

        Ok((entry, wallet))
    }

    /// Entries of a wallet created within `[from, to]`, newest first.
    ///
    /// Either bound may be open.
    pub fn list_by_wallet_between(
        &self,
        wallet_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_LEDGER_INDEX)?;
        let table = read_txn.open_table(LEDGER)?;

        let prefix = make_ledger_prefix(wallet_id);
        let mut start = prefix.clone();
        if let Some(to) = to {
            start.extend_from_slice(&inverted_micros(to));
        }
        // Keys past this timestamp are older than `from`.
        let oldest = from.map(inverted_micros);
        let ts_range = prefix.len()..prefix.len() + 8;

        let mut entries = Vec::with_capacity(limit.min(256));
        for entry in index.range(start.as_slice()..)? {
            if entries.len() >= limit {
                break;
            }
            let entry = entry?;
            let key = entry.0.value();
            if !key.starts_with(&prefix) {
                break;
            }
            if oldest.is_some_and(|oldest| key[ts_range.clone()] > oldest[..]) {
                break;
            }
            if let Some(value) = table.get(entry.1.value())? {
                entries.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(entries)
    }

    fn new_entry(&self, entry: NewLedgerEntry) -> LedgerEntry {
        LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: entry.wallet_id,
            kind: entry.kind,
            amount: entry.amount,
            currency: entry.currency,
            description: entry.description,
            created_at: self.clock.now(),
            executed_at: entry.executed_at,
            recurring_id: entry.recurring_id,
            scheduled_for: entry.scheduled_for,
        }
    }
}

// =============================================================================
// Write Transaction Helpers
// =============================================================================

fn load_recurring(write_txn: &WriteTransaction, id: &str) -> StoreResult<RecurringItem> {
    let table = write_txn.open_table(RECURRING)?;
    let value = table
        .get(id)?
        .ok_or_else(|| StoreError::NotFound(format!("Recurring item {id}")))?;
    let item = serde_json::from_slice(value.value())?;
    Ok(item)
}

/// Write `item` and move its due-index entry from `previous`'s slot.
fn put_recurring(
    write_txn: &WriteTransaction,
    item: &RecurringItem,
    previous: Option<&RecurringItem>,
) -> StoreResult<()> {
    let json = serde_json::to_vec(item)?;
    {
        let mut table = write_txn.open_table(RECURRING)?;
        table.insert(item.id.as_str(), json.as_slice())?;
    }

    let mut index = write_txn.open_table(DUE_INDEX)?;
    if let Some(next) = previous.and_then(|p| p.next_execution) {
        index.remove(make_due_key(next, &item.id).as_slice())?;
    }
    if item.status == RecurringStatus::Active {
        if let Some(next) = item.next_execution {
            index.insert(make_due_key(next, &item.id).as_slice(), item.id.as_str())?;
        }
    }
    Ok(())
}

fn insert_entry(write_txn: &WriteTransaction, entry: &LedgerEntry) -> StoreResult<()> {
    let json = serde_json::to_vec(entry)?;
    {
        let mut table = write_txn.open_table(LEDGER)?;
        table.insert(entry.id.as_str(), json.as_slice())?;
    }
    let mut index = write_txn.open_table(WALLET_LEDGER_INDEX)?;
    let key = make_ledger_key(&entry.wallet_id, entry.created_at, &entry.id);
    index.insert(key.as_slice(), entry.id.as_str())?;
    Ok(())
}

/// Apply `amount` of `kind` to the wallet's balance and persist it.
fn adjust_balance(
    write_txn: &WriteTransaction,
    wallet_id: &str,
    kind: EntryKind,
    amount: Decimal,
) -> StoreResult<Wallet> {
    let mut table = write_txn.open_table(WALLETS)?;

    // Read existing value and deserialize before mutating
    let mut wallet: Wallet = {
        let existing = table
            .get(wallet_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Wallet {wallet_id}")))?;
        serde_json::from_slice(existing.value())?
    };
    wallet.balance = kind
        .apply(wallet.balance, amount)
        .ok_or_else(|| StoreError::BalanceOverflow(format!("Wallet {wallet_id}")))?;

    let json = serde_json::to_vec(&wallet)?;
    table.insert(wallet_id, json.as_slice())?;
    Ok(wallet)
}

// =============================================================================
// Store Interfaces
// =============================================================================

impl RecurringStore for LedgerDatabase {
    fn find_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecurringItem>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(DUE_INDEX)?;
        let table = read_txn.open_table(RECURRING)?;

        let start: &[u8] = &[];
        let bound = make_due_bound(now);

        let mut due = Vec::new();
        for entry in index.range(start..bound.as_slice())? {
            let entry = entry?;
            let id = entry.1.value();
            match table.get(id)? {
                Some(value) => {
                    let item: RecurringItem = serde_json::from_slice(value.value())?;
                    due.push(item);
                }
                None => {
                    tracing::warn!(recurring_id = %id, "Due index points at a missing item");
                }
            }
        }
        Ok(due)
    }

    fn get_recurring(&self, id: &str) -> StoreResult<RecurringItem> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECURRING)?;
        let value = table
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("Recurring item {id}")))?;
        Ok(serde_json::from_slice(value.value())?)
    }

    fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        let previous = load_recurring(&write_txn, id)?;
        let mut item = previous.clone();
        item.next_execution = next;
        put_recurring(&write_txn, &item, Some(&previous))?;
        write_txn.commit()?;
        Ok(())
    }
}

impl LedgerStore for LedgerDatabase {
    fn append(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        let entry = self.new_entry(entry);
        let write_txn = self.db.begin_write()?;
        insert_entry(&write_txn, &entry)?;
        write_txn.commit()?;
        Ok(entry)
    }

    fn list_by_wallet(&self, wallet_id: &str, limit: usize) -> StoreResult<Vec<LedgerEntry>> {
        self.list_by_wallet_between(wallet_id, None, None, limit)
    }
}

impl WalletStore for LedgerDatabase {
    fn get_wallet(&self, id: &str) -> StoreResult<Wallet> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        let value = table
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("Wallet {id}")))?;
        Ok(serde_json::from_slice(value.value())?)
    }

    fn set_balance(&self, id: &str, balance: Decimal) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;

            // Read existing value and deserialize before mutating
            let mut wallet: Wallet = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StoreError::NotFound(format!("Wallet {id}")))?;
                serde_json::from_slice(existing.value())?
            };
            wallet.balance = balance;

            let json = serde_json::to_vec(&wallet)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl PaymentStore for LedgerDatabase {
    fn apply_payment(&self, payment: &Payment) -> StoreResult<PaymentOutcome> {
        let applied_key = make_applied_key(&payment.recurring_id, payment.scheduled_for);

        let write_txn = self.db.begin_write()?;

        let already_applied = {
            let table = write_txn.open_table(APPLIED_PAYMENTS)?;
            let existing = table.get(applied_key.as_str())?;
            existing.map(|value| value.value().to_string())
        };
        if let Some(entry_id) = already_applied {
            write_txn.abort()?;
            return Ok(PaymentOutcome::AlreadyApplied { entry_id });
        }

        // The scan snapshot may be outdated; book only the occurrence the
        // stored item still expects.
        let current = load_recurring(&write_txn, &payment.recurring_id)?;
        if current.status != RecurringStatus::Active
            || current.next_execution != Some(payment.scheduled_for)
        {
            write_txn.abort()?;
            return Ok(PaymentOutcome::Stale);
        }

        let wallet = adjust_balance(&write_txn, &payment.wallet_id, payment.kind, payment.amount)?;

        let entry = self.new_entry(payment.to_entry());
        insert_entry(&write_txn, &entry)?;

        {
            let mut table = write_txn.open_table(APPLIED_PAYMENTS)?;
            table.insert(applied_key.as_str(), entry.id.as_str())?;
        }

        write_txn.commit()?;
        Ok(PaymentOutcome::Applied { entry, wallet })
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Records persisted by the ledger database and exchanged between the
//! scheduler, the services and the stores.
//!
//! ## Model Categories
//!
//! - **Recurring items**: templates for repeating income or expenses
//! - **Ledger entries**: immutable transaction history
//! - **Wallets**: balances owned by a user
//! - **Payments**: one materialization request handed to the store

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Recurring Items
// =============================================================================

/// Whether a recurring item adds to or draws from its wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money flowing into the wallet
    Income,
    /// Money flowing out of the wallet
    Expense,
}

/// How often a recurring item repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    /// Every day
    Daily,
    /// Every seven days
    Weekly,
    /// Every calendar month, on the start date's day of month
    Monthly,
    /// A stored value this version does not understand
    #[serde(other)]
    Unrecognized,
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
            RecurrencePattern::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// Lifecycle of a recurring item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurringStatus {
    /// Executed on schedule
    #[default]
    Active,
    /// Temporarily disabled by the owner
    Paused,
    /// Terminally removed by the owner
    Cancelled,
}

/// A template describing a repeating income or expense and its cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringItem {
    /// Unique identifier (UUID)
    pub id: String,
    /// Owner user ID
    pub user_id: String,
    /// Wallet the payments are booked against
    pub wallet_id: String,
    pub direction: Direction,
    /// Always positive; the direction carries the sign
    pub amount: Decimal,
    /// Currency code (e.g. "EUR")
    pub currency: String,
    pub description: String,
    pub pattern: RecurrencePattern,
    /// Anchor of the series; occurrences are computed from this date
    pub start_date: NaiveDate,
    /// Last day (inclusive) on which an occurrence may fall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// When the scheduler should next materialize this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RecurringStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringItem {
    /// Whether the scheduler should pick this item up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == RecurringStatus::Active
            && self.next_execution.is_some_and(|next| next <= now)
    }

    /// The ledger kind produced when this item is materialized.
    pub fn entry_kind(&self) -> EntryKind {
        match self.direction {
            Direction::Income => EntryKind::Income,
            Direction::Expense => EntryKind::Expense,
        }
    }
}

/// Fields supplied by the owner when creating a recurring item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurringItem {
    pub user_id: String,
    pub wallet_id: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    pub pattern: RecurrencePattern,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

// =============================================================================
// Ledger Entries
// =============================================================================

/// Kind of a ledger entry. The amount is stored unsigned; the kind carries
/// the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
    Transfer,
}

impl EntryKind {
    /// Apply an amount of this kind to a balance. `None` on overflow.
    ///
    /// Transfers are balanced elsewhere and leave the balance unchanged.
    pub fn apply(self, balance: Decimal, amount: Decimal) -> Option<Decimal> {
        match self {
            EntryKind::Income => balance.checked_add(amount),
            EntryKind::Expense => balance.checked_sub(amount),
            EntryKind::Transfer => Some(balance),
        }
    }
}

/// Immutable transaction history record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    /// Unique identifier (UUID), assigned by the store
    pub id: String,
    pub wallet_id: String,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    /// Assigned by the store on insert
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    /// Recurring item this entry was materialized from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_id: Option<String>,
    /// The occurrence of the recurring item this entry settles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// A ledger entry before the store has assigned its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub wallet_id: String,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub executed_at: Option<DateTime<Utc>>,
    pub recurring_id: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// A manual transaction entered by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub wallet_id: String,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    /// When the transaction happened, now when omitted
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Wallets
// =============================================================================

/// Kind of wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Cash,
    CreditCard,
    Crypto,
}

/// A wallet holding the owner's current funds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    /// Unique identifier (UUID)
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub currency: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the owner when opening a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWallet {
    pub user_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub currency: String,
    /// Opening balance, zero when omitted
    #[serde(default)]
    pub balance: Option<Decimal>,
}

// =============================================================================
// Payments
// =============================================================================

/// One occurrence of a recurring item to be booked atomically: ledger insert
/// plus balance update.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub recurring_id: String,
    pub wallet_id: String,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    /// The `next_execution` value being settled; the idempotency key
    pub scheduled_for: DateTime<Utc>,
    /// Tick time
    pub executed_at: DateTime<Utc>,
}

impl Payment {
    /// Build the payment for `item`'s pending occurrence at tick time `now`.
    ///
    /// Returns `None` when the item has no pending occurrence.
    pub fn for_item(item: &RecurringItem, now: DateTime<Utc>) -> Option<Self> {
        let scheduled_for = item.next_execution?;
        Some(Self {
            recurring_id: item.id.clone(),
            wallet_id: item.wallet_id.clone(),
            kind: item.entry_kind(),
            amount: item.amount,
            currency: item.currency.clone(),
            description: item.description.clone(),
            scheduled_for,
            executed_at: now,
        })
    }

    /// The ledger entry this payment produces.
    pub fn to_entry(&self) -> NewLedgerEntry {
        NewLedgerEntry {
            wallet_id: self.wallet_id.clone(),
            kind: self.kind,
            amount: self.amount,
            currency: self.currency.clone(),
            description: self.description.clone(),
            executed_at: Some(self.executed_at),
            recurring_id: Some(self.recurring_id.clone()),
            scheduled_for: Some(self.scheduled_for),
        }
    }
}

/// Result of booking a payment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The entry was appended and the balance updated.
    Applied { entry: LedgerEntry, wallet: Wallet },
    /// This occurrence was already booked; nothing changed.
    AlreadyApplied { entry_id: String },
    /// The item was paused, cancelled or rescheduled after it was scanned;
    /// nothing changed.
    Stale,
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet operations, manual transactions and ledger history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{LedgerEntry, NewLedgerEntry, NewTransaction, NewWallet, Wallet};
use crate::storage::{LedgerDatabase, WalletStore};

/// Default page size for ledger history.
pub const DEFAULT_LEDGER_LIMIT: usize = 50;

pub struct WalletService<'a> {
    db: &'a LedgerDatabase,
    clock: &'a dyn Clock,
}

impl<'a> WalletService<'a> {
    pub fn new(db: &'a LedgerDatabase, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Open a wallet with the given (or a zero) opening balance.
    pub fn create_wallet(&self, new: NewWallet) -> SchedulerResult<Wallet> {
        if new.name.trim().is_empty() {
            return Err(SchedulerError::validation("wallet name is required"));
        }
        if new.currency.trim().is_empty() {
            return Err(SchedulerError::validation("currency is required"));
        }

        let wallet = Wallet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            name: new.name,
            kind: new.kind,
            currency: new.currency,
            balance: new.balance.unwrap_or_default(),
            created_at: self.clock.now(),
        };
        self.db.create_wallet(&wallet)?;

        info!(wallet_id = %wallet.id, kind = ?wallet.kind, "Created wallet");
        Ok(wallet)
    }

    pub fn get_wallet(&self, id: &str) -> SchedulerResult<Wallet> {
        Ok(self.db.get_wallet(id)?)
    }

    /// A user's wallets, oldest first.
    pub fn list_by_user(&self, user_id: &str) -> SchedulerResult<Vec<Wallet>> {
        let mut wallets = self.db.list_wallets_by_user(user_id)?;
        wallets.sort_by_key(|wallet| wallet.created_at);
        Ok(wallets)
    }

    /// Record a manual income, expense or transfer and apply it to the
    /// wallet balance in the same write. Transfers leave the balance as is.
    ///
    /// Returns the entry and the wallet after the change.
    pub fn record_transaction(
        &self,
        new: NewTransaction,
    ) -> SchedulerResult<(LedgerEntry, Wallet)> {
        if new.amount <= Decimal::ZERO {
            return Err(SchedulerError::validation("amount must be positive"));
        }
        let wallet = self.db.get_wallet(&new.wallet_id)?;
        if new.currency != wallet.currency {
            return Err(SchedulerError::validation(format!(
                "currency {} does not match wallet currency {}",
                new.currency, wallet.currency
            )));
        }

        let (entry, wallet) = self.db.record_transaction(NewLedgerEntry {
            wallet_id: new.wallet_id,
            kind: new.kind,
            amount: new.amount,
            currency: new.currency,
            description: new.description,
            executed_at: Some(new.executed_at.unwrap_or_else(|| self.clock.now())),
            recurring_id: None,
            scheduled_for: None,
        })?;

        info!(
            wallet_id = %wallet.id,
            entry_id = %entry.id,
            kind = ?entry.kind,
            amount = %entry.amount,
            balance = %wallet.balance,
            "Recorded transaction"
        );
        Ok((entry, wallet))
    }

    pub fn get_transaction(&self, entry_id: &str) -> SchedulerResult<LedgerEntry> {
        Ok(self.db.get_entry(entry_id)?)
    }

    /// Most recent ledger entries of a wallet, newest first, optionally
    /// restricted to entries recorded within `[from, to]`.
    pub fn ledger(
        &self,
        wallet_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> SchedulerResult<Vec<LedgerEntry>> {
        // Distinguish an unknown wallet from an empty history.
        self.db.get_wallet(wallet_id)?;
        Ok(self.db.list_by_wallet_between(wallet_id, from, to, limit)?)
    }
}

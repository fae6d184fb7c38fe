// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recurring item lifecycle: create, inspect, pause, resume and cancel.
//!
//! Status transitions:
//! - `active -> paused` via [`RecurringService::pause`]
//! - `paused -> active` via [`RecurringService::resume`]
//! - `active | paused -> cancelled` via [`RecurringService::cancel`]
//!
//! Cancelled items are kept for history but never listed or scheduled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{NewRecurringItem, RecurringItem, RecurringStatus};
use crate::scheduler::{next_execution_for, scan_due};
use crate::storage::{LedgerDatabase, RecurringStore, WalletStore};

/// Use-case layer for recurring items.
pub struct RecurringService<'a> {
    db: &'a LedgerDatabase,
    clock: &'a dyn Clock,
}

impl<'a> RecurringService<'a> {
    pub fn new(db: &'a LedgerDatabase, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Validate and persist a new recurring item.
    ///
    /// The wallet must exist and belong to the same user. The first execution
    /// is the start date when that lies in the future, otherwise the first
    /// occurrence after now.
    pub fn create_recurring(&self, new: NewRecurringItem) -> SchedulerResult<RecurringItem> {
        if new.amount <= Decimal::ZERO {
            return Err(SchedulerError::validation("amount must be positive"));
        }
        if new.currency.trim().is_empty() {
            return Err(SchedulerError::validation("currency is required"));
        }
        if new.end_date.is_some_and(|end| end < new.start_date) {
            return Err(SchedulerError::validation(
                "end date must not precede start date",
            ));
        }

        let wallet = self.db.get_wallet(&new.wallet_id)?;
        if wallet.user_id != new.user_id {
            return Err(SchedulerError::NotFound(format!("Wallet {}", new.wallet_id)));
        }

        let now = self.clock.now();
        let mut item = RecurringItem {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            wallet_id: new.wallet_id,
            direction: new.direction,
            amount: new.amount,
            currency: new.currency,
            description: new.description,
            pattern: new.pattern,
            start_date: new.start_date,
            end_date: new.end_date,
            next_execution: None,
            status: RecurringStatus::Active,
            created_at: now,
            updated_at: now,
        };
        item.next_execution = next_execution_for(&item, now);

        self.db.create_recurring(&item)?;
        info!(
            recurring_id = %item.id,
            wallet_id = %item.wallet_id,
            pattern = %item.pattern,
            next_execution = ?item.next_execution,
            "Created recurring item"
        );
        Ok(item)
    }

    pub fn get_recurring(&self, id: &str) -> SchedulerResult<RecurringItem> {
        Ok(self.db.get_recurring(id)?)
    }

    /// A user's items, cancelled ones excluded, soonest first.
    pub fn list_by_user(&self, user_id: &str) -> SchedulerResult<Vec<RecurringItem>> {
        let mut items: Vec<_> = self
            .db
            .list_recurring_by_user(user_id)?
            .into_iter()
            .filter(|item| item.status != RecurringStatus::Cancelled)
            .collect();
        // Items that will never run again sort last.
        items.sort_by_key(|item| (item.next_execution.is_none(), item.next_execution));
        Ok(items)
    }

    /// Items the scheduler would pick up at `now`.
    pub fn list_due(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<RecurringItem>> {
        scan_due(self.db, now)
    }

    /// Stop scheduling an active item.
    pub fn pause(&self, id: &str) -> SchedulerResult<RecurringItem> {
        let mut item = self.db.get_recurring(id)?;
        if item.status != RecurringStatus::Active {
            return Err(SchedulerError::validation(format!(
                "recurring item {id} is not active"
            )));
        }
        item.status = RecurringStatus::Paused;
        self.save(item, "Paused recurring item")
    }

    /// Reactivate a paused item.
    ///
    /// The next execution is recomputed from now, so occurrences that fell
    /// inside the pause are skipped rather than booked late.
    pub fn resume(&self, id: &str) -> SchedulerResult<RecurringItem> {
        let mut item = self.db.get_recurring(id)?;
        if item.status != RecurringStatus::Paused {
            return Err(SchedulerError::validation(format!(
                "recurring item {id} is not paused"
            )));
        }
        item.status = RecurringStatus::Active;
        item.next_execution = next_execution_for(&item, self.clock.now());
        self.save(item, "Resumed recurring item")
    }

    /// Logically delete an item.
    pub fn cancel(&self, id: &str) -> SchedulerResult<RecurringItem> {
        let mut item = self.db.get_recurring(id)?;
        if item.status == RecurringStatus::Cancelled {
            return Err(SchedulerError::validation(format!(
                "recurring item {id} is already cancelled"
            )));
        }
        item.status = RecurringStatus::Cancelled;
        self.save(item, "Cancelled recurring item")
    }

    fn save(&self, mut item: RecurringItem, message: &str) -> SchedulerResult<RecurringItem> {
        item.updated_at = self.clock.now();
        self.db.update_recurring(&item)?;
        info!(recurring_id = %item.id, status = ?item.status, "{message}");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Direction, RecurrencePattern};
    use crate::test_support::{date, dec, sample_wallet, temp_db, ts};

    fn new_item(pattern: RecurrencePattern, start: chrono::NaiveDate) -> NewRecurringItem {
        NewRecurringItem {
            user_id: "user-1".to_string(),
            wallet_id: "wallet-1".to_string(),
            direction: Direction::Expense,
            amount: dec("25.00"),
            currency: "EUR".to_string(),
            description: "Gym".to_string(),
            pattern,
            start_date: start,
            end_date: None,
        }
    }

    #[test]
    fn future_start_date_is_first_execution() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 5, 10));
        let service = RecurringService::new(&db, &clock);

        let item = service
            .create_recurring(new_item(RecurrencePattern::Monthly, date(2024, 4, 1)))
            .unwrap();

        assert_eq!(item.status, RecurringStatus::Active);
        assert_eq!(item.next_execution, Some(ts(2024, 4, 1, 0)));
        assert_eq!(service.get_recurring(&item.id).unwrap(), item);
    }

    #[test]
    fn past_start_date_advances_past_now() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 5, 10));
        let service = RecurringService::new(&db, &clock);

        let item = service
            .create_recurring(new_item(RecurrencePattern::Weekly, date(2024, 2, 1)))
            .unwrap();

        // 2024-02-01 is a Thursday; the next Thursday after 03-05 is 03-07.
        assert_eq!(item.next_execution, Some(ts(2024, 3, 7, 0)));
        assert!(service.list_due(clock.now()).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_invalid_input() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 5, 10));
        let service = RecurringService::new(&db, &clock);

        let mut zero = new_item(RecurrencePattern::Daily, date(2024, 3, 1));
        zero.amount = Decimal::ZERO;
        assert!(matches!(
            service.create_recurring(zero),
            Err(SchedulerError::Validation(_))
        ));

        let mut no_currency = new_item(RecurrencePattern::Daily, date(2024, 3, 1));
        no_currency.currency = "  ".to_string();
        assert!(matches!(
            service.create_recurring(no_currency),
            Err(SchedulerError::Validation(_))
        ));

        let mut inverted = new_item(RecurrencePattern::Daily, date(2024, 3, 10));
        inverted.end_date = Some(date(2024, 3, 1));
        assert!(matches!(
            service.create_recurring(inverted),
            Err(SchedulerError::Validation(_))
        ));
    }

    #[test]
    fn create_requires_owned_wallet() {
        let (db, _dir) = temp_db();
        let mut foreign = sample_wallet("wallet-2", "0");
        foreign.user_id = "user-2".to_string();
        db.create_wallet(&foreign).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 5, 10));
        let service = RecurringService::new(&db, &clock);

        assert!(matches!(
            service.create_recurring(new_item(RecurrencePattern::Daily, date(2024, 3, 1))),
            Err(SchedulerError::NotFound(_))
        ));

        let mut other = new_item(RecurrencePattern::Daily, date(2024, 3, 1));
        other.wallet_id = "wallet-2".to_string();
        assert!(matches!(
            service.create_recurring(other),
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[test]
    fn paused_item_is_not_due_and_resume_skips_missed_occurrences() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 1, 10));
        let service = RecurringService::new(&db, &clock);

        let item = service
            .create_recurring(new_item(RecurrencePattern::Daily, date(2024, 3, 1)))
            .unwrap();
        assert_eq!(item.next_execution, Some(ts(2024, 3, 2, 0)));

        service.pause(&item.id).unwrap();
        clock.set(ts(2024, 3, 10, 12));
        assert!(service.list_due(clock.now()).unwrap().is_empty());

        let resumed = service.resume(&item.id).unwrap();
        assert_eq!(resumed.status, RecurringStatus::Active);
        assert_eq!(resumed.next_execution, Some(ts(2024, 3, 11, 0)));
        assert_eq!(resumed.updated_at, ts(2024, 3, 10, 12));

        clock.set(ts(2024, 3, 11, 0));
        assert_eq!(service.list_due(clock.now()).unwrap().len(), 1);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 1, 10));
        let service = RecurringService::new(&db, &clock);
        let item = service
            .create_recurring(new_item(RecurrencePattern::Daily, date(2024, 3, 1)))
            .unwrap();

        assert!(matches!(
            service.resume(&item.id),
            Err(SchedulerError::Validation(_))
        ));
        service.cancel(&item.id).unwrap();
        assert!(matches!(
            service.pause(&item.id),
            Err(SchedulerError::Validation(_))
        ));
        assert!(matches!(
            service.cancel(&item.id),
            Err(SchedulerError::Validation(_))
        ));
        assert!(matches!(
            service.pause("missing"),
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[test]
    fn cancelled_items_are_hidden_and_never_due() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 1, 10));
        let service = RecurringService::new(&db, &clock);

        let keep = service
            .create_recurring(new_item(RecurrencePattern::Weekly, date(2024, 3, 1)))
            .unwrap();
        let drop = service
            .create_recurring(new_item(RecurrencePattern::Daily, date(2024, 3, 1)))
            .unwrap();
        service.cancel(&drop.id).unwrap();

        let listed = service.list_by_user("user-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);

        clock.set(ts(2024, 4, 1, 0));
        let due = service.list_due(clock.now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, keep.id);

        // Still retrievable for history.
        assert_eq!(
            service.get_recurring(&drop.id).unwrap().status,
            RecurringStatus::Cancelled
        );
    }

    #[test]
    fn list_by_user_orders_by_next_execution() {
        let (db, _dir) = temp_db();
        db.create_wallet(&sample_wallet("wallet-1", "100.00")).unwrap();
        let clock = ManualClock::new(ts(2024, 3, 1, 10));
        let service = RecurringService::new(&db, &clock);

        let monthly = service
            .create_recurring(new_item(RecurrencePattern::Monthly, date(2024, 3, 1)))
            .unwrap();
        let daily = service
            .create_recurring(new_item(RecurrencePattern::Daily, date(2024, 3, 1)))
            .unwrap();

        let ids: Vec<_> = service
            .list_by_user("user-1")
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![daily.id, monthly.id]);
        assert!(service.list_by_user("user-2").unwrap().is_empty());
    }
}

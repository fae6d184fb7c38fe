// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Recurring Payment Scheduler
//!
//! Background task that periodically books due recurring items into the
//! ledger and wallet balances.
//!
//! ## Strategy
//!
//! Every `period` (default one hour) the scheduler runs one tick:
//! 1. Scans the store for active items whose next execution has elapsed.
//! 2. For each item, independently, books the pending occurrence
//!    ([`materialize`]) and then moves the next execution past the tick
//!    ([`reschedule`]).
//! 3. Logs and counts per-item failures without aborting the batch. A failed
//!    item keeps its next execution and is retried on the next tick.
//!
//! If the scan itself fails, the tick is skipped and retried on the next
//! timer fire.
//!
//! ## Concurrency
//!
//! Items run on blocking worker threads, at most `max_concurrency` at once.
//! Items sharing a wallet serialize on that wallet's lock in [`WalletLocks`].
//! Ticks never overlap (see [`periodic::run_periodic`]).
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. An
//! in-flight tick always completes before the loop exits.

pub mod materializer;
pub mod periodic;
pub mod rescheduler;
pub mod rewards;
pub mod wallet_locks;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PAYMENT_TICK};
use crate::error::SchedulerResult;
use crate::models::{RecurrencePattern, RecurringItem};
use crate::storage::{PaymentStore, RecurringStore};

pub use materializer::{materialize, Materialized};
pub use rescheduler::{next_execution_for, reschedule};
pub use rewards::RewardScheduler;
pub use wallet_locks::WalletLocks;

/// Counts for one payment tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Items found due by the scan
    pub due: usize,
    /// Items booked and rescheduled in this tick
    pub booked: usize,
    /// Items whose occurrence was already booked and were only rescheduled
    pub already_booked: usize,
    /// Items paused, cancelled or rescheduled between scan and booking
    pub stale: usize,
    /// Items left due for the next tick
    pub failed: usize,
}

/// Items whose occurrence is due at `now`.
///
/// Re-checks the due predicate on everything the store returns.
pub fn scan_due<S>(store: &S, now: DateTime<Utc>) -> SchedulerResult<Vec<RecurringItem>>
where
    S: RecurringStore + ?Sized,
{
    let items = store.find_due(now)?;
    Ok(items.into_iter().filter(|item| item.is_due(now)).collect())
}

/// Book and reschedule one due item.
pub fn process_item<S>(
    store: &S,
    locks: &WalletLocks,
    item: &RecurringItem,
    now: DateTime<Utc>,
) -> SchedulerResult<Materialized>
where
    S: PaymentStore + ?Sized,
{
    if item.pattern == RecurrencePattern::Unrecognized {
        warn!(
            recurring_id = %item.id,
            "Unrecognized recurrence pattern, rescheduling one day ahead"
        );
    }

    let materialized = materialize(store, locks, item, now)?;
    if materialized == Materialized::Stale {
        return Ok(materialized);
    }
    let next = reschedule(store, item, now)?;
    debug!(
        recurring_id = %item.id,
        next_execution = ?next,
        "Rescheduled recurring item"
    );
    Ok(materialized)
}

/// Background job booking due recurring payments.
pub struct PaymentScheduler<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: Arc<WalletLocks>,
    period: Duration,
    max_concurrency: usize,
}

impl<S> PaymentScheduler<S>
where
    S: PaymentStore + Send + Sync + 'static,
{
    /// Create a scheduler over the given store.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: Arc::new(WalletLocks::new()),
            period: DEFAULT_PAYMENT_TICK,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Share wallet locks with other writers of the same store.
    pub fn with_wallet_locks(mut self, locks: Arc<WalletLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Run the scheduler loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(scheduler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.period.as_secs(),
            max_concurrency = self.max_concurrency,
            "Recurring payment scheduler starting"
        );
        let this = &self;
        run_tick_loop(this, shutdown).await;
    }

    /// Run one tick at the clock's current time.
    pub async fn tick(&self) -> SchedulerResult<TickReport> {
        self.tick_at(self.clock.now()).await
    }

    /// Run one tick as if the current time were `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> SchedulerResult<TickReport> {
        let due = match scan_due(self.store.as_ref(), now) {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Payment tick: scan failed, skipping tick");
                return Err(e);
            }
        };

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        if due.is_empty() {
            debug!(tick_at = %now, "Payment tick: nothing due");
            return Ok(report);
        }

        info!(count = due.len(), tick_at = %now, "Payment tick: processing due items");

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for item in due {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let store = Arc::clone(&self.store);
            let locks = Arc::clone(&self.locks);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = process_item(store.as_ref(), &locks, &item, now);
                (item, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(Materialized::Booked(entry)))) => {
                    report.booked += 1;
                    info!(
                        recurring_id = ?entry.recurring_id,
                        wallet_id = %entry.wallet_id,
                        entry_id = %entry.id,
                        amount = %entry.amount,
                        "Payment tick: booked recurring payment"
                    );
                }
                Ok((item, Ok(Materialized::AlreadyBooked { entry_id }))) => {
                    report.already_booked += 1;
                    info!(
                        recurring_id = %item.id,
                        entry_id = %entry_id,
                        "Payment tick: occurrence was already booked, rescheduled"
                    );
                }
                Ok((item, Ok(Materialized::Stale))) => {
                    report.stale += 1;
                    info!(
                        recurring_id = %item.id,
                        "Payment tick: item changed since scan, skipped"
                    );
                }
                Ok((item, Err(e))) => {
                    report.failed += 1;
                    warn!(
                        recurring_id = %item.id,
                        wallet_id = %item.wallet_id,
                        error = %e,
                        "Payment tick: failed to process recurring item"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "Payment tick: item worker panicked");
                }
            }
        }

        self.locks.prune();
        debug!(tracked_wallets = self.locks.len(), "Pruned wallet locks");

        info!(
            due = report.due,
            booked = report.booked,
            already_booked = report.already_booked,
            stale = report.stale,
            failed = report.failed,
            "Payment tick complete"
        );
        Ok(report)
    }
}

async fn run_tick_loop<S>(scheduler: &PaymentScheduler<S>, shutdown: CancellationToken)
where
    S: PaymentStore + Send + Sync + 'static,
{
    periodic::run_periodic(
        "recurring payments",
        scheduler.period,
        shutdown,
        move || async move {
            // Errors are logged inside the tick; the next timer fire retries.
            let _ = scheduler.tick().await;
        },
    )
    .await;
}

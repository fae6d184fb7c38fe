// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Investment Reward Scheduler
//!
//! Daily timer reserved for investment reward accrual. No accrual rules are
//! defined for it yet, so each tick only records that it ran.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::periodic::run_periodic;
use crate::clock::Clock;
use crate::config::DEFAULT_REWARD_TICK;

/// Background job driving the daily reward tick.
pub struct RewardScheduler {
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl RewardScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            period: DEFAULT_REWARD_TICK,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Run the reward loop until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.period.as_secs(),
            "Investment reward scheduler starting"
        );
        let this = &self;
        run_periodic("investment rewards", self.period, shutdown, move || async move {
            this.tick();
        })
        .await;
    }

    /// One reward tick. Returns the tick time.
    pub fn tick(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        info!(tick_at = %now, "Processing investment rewards: no accrual configured");
        now
    }
}

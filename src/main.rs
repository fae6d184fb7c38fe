// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recurring_ledger::clock::{Clock, SystemClock};
use recurring_ledger::config::{LogFormat, SchedulerConfig};
use recurring_ledger::scheduler::{PaymentScheduler, RewardScheduler};
use recurring_ledger::storage::LedgerDatabase;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_target(false).compact().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = SchedulerConfig::from_env();
    init_tracing(config.log_format);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db_path = config.database_path();
    let db = match LedgerDatabase::open(&db_path) {
        Ok(db) => Arc::new(db.with_clock(Arc::clone(&clock))),
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "Failed to open ledger database");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %db_path.display(), "Opened ledger database");

    let shutdown = CancellationToken::new();

    let payments = PaymentScheduler::new(db, Arc::clone(&clock))
        .with_period(config.payment_tick)
        .with_max_concurrency(config.max_concurrency);
    let rewards = RewardScheduler::new(clock).with_period(config.reward_tick);

    let payment_task = tokio::spawn(payments.run(shutdown.clone()));
    let reward_task = tokio::spawn(rewards.run(shutdown.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested, waiting for schedulers to finish");
    shutdown.cancel();

    let mut code = ExitCode::SUCCESS;
    for (job, task) in [("payments", payment_task), ("rewards", reward_task)] {
        if let Err(e) = task.await {
            error!(job, error = %e, "Scheduler task failed");
            code = ExitCode::FAILURE;
        }
    }

    info!("Shutdown complete");
    code
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Timer loop shared by the background jobs.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Call `tick` every `period` until `shutdown` is cancelled.
///
/// The first tick fires immediately. Ticks never overlap: a tick that
/// overruns its period delays the next one instead of running beside it.
/// Cancellation is only observed between ticks, so an in-flight tick always
/// runs to completion.
///
/// Should be awaited from a spawned background task:
/// ```rust,ignore
/// tokio::spawn(run_periodic("payments", period, shutdown.clone(), || job.tick()));
/// ```
pub async fn run_periodic<F, Fut>(
    job: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(job, "Scheduler shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn cancelled_token_stops_before_first_tick() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let counter = AtomicUsize::new(0);
        let ticks = &counter;
        run_periodic("test", Duration::from_millis(10), shutdown, move || async move {
            ticks.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ticks_repeat_until_cancelled() {
        let shutdown = CancellationToken::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let task = {
            let shutdown = shutdown.clone();
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                run_periodic("test", Duration::from_millis(5), shutdown, move || {
                    let ticks = Arc::clone(&ticks);
                    async move {
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop should stop after cancellation")
            .unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn slow_ticks_never_overlap() {
        let shutdown = CancellationToken::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));

        let task = {
            let shutdown = shutdown.clone();
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                run_periodic("test", Duration::from_millis(5), shutdown, move || {
                    let inside = Arc::clone(&inside);
                    let max_inside = Arc::clone(&max_inside);
                    let ticks = Arc::clone(&ticks);
                    async move {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop should stop after cancellation")
            .unwrap();

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(ticks.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn in_flight_tick_finishes_after_cancellation() {
        let shutdown = CancellationToken::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let task = {
            let shutdown = shutdown.clone();
            let finished = Arc::clone(&finished);
            let cancel_inside = shutdown.clone();
            tokio::spawn(async move {
                run_periodic("test", Duration::from_secs(3600), shutdown, move || {
                    let finished = Arc::clone(&finished);
                    let cancel_inside = cancel_inside.clone();
                    async move {
                        cancel_inside.cancel();
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
            })
        };

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop should stop after the tick")
            .unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-wallet exclusive locks.
//!
//! A balance update is a read-modify-write. Two due items booked against the
//! same wallet must not interleave, so each wallet id maps to its own mutex
//! and only one writer holds it at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Hands out one exclusive lock per wallet id.
#[derive(Debug, Default)]
pub struct WalletLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `wallet_id`, created on first use.
    pub fn lock_for(&self, wallet_id: &str) -> Arc<Mutex<()>> {
        let mut locks = lock_recovering(&self.locks);
        Arc::clone(
            locks
                .entry(wallet_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Run `f` while holding the wallet's lock.
    pub fn with_wallet<T>(&self, wallet_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(wallet_id);
        let _guard = lock_recovering(&lock);
        f()
    }

    /// Drop locks nobody is holding or waiting on.
    pub fn prune(&self) {
        let mut locks = lock_recovering(&self.locks);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of wallet ids currently tracked.
    pub(crate) fn len(&self) -> usize {
        lock_recovering(&self.locks).len()
    }
}

/// A poisoned lock only means another item panicked mid-booking; the
/// store's own transaction already rolled that booking back.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_wallet_shares_a_lock() {
        let locks = WalletLocks::new();
        let a = locks.lock_for("wallet-1");
        let b = locks.lock_for("wallet-1");
        let c = locks.lock_for("wallet-2");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn prune_keeps_held_locks() {
        let locks = WalletLocks::new();
        let held = locks.lock_for("wallet-1");
        drop(locks.lock_for("wallet-2"));

        locks.prune();
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.prune();
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn with_wallet_serializes_writers() {
        let locks = Arc::new(WalletLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with_wallet("wallet-1", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}

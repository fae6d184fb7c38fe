// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recurring Ledger - Recurring Payment Scheduler
//!
//! Books recurring income and expense items into an append-only ledger and
//! the owning wallet's balance, on a periodic schedule.
//!
//! ## Modules
//!
//! - `recurrence` - Next-occurrence calculation (daily, weekly, monthly)
//! - `scheduler` - Background jobs: due scan, materialize, reschedule
//! - `service` - Owner-facing wallet and recurring item operations
//! - `storage` - Store interfaces and the embedded redb database
//! - `clock` - Injectable time source

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod scheduler;
pub mod service;
pub mod storage;

#[cfg(test)]
mod test_support;

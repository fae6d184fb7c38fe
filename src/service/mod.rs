// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner-facing operations on wallets and recurring items.
//!
//! Services borrow the database and a clock; they validate input and keep
//! derived fields such as `next_execution` consistent. The scheduler never
//! goes through them.

pub mod recurring;
pub mod wallets;

pub use recurring::RecurringService;
pub use wallets::WalletService;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::storage::StoreError;

/// Errors surfaced by the scheduler and the services.
///
/// - `NotFound`: a referenced wallet or item is missing; aborts only the
///   current item.
/// - `Validation`: malformed input; the item is skipped.
/// - `Storage`: transient storage failure; the item stays due.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl SchedulerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StoreError> for SchedulerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => SchedulerError::NotFound(what),
            StoreError::BalanceOverflow(what) => {
                SchedulerError::Validation(format!("balance overflow: {what}"))
            }
            other => SchedulerError::Storage(other),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

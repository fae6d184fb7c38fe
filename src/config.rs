// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup; missing or unparsable values fall back to the defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `ledger.redb` | `/data` |
//! | `PAYMENT_TICK_SECS` | Period of the recurring payment tick | `3600` |
//! | `REWARD_TICK_SECS` | Period of the investment reward tick | `86400` |
//! | `SCHEDULER_MAX_CONCURRENCY` | Due items processed in parallel per tick | `4` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the payment tick period, in seconds.
pub const PAYMENT_TICK_SECS_ENV: &str = "PAYMENT_TICK_SECS";

/// Environment variable name for the reward tick period, in seconds.
pub const REWARD_TICK_SECS_ENV: &str = "REWARD_TICK_SECS";

/// Environment variable name for per-tick item concurrency.
pub const MAX_CONCURRENCY_ENV: &str = "SCHEDULER_MAX_CONCURRENCY";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "/data";

/// Recurring payments are processed hourly.
pub const DEFAULT_PAYMENT_TICK: Duration = Duration::from_secs(60 * 60);

/// Investment rewards are processed daily.
pub const DEFAULT_REWARD_TICK: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Name of the database file inside the data directory.
pub const DATABASE_FILE: &str = "ledger.redb";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub data_dir: PathBuf,
    pub payment_tick: Duration,
    pub reward_tick: Duration,
    /// Always at least 1.
    pub max_concurrency: usize,
    pub log_format: LogFormat,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            payment_tick: DEFAULT_PAYMENT_TICK,
            reward_tick: DEFAULT_REWARD_TICK,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            log_format: LogFormat::default(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let secs = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            data_dir: lookup(DATA_DIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            payment_tick: secs(PAYMENT_TICK_SECS_ENV, defaults.payment_tick),
            reward_tick: secs(REWARD_TICK_SECS_ENV, defaults.reward_tick),
            max_concurrency: lookup(MAX_CONCURRENCY_ENV)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(defaults.max_concurrency)
                .max(1),
            log_format: lookup(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Full path of the ledger database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

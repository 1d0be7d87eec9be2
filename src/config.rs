// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration for the apply coordinator.

use std::time::Duration;

pub const POLL_INTERVAL_ENV: &str = "DRAWBRIDGE_POLL_INTERVAL_MS";
pub const POLL_ATTEMPTS_ENV: &str = "DRAWBRIDGE_POLL_ATTEMPTS";
pub const TRANSPORT_RETRIES_ENV: &str = "DRAWBRIDGE_TRANSPORT_RETRIES";
pub const TRANSPORT_BACKOFF_ENV: &str = "DRAWBRIDGE_TRANSPORT_BACKOFF_MS";

/// Polling and retry budget. A full poll waits at most `poll_interval * max_poll_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub transport_retries: u32,
    pub transport_backoff: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            max_poll_attempts: 40,
            transport_retries: 3,
            transport_backoff: Duration::from_millis(100),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, keeping defaults for unset or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            parse_or(key, lookup(key), fallback.as_millis() as u64)
                .map_or(fallback, Duration::from_millis)
        };
        let count = |key: &str, fallback: u32| {
            parse_or(key, lookup(key), u64::from(fallback))
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(fallback)
        };

        Self {
            poll_interval: millis(POLL_INTERVAL_ENV, defaults.poll_interval),
            max_poll_attempts: count(POLL_ATTEMPTS_ENV, defaults.max_poll_attempts).max(1),
            transport_retries: count(TRANSPORT_RETRIES_ENV, defaults.transport_retries),
            transport_backoff: millis(TRANSPORT_BACKOFF_ENV, defaults.transport_backoff),
        }
    }

    /// Upper bound on the time one poll may wait for a result.
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_poll_attempts)
    }
}

fn parse_or(key: &str, raw: Option<String>, fallback: u64) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("ignoring {key}={raw:?} ({err}); using {fallback}");
            None
        }
    }
}

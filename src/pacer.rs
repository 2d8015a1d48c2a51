/*
 *  pacer.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Upstream pacing - per tab fetch cadence with exponential backoff
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::time::Duration;
use tokio::time::Instant;

/// First retry delay after an upstream failure
pub const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Retry delay never grows past this
pub const BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Decides when a tab may hit its upstream again.
///
/// After a success the next fetch is due one `interval` later. Each failure
/// in a row doubles the wait from `BACKOFF_BASE` up to `BACKOFF_CAP`. A new
/// throttle is due straight away.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    next_due: Option<Instant>,
    failures: u32,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_due: None, failures: 0 }
    }

    #[inline]
    pub fn is_due(&self) -> bool {
        self.next_due.is_none_or(|due| Instant::now() >= due)
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.next_due = Some(Instant::now() + self.interval);
    }

    /// Push the next attempt out and return how long it will wait
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let wait = backoff_delay(self.failures);
        self.next_due = Some(Instant::now() + wait);
        wait
    }

    /// Consecutive failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Wait after `failures` failures in a row
pub fn backoff_delay(failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let doublings = (failures - 1).min(16);
    BACKOFF_BASE
        .saturating_mul(1u32 << doublings)
        .min(BACKOFF_CAP)
}

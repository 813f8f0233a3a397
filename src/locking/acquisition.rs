// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::locking::timeout::LockTimeoutValue;
use log::trace;
use std::cmp;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Indicates whether a lock request may block waiting for contention to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquireMode {
    Blocking,
    #[default]
    NonBlocking,
}

impl AcquireMode {
    pub fn is_blocking(self) -> bool {
        matches!(self, AcquireMode::Blocking)
    }

    pub fn is_non_blocking(self) -> bool {
        matches!(self, AcquireMode::NonBlocking)
    }
}

/// Delay sequence used between polls. A factor of 1 gives a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingBackoff {
    initial: Duration,
    factor: u32,
    cap: Duration,
    current: Duration,
}

impl PollingBackoff {
    pub fn new(initial: Duration, factor: u32, cap: Duration) -> Self {
        Self {
            initial,
            factor: cmp::max(factor, 1),
            cap: cmp::max(cap, initial),
            current: initial,
        }
    }

    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, 1, interval)
    }

    /// Returns the current delay and advances the backoff sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.saturating_mul(self.factor);
        self.current = cmp::min(next, self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Default for PollingBackoff {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

/// Tracks elapsed and remaining time for a lock timeout budget.
#[derive(Debug, Clone)]
pub struct LockTimeoutBudget {
    value: LockTimeoutValue,
    started_at: Instant,
}

impl LockTimeoutBudget {
    pub fn new(value: LockTimeoutValue) -> Self {
        Self {
            value,
            started_at: Instant::now(),
        }
    }

    pub fn value(&self) -> LockTimeoutValue {
        self.value
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self.value {
            LockTimeoutValue::Infinite => None,
            LockTimeoutValue::Finite(limit) => Some(limit.saturating_sub(self.elapsed())),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.value, LockTimeoutValue::Finite(limit) if self.elapsed() >= limit)
    }
}

/// How an `acquire` call behaves under contention.
///
/// The default matches a bare `acquire()`: a single non-blocking attempt. A
/// timeout only matters in blocking mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquireOptions {
    mode: AcquireMode,
    timeout: LockTimeoutValue,
    backoff: PollingBackoff,
}

impl AcquireOptions {
    pub fn non_blocking() -> Self {
        Self::default()
    }

    pub fn blocking() -> Self {
        Self {
            mode: AcquireMode::Blocking,
            ..Self::default()
        }
    }

    /// Blocking options seeded from the configured poll interval and timeout.
    pub fn from_config(config: &LockConfig) -> Result<Self> {
        let timeout = config.timeout_value()?.unwrap_or_default();
        Ok(Self::blocking()
            .with_poll_interval(config.poll_interval())
            .with_timeout_value(timeout))
    }

    pub fn with_mode(mut self, mode: AcquireMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_timeout_value(LockTimeoutValue::Finite(timeout))
    }

    pub fn with_timeout_value(mut self, timeout: LockTimeoutValue) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.backoff = PollingBackoff::fixed(interval);
        self
    }

    pub fn with_backoff(mut self, backoff: PollingBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn mode(&self) -> AcquireMode {
        self.mode
    }

    pub fn timeout(&self) -> LockTimeoutValue {
        self.timeout
    }

    pub fn backoff(&self) -> &PollingBackoff {
        &self.backoff
    }
}

/// Drives `attempt` until it reports success, the options forbid waiting, or
/// the timeout budget runs out.
///
/// Sleeps are clipped to the remaining budget, so a timeout fires no earlier
/// than requested and at most one poll interval late. Errors from `attempt`
/// end the loop immediately.
pub(crate) fn poll_until_acquired<F>(
    options: &AcquireOptions,
    target: &str,
    mut attempt: F,
) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let budget = LockTimeoutBudget::new(options.timeout);
    let mut backoff = options.backoff.clone();
    let mut retries = 0usize;

    loop {
        if attempt()? {
            return Ok(());
        }

        if options.mode.is_non_blocking() {
            return Err(LockError::LockTimeout {
                target: target.to_string(),
                waited: None,
            });
        }

        if budget.is_expired() {
            return Err(LockError::LockTimeout {
                target: target.to_string(),
                waited: Some(budget.elapsed()),
            });
        }

        let delay = backoff.next_delay();
        let delay = budget
            .remaining()
            .map_or(delay, |remaining| cmp::min(delay, remaining));
        retries = retries.saturating_add(1);
        trace!(
            "{target} busy; retry {retries} in {:.3}s (timeout {})",
            delay.as_secs_f64(),
            budget.value()
        );
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "lock 'test'";

    #[test]
    fn polling_backoff_doubles_until_cap() {
        let mut backoff =
            PollingBackoff::new(Duration::from_millis(10), 2, Duration::from_millis(40));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        backoff.reset();
        assert_eq!(backoff.peek(), Duration::from_millis(10));
    }

    #[test]
    fn default_backoff_is_fixed_hundred_millis() {
        let mut backoff = PollingBackoff::default();
        assert_eq!(backoff.next_delay(), DEFAULT_POLL_INTERVAL);
        assert_eq!(backoff.next_delay(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn default_options_are_non_blocking() {
        let options = AcquireOptions::default();
        assert!(options.mode().is_non_blocking());
        assert!(options.timeout().is_infinite());
    }

    #[test]
    fn options_from_config_use_poll_interval_and_timeout() {
        let config = LockConfig {
            poll_interval_ms: 20,
            timeout: Some("3".to_string()),
            ..LockConfig::default()
        };
        let options = AcquireOptions::from_config(&config).unwrap();
        assert!(options.mode().is_blocking());
        assert_eq!(options.timeout(), LockTimeoutValue::from_secs(3));
        assert_eq!(options.backoff().peek(), Duration::from_millis(20));
    }

    #[test]
    fn non_blocking_fails_after_single_attempt() {
        let mut attempts = 0;
        let err = poll_until_acquired(&AcquireOptions::non_blocking(), TARGET, || {
            attempts += 1;
            Ok(false)
        })
        .unwrap_err();
        assert_eq!(attempts, 1);
        assert!(matches!(err, LockError::LockTimeout { waited: None, .. }));
    }

    #[test]
    fn blocking_retries_until_success() {
        let options = AcquireOptions::blocking().with_poll_interval(Duration::from_millis(1));
        let mut attempts = 0;
        poll_until_acquired(&options, TARGET, || {
            attempts += 1;
            Ok(attempts == 3)
        })
        .unwrap();
        assert_eq!(attempts, 3);
    }

    #[test]
    fn blocking_timeout_is_not_early() {
        let timeout = Duration::from_millis(150);
        let options = AcquireOptions::blocking()
            .with_timeout(timeout)
            .with_poll_interval(Duration::from_millis(40));
        let started = Instant::now();
        let err = poll_until_acquired(&options, TARGET, || Ok(false)).unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(40) + Duration::from_millis(200));
        match err {
            LockError::LockTimeout {
                waited: Some(waited),
                ..
            } => assert!(waited >= timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_attempts_once() {
        let options = AcquireOptions::blocking().with_timeout(Duration::ZERO);
        let mut attempts = 0;
        let err = poll_until_acquired(&options, TARGET, || {
            attempts += 1;
            Ok(false)
        })
        .unwrap_err();
        assert_eq!(attempts, 1);
        assert!(err.is_timeout());
    }

    #[test]
    fn attempt_errors_stop_the_loop() {
        let options = AcquireOptions::blocking().with_poll_interval(Duration::from_millis(1));
        let mut attempts = 0;
        let err = poll_until_acquired(&options, TARGET, || {
            attempts += 1;
            Err(LockError::PermissionDenied("/locked".to_string()))
        })
        .unwrap_err();
        assert_eq!(attempts, 1);
        assert!(matches!(err, LockError::PermissionDenied(_)));
    }
}

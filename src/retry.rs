// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded retries for device round trips.
//!
//! The devices this crate talks to sit on cheap Wi-Fi stacks and drop
//! requests routinely. Authentication, state refresh and state apply are all
//! safe to repeat, so each is wrapped in a [`RetryPolicy`]: a transient
//! failure ([`Error::is_transient`]) is retried up to a fixed number of
//! attempts, anything else propagates at once.
//!
//! # Examples
//!
//! ```
//! use homecontrol::retry::{Operation, RetryPolicy};
//!
//! # async fn example() -> homecontrol::Result<()> {
//! let value = RetryPolicy::immediate()
//!     .run("bedroom", Operation::Refresh, async || Ok::<_, homecontrol::Error>(21))
//!     .await?;
//! assert_eq!(value, 21);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// The device operations that go through a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Authentication handshake.
    Authenticate,
    /// Capability query performed while connecting.
    Capabilities,
    /// State refresh.
    Refresh,
    /// Applying a new state.
    Apply,
    /// Toggling the front panel display.
    ToggleDisplay,
    /// Discovery probe.
    Discover,
    /// IR learning.
    Learn,
    /// IR send.
    Send,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authenticate",
            Self::Capabilities => "get capabilities",
            Self::Refresh => "refresh",
            Self::Apply => "apply",
            Self::ToggleDisplay => "toggle display",
            Self::Discover => "discover",
            Self::Learn => "record IR packet",
            Self::Send => "send IR packet",
        };
        f.write_str(name)
    }
}

/// How often and how patiently a transient failure is retried.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use homecontrol::retry::RetryPolicy;
///
/// let policy = RetryPolicy::immediate();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay(), Duration::ZERO);
///
/// let policy = RetryPolicy::with_pause().with_max_attempts(5);
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.delay(), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Number of attempts used by both built-in policies.
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    /// Retries straight away. Used for AC authenticate, refresh and apply.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            max_attempts: Self::DEFAULT_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }

    /// Waits one second between attempts. Used for Hue authentication.
    #[must_use]
    pub const fn with_pause() -> Self {
        Self {
            max_attempts: Self::DEFAULT_ATTEMPTS,
            delay: Duration::from_secs(1),
        }
    }

    /// Sets the attempt bound. Values below one are treated as one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the pause between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the attempt
    /// bound is reached.
    ///
    /// `target` names the device in log lines and in the final error.
    ///
    /// # Errors
    ///
    /// Non-transient errors are returned unchanged after the first attempt
    /// that produced them. When every attempt fails transiently, returns
    /// [`Error::Authentication`] for [`Operation::Authenticate`] and
    /// [`Error::Connection`] for every other operation.
    pub async fn run<T>(
        &self,
        target: &str,
        operation: Operation,
        mut attempt: impl AsyncFnMut() -> Result<T>,
    ) -> Result<T> {
        let mut tries = 0;
        loop {
            tries += 1;
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(Error::Protocol(err)) => err,
                Err(other) => return Err(other),
            };

            if tries >= self.max_attempts {
                tracing::error!(
                    target_device = %target,
                    %operation,
                    attempts = tries,
                    error = %err,
                    "Giving up after repeated failures"
                );
                return Err(match operation {
                    Operation::Authenticate => Error::Authentication {
                        target: target.to_string(),
                        attempts: tries,
                        source: err,
                    },
                    _ => Error::Connection {
                        target: target.to_string(),
                        operation,
                        attempts: tries,
                        source: err,
                    },
                });
            }

            tracing::warn!(
                target_device = %target,
                %operation,
                attempt = tries,
                max_attempts = self.max_attempts,
                error = %err,
                "Transient failure, retrying"
            );
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

//! Polling and retry timings
//!
//! Every wait in the supervisor is configurable so that tests can run the
//! real state machine on millisecond timings.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timings for polling, probe retries and the interface cycler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Lower bound of the jittered sleep between unchanged polls
    #[serde(default = "default_poll_min")]
    pub poll_min_ms: u64,

    /// Upper bound of the jittered sleep between unchanged polls
    #[serde(default = "default_poll_max")]
    pub poll_max_ms: u64,

    /// Lower bound of the jittered sleep after an ambiguous probe
    #[serde(default = "default_probe_retry_min")]
    pub probe_retry_min_ms: u64,

    /// Upper bound of the jittered sleep after an ambiguous probe
    #[serde(default = "default_probe_retry_max")]
    pub probe_retry_max_ms: u64,

    /// Interval between dialer process scans while bringing the link down
    #[serde(default = "default_dialer_poll")]
    pub dialer_poll_ms: u64,

    /// Interval between address checks while bringing the link up
    #[serde(default = "default_address_poll")]
    pub address_poll_ms: u64,

    /// Number of address checks before bring-up is declared failed
    #[serde(default = "default_address_attempts")]
    pub address_attempts: u32,
}

fn default_poll_min() -> u64 {
    1000
}
fn default_poll_max() -> u64 {
    2000
}
fn default_probe_retry_min() -> u64 {
    500
}
fn default_probe_retry_max() -> u64 {
    1500
}
fn default_dialer_poll() -> u64 {
    1000
}
fn default_address_poll() -> u64 {
    1000
}
fn default_address_attempts() -> u32 {
    15
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            poll_min_ms: default_poll_min(),
            poll_max_ms: default_poll_max(),
            probe_retry_min_ms: default_probe_retry_min(),
            probe_retry_max_ms: default_probe_retry_max(),
            dialer_poll_ms: default_dialer_poll(),
            address_poll_ms: default_address_poll(),
            address_attempts: default_address_attempts(),
        }
    }
}

impl TimingPolicy {
    /// Millisecond timings with the default address budget, for driving
    /// the state machine in tests
    pub fn fast() -> Self {
        Self {
            poll_min_ms: 1,
            poll_max_ms: 2,
            probe_retry_min_ms: 1,
            probe_retry_max_ms: 2,
            dialer_poll_ms: 1,
            address_poll_ms: 1,
            address_attempts: default_address_attempts(),
        }
    }

    /// Sleep range between polls that observed an unchanged address
    pub fn poll_jitter(&self) -> Jitter {
        Jitter::from_millis(self.poll_min_ms, self.poll_max_ms)
    }

    /// Sleep range between probe attempts after a connection fault
    pub fn probe_retry_jitter(&self) -> Jitter {
        Jitter::from_millis(self.probe_retry_min_ms, self.probe_retry_max_ms)
    }

    pub fn dialer_poll(&self) -> Duration {
        Duration::from_millis(self.dialer_poll_ms)
    }

    pub fn address_poll(&self) -> Duration {
        Duration::from_millis(self.address_poll_ms)
    }

    /// Validate the entire policy
    pub fn validate(&self) -> Result<(), TimingValidationError> {
        if self.poll_min_ms == 0 || self.poll_min_ms > self.poll_max_ms {
            return Err(TimingValidationError::InvalidRange {
                field: "poll",
                min: self.poll_min_ms,
                max: self.poll_max_ms,
            });
        }
        if self.probe_retry_min_ms == 0 || self.probe_retry_min_ms > self.probe_retry_max_ms {
            return Err(TimingValidationError::InvalidRange {
                field: "probe_retry",
                min: self.probe_retry_min_ms,
                max: self.probe_retry_max_ms,
            });
        }
        if self.dialer_poll_ms == 0 {
            return Err(TimingValidationError::ZeroInterval("dialer_poll_ms"));
        }
        if self.address_poll_ms == 0 {
            return Err(TimingValidationError::ZeroInterval("address_poll_ms"));
        }
        if self.address_attempts < 1 || self.address_attempts > 600 {
            return Err(TimingValidationError::InvalidAddressAttempts(
                self.address_attempts,
            ));
        }
        Ok(())
    }
}

/// Uniformly distributed sleep duration within `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// Draw one duration from the range
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Draw a duration and sleep for it
    pub async fn sleep(&self) {
        tokio::time::sleep(self.sample()).await;
    }
}

/// Validation errors for TimingPolicy
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimingValidationError {
    #[error("{field}_min_ms ({min}) must be non-zero and <= {field}_max_ms ({max})")]
    InvalidRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error("{0} must be non-zero")]
    ZeroInterval(&'static str),

    #[error("address_attempts must be between 1 and 600, got: {0}")]
    InvalidAddressAttempts(u32),
}

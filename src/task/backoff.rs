//! Backoff policy for pending tasks
//!
//! Delays grow geometrically from the base delay and are capped:
//! - Default: 2s base, factor 1.5, 30s cap
//! - Whole polling loop bounded by `max_elapsed` (10 minutes by default)
//! - Jitter (±25%) is opt-in; without it delays strictly increase until the cap
//!   (`validate` rejects policies whose rounded delays would not grow)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base delay before the second query (2 seconds)
const BASE_DELAY_MS: u64 = 2000;

/// Growth factor between consecutive delays
const FACTOR: f64 = 1.5;

/// Maximum delay cap (30 seconds)
const MAX_DELAY_MS: u64 = 30_000;

/// Upper bound on the whole polling loop (10 minutes)
const MAX_ELAPSED_SECS: u64 = 600;

/// Settled task outcomes a poller keeps before evicting the oldest
pub const SETTLED_CAPACITY: usize = 1024;

/// Exponential backoff bounded by a total elapsed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Multiplier applied per attempt
    pub factor: f64,

    /// Maximum delay cap in milliseconds
    pub max_delay_ms: u64,

    /// Maximum total time spent polling, in seconds
    pub max_elapsed_secs: u64,

    /// Enable jitter
    pub jitter: bool,

    /// How many settled task outcomes the poller remembers
    pub settled_capacity: usize,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: BASE_DELAY_MS,
            factor: FACTOR,
            max_delay_ms: MAX_DELAY_MS,
            max_elapsed_secs: MAX_ELAPSED_SECS,
            jitter: false,
            settled_capacity: SETTLED_CAPACITY,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after the `attempt`-th pending answer (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let exponential = self.base_delay_ms as f64 * self.factor.powi(exponent);

        // Cap at maximum delay; also guards against f64 overflow
        let delay_ms = if exponential.is_finite() {
            (exponential.round() as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };

        let final_delay = if self.jitter {
            let jitter = (delay_ms / 4) as f64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter;
            (delay_ms as f64 + random_jitter).max(0.0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Total polling budget
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }

    /// Number of queries the policy allows before the budget runs out,
    /// assuming zero-latency round trips and no jitter
    pub fn max_queries(&self) -> u32 {
        let budget = self.max_elapsed();
        let mut waited = Duration::ZERO;
        let mut queries = 1;

        loop {
            let delay = self.delay_for(queries - 1);
            if waited + delay > budget {
                return queries;
            }
            waited += delay;
            queries += 1;
        }
    }

    /// Check policy values, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("polling.base_delay_ms must be greater than 0".to_string());
        }
        if !self.factor.is_finite() || self.factor <= 1.0 {
            return Err("polling.factor must be greater than 1.0".to_string());
        }
        // Each step must grow by at least a whole millisecond or rounding flattens it
        if (self.base_delay_ms as f64) * (self.factor - 1.0) < 1.0 {
            return Err("polling.base_delay_ms is too small for the factor to increase delays".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("polling.max_delay_ms must not be below base_delay_ms".to_string());
        }
        if self.max_elapsed_secs == 0 {
            return Err("polling.max_elapsed_secs must be greater than 0".to_string());
        }
        if self.settled_capacity == 0 {
            return Err("polling.settled_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

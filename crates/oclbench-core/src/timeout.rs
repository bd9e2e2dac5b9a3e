//! Per-iteration timeout.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Launch-time threshold in milliseconds. Zero disables it.
///
/// The check always happens after a launch completes; nothing is
/// preempted on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeout(f64);

impl Timeout {
    /// Never trips.
    pub const NONE: Timeout = Timeout(0.0);

    /// Negative and non-finite values collapse to [`Timeout::NONE`], so
    /// `-1.0` disables the check rather than tripping on every launch.
    pub fn from_ms(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timeout(ms)
        } else {
            if ms != 0.0 {
                debug!(requested_ms = ms, "timeout is not a positive finite value, disabled");
            }
            Timeout::NONE
        }
    }

    pub fn as_ms(self) -> f64 {
        self.0
    }

    pub fn is_enabled(self) -> bool {
        self.0 != 0.0
    }

    /// `ms >= timeout`. Used to stop a benchmark run.
    pub fn reached(self, ms: f64) -> bool {
        self.is_enabled() && ms >= self.0
    }

    /// `ms > timeout`. Used by the guarded evaluator.
    pub fn exceeded(self, ms: f64) -> bool {
        self.is_enabled() && ms > self.0
    }
}

impl From<f64> for Timeout {
    fn from(ms: f64) -> Self {
        Timeout::from_ms(ms)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_enabled() {
            write!(f, "{} ms", self.0)
        } else {
            write!(f, "none")
        }
    }
}

//! Outcome of a guarded evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What [`crate::Executor::evaluate`] concluded about a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "ms", rename_all = "snake_case")]
pub enum Evaluation {
    /// The probe failed to build or query, or the requested work-group
    /// is larger than the kernel allows on this device.
    Rejected,
    /// The single-work-group probe alone ran longer than the timeout.
    ProbeTimedOut(f64),
    /// A full-size iteration ran longer than the timeout. Arguments were
    /// downloaded before returning.
    RunTimedOut(f64),
    /// Median launch time over all iterations.
    Success(f64),
}

impl Evaluation {
    /// Numeric encoding used by search loops:
    ///
    /// | variant | value |
    /// |---|---|
    /// | `Rejected` | `-1.0` |
    /// | `ProbeTimedOut(t)` | `-t` |
    /// | `RunTimedOut(t)` | `t` |
    /// | `Success(m)` | `m` |
    pub fn to_sentinel(self) -> f64 {
        match self {
            Self::Rejected => -1.0,
            Self::ProbeTimedOut(t) => -t,
            Self::RunTimedOut(t) => t,
            Self::Success(m) => m,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The median, if the evaluation succeeded.
    pub fn median_ms(self) -> Option<f64> {
        match self {
            Self::Success(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Evaluation> for f64 {
    fn from(e: Evaluation) -> Self {
        e.to_sentinel()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::ProbeTimedOut(t) => write!(f, "probe timed out after {t:.3} ms"),
            Self::RunTimedOut(t) => write!(f, "run timed out after {t:.3} ms"),
            Self::Success(m) => write!(f, "median {m:.3} ms"),
        }
    }
}

/// Median of `samples`, sorting them in place.
///
/// Even lengths average the two central values. Returns `None` when empty.
pub fn median(samples: &mut [f64]) -> Option<f64> {
    let n = samples.len();
    if n == 0 {
        return None;
    }
    samples.sort_by(f64::total_cmp);
    Some(if n % 2 == 0 {
        (samples[n / 2 - 1] + samples[n / 2]) / 2.0
    } else {
        samples[n / 2]
    })
}

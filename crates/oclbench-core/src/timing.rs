//! Event-based timing.
//!
//! Durations come from device profiling counters, never from host clocks:
//! a single command is timed by its own `START → END` window, and a span
//! bracketed by two markers is timed by the gap between their `SUBMIT`
//! timestamps. Counters are nanoseconds; results are fractional
//! milliseconds.

use crate::device::{DeviceEvent, ProfilingCounter};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

const NS_TO_MS: f64 = 1.0e-6;

/// Convert a nanosecond delta to milliseconds. Backwards deltas clamp to 0.
#[inline]
pub fn delta_ms(from_ns: u64, to_ns: u64) -> f64 {
    to_ns.saturating_sub(from_ns) as f64 * NS_TO_MS
}

/// Execution time of a single command.
///
/// Blocks on `event`, then reads its `START` and `END` counters. Fails if
/// the queue was created without profiling.
pub fn elapsed_ms<E: DeviceEvent>(event: &E) -> Result<f64> {
    event.wait()?;
    let start = event.profiling(ProfilingCounter::Start)?;
    let end = event.profiling(ProfilingCounter::End)?;
    Ok(delta_ms(start, end))
}

/// Time between the submission of two markers.
///
/// Only `end` is waited on; `start` was enqueued earlier on the same
/// in-order queue and is therefore already satisfied.
pub fn elapsed_between_ms<E: DeviceEvent>(start: &E, end: &E) -> Result<f64> {
    end.wait()?;
    let t0 = start.profiling(ProfilingCounter::Submit)?;
    let t1 = end.profiling(ProfilingCounter::Submit)?;
    Ok(delta_ms(t0, t1))
}

/// Timing breakdown of one upload → launch → download cycle, in ms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelTime {
    pub upload: f64,
    pub launch: f64,
    pub download: f64,
    pub total: f64,
}

impl KernelTime {
    pub fn new(upload: f64, launch: f64, download: f64, total: f64) -> Self {
        Self {
            upload,
            launch,
            download,
            total,
        }
    }

    /// Component-wise mean. Empty input yields all zeros.
    pub fn average(times: &[KernelTime]) -> KernelTime {
        if times.is_empty() {
            return KernelTime::default();
        }
        let n = times.len() as f64;
        let sum = times.iter().fold(KernelTime::default(), |acc, t| KernelTime {
            upload: acc.upload + t.upload,
            launch: acc.launch + t.launch,
            download: acc.download + t.download,
            total: acc.total + t.total,
        });
        KernelTime {
            upload: sum.upload / n,
            launch: sum.launch / n,
            download: sum.download / n,
            total: sum.total / n,
        }
    }
}

impl fmt::Display for KernelTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upload={}  launch={}  download={}  total={}",
            human_ms(self.upload),
            human_ms(self.launch),
            human_ms(self.download),
            human_ms(self.total),
        )
    }
}

/// Render milliseconds with the most readable unit (ns, µs, ms, s, min).
pub fn human_ms(ms: f64) -> String {
    if ms < 1.0e-3 {
        format!("{:.0} ns", ms * 1.0e6)
    } else if ms < 1.0 {
        format!("{:.3} µs", ms * 1.0e3)
    } else if ms < 1.0e3 {
        format!("{ms:.3} ms")
    } else if ms < 60.0e3 {
        format!("{:.3} s", ms / 1.0e3)
    } else {
        format!("{:.3} min", ms / 60.0e3)
    }
}

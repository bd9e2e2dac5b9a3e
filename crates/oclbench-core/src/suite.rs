//! Multi-size benchmark suite.
//!
//! Runs one kernel over a list of input sizes, creating fresh arguments
//! for every size, and summarises the per-size averages.

use crate::arg::KernelArg;
use crate::device::Device;
use crate::error::{ExecutorError, Result};
use crate::executor::Executor;
use crate::kernel::KernelSource;
use crate::range::NdRange;
use crate::timeout::Timeout;
use crate::timing::{KernelTime, human_ms};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Creates arguments and work sizes for one data size.
pub trait ArgFactory<D: Device> {
    /// Number of elements for a data size given in bytes.
    fn data_length(&self, data_size_bytes: usize) -> usize;

    /// Work sizes for `data_length` elements.
    fn range(&self, data_length: usize) -> NdRange;

    /// Fresh arguments, in kernel parameter order.
    fn create_args(&self, data_length: usize) -> Vec<Box<dyn KernelArg<D>>>;
}

/// Every timing collected by [`Executor::benchmark_suite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub kernel_name: String,
    pub executions: usize,
    /// Data sizes in bytes, in run order.
    pub data_sizes: Vec<usize>,
    /// `results[i]` holds every execution for `data_sizes[i]`.
    pub results: Vec<Vec<KernelTime>>,
    /// `average[i]` is the mean of `results[i]`.
    pub average: Vec<KernelTime>,
    /// Host wall-clock time for the whole suite.
    pub duration_ms: f64,
}

impl SuiteReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Benchmark {}-Kernel", self.kernel_name)?;
        writeln!(f, "  Datasize  Result (Average)")?;
        for (size, avg) in self.data_sizes.iter().zip(&self.average) {
            writeln!(f, "{:>10}: {}", human_bytes(*size as u64), avg)?;
        }
        writeln!(f, "Benchmark-Duration: {}", human_ms(self.duration_ms))
    }
}

/// Binary-prefixed byte count: `B`, `KiB`, `MiB`, `GiB`.
pub fn human_bytes(bytes: u64) -> String {
    // Largest value that still renders below 1024.0 of the next unit at one decimal.
    const ROUNDING_LIMIT: u64 = 0x0fff_cccc_cccc_cccc;
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes <= ROUNDING_LIMIT >> 40 {
        format!("{:.1} KiB", b / 1024.0)
    } else if bytes <= ROUNDING_LIMIT >> 30 {
        format!("{:.1} MiB", b / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GiB", b / (1024.0 * 1024.0 * 1024.0))
    }
}

impl<D: Device> Executor<D> {
    /// Benchmark `kernel` `executions` times for each entry in `data_sizes`.
    ///
    /// Arguments are created by `factory` per size and dropped before the
    /// next size. No timeout applies.
    pub fn benchmark_suite<F: ArgFactory<D>>(
        &mut self,
        kernel: &KernelSource,
        executions: usize,
        factory: &F,
        data_sizes: &[usize],
    ) -> Result<SuiteReport> {
        if data_sizes.is_empty() {
            return Err(ExecutorError::InvalidArgument("no data sizes specified".into()));
        }
        if executions == 0 {
            return Err(ExecutorError::InvalidArgument(format!(
                "illegal number of executions: {executions}"
            )));
        }
        if let Some(pos) = data_sizes.iter().position(|&s| s == 0) {
            return Err(ExecutorError::InvalidArgument(format!(
                "data size at position {pos} must be positive"
            )));
        }

        let started = Instant::now();
        let mut results = Vec::with_capacity(data_sizes.len());

        for &size in data_sizes {
            let length = factory.data_length(size);
            let range = factory.range(length);
            let mut owned = factory.create_args(length);
            let mut args: Vec<&mut dyn KernelArg<D>> =
                owned.iter_mut().map(|a| a.as_mut() as &mut dyn KernelArg<D>).collect();

            let mut runtimes = Vec::with_capacity(executions);
            self.benchmark(kernel, &range, &mut args, executions, Timeout::NONE, &mut runtimes)?;
            info!(
                kernel = kernel.name(),
                size = %human_bytes(size as u64),
                average = %KernelTime::average(&runtimes),
                "data size complete"
            );
            results.push(runtimes);
        }

        let average = results.iter().map(|r| KernelTime::average(r)).collect();
        Ok(SuiteReport {
            kernel_name: kernel.name().to_string(),
            executions,
            data_sizes: data_sizes.to_vec(),
            results,
            average,
            duration_ms: started.elapsed().as_secs_f64() * 1.0e3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1024), "1.0 KiB");
        assert_eq!(human_bytes(1536), "1.5 KiB");
        assert_eq!(human_bytes(1024 * 1024), "1.0 MiB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn human_bytes_never_prints_1024_of_a_unit() {
        assert_eq!(human_bytes(1024 * 1024 - 1), "1.0 MiB");
    }

    #[test]
    fn report_display_lists_every_size() {
        let report = SuiteReport {
            kernel_name: "vadd".into(),
            executions: 2,
            data_sizes: vec![512, 4096],
            results: vec![vec![KernelTime::default(); 2]; 2],
            average: vec![KernelTime::default(); 2],
            duration_ms: 1500.0,
        };
        let s = report.to_string();
        assert!(s.starts_with("Benchmark vadd-Kernel"));
        assert!(s.contains("     512 B:"));
        assert!(s.contains("   4.0 KiB:"));
        assert!(s.contains("Benchmark-Duration: 1.500 s"));
    }
}

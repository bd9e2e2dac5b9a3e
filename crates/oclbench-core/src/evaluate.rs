//! Guarded evaluation: probe one work-group, then measure the median.
//!
//! The evaluator is built for search loops that try thousands of
//! configurations. A configuration that does not fit the device, or that
//! is too slow, is an ordinary result ([`Evaluation`]), not an error.
//!
//! 1. Arguments are uploaded once and reused by both phases.
//! 2. A probe kernel, prefixed with the work-group guard, is compiled and
//!    its work-group limit checked against the requested local size. It is
//!    then launched with the full requested ranges; the guard limits real
//!    work to group `(0,0,0)`.
//! 3. The real kernel is compiled once, bound once, and launched
//!    `iterations` times. Arguments are downloaded exactly once, either
//!    after the last launch or as soon as one launch exceeds the timeout.

use crate::arg::{self, ArgList};
use crate::device::{CompiledKernel, Device};
use crate::error::{ExecutorError, Result};
use crate::executor::Executor;
use crate::kernel::KernelSource;
use crate::outcome::{Evaluation, median};
use crate::range::NdRange;
use crate::timeout::Timeout;
use crate::timing;
use tracing::{debug, info, warn};

impl<D: Device> Executor<D> {
    /// Evaluate one kernel configuration.
    ///
    /// Returns `Err` only for device contract violations (a failed enqueue
    /// or unreadable profiling counters). `iterations` must be at least 1.
    pub fn evaluate(
        &mut self,
        kernel: &KernelSource,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
        iterations: usize,
        timeout: Timeout,
    ) -> Result<Evaluation> {
        if iterations == 0 {
            return Err(ExecutorError::InvalidArgument(
                "evaluate needs at least one iteration".into(),
            ));
        }
        range.validate()?;

        arg::upload_all(self.device(), args)?;

        if let Some(outcome) = self.probe(kernel, range, args, timeout)? {
            return Ok(outcome);
        }

        self.measure(kernel, range, args, iterations, timeout)
    }

    /// Returns `Some` when the probe decides the outcome on its own.
    fn probe(
        &mut self,
        kernel: &KernelSource,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
        timeout: Timeout,
    ) -> Result<Option<Evaluation>> {
        let probe_source = kernel.with_workgroup_guard();
        let probe = match self.compile(&probe_source) {
            Ok(k) => k,
            Err(e) => {
                warn!(kernel = kernel.name(), error = %e, "probe kernel failed to build");
                return Ok(Some(Evaluation::Rejected));
            }
        };

        let wg_size = match probe.work_group_size() {
            Ok(n) => n,
            Err(e) => {
                warn!(kernel = kernel.name(), error = %e, "work-group size query failed");
                return Ok(Some(Evaluation::Rejected));
            }
        };
        let private_mem = match probe.private_mem_size() {
            Ok(n) => n,
            Err(e) => {
                warn!(kernel = kernel.name(), error = %e, "private memory query failed");
                return Ok(Some(Evaluation::Rejected));
            }
        };
        info!(kernel = kernel.name(), private_mem, "amount of private memory");

        let Some(requested) = range.local_size() else {
            debug!(kernel = kernel.name(), %range, "work-group size overflows usize");
            return Ok(Some(Evaluation::Rejected));
        };
        if wg_size < requested {
            debug!(
                kernel = kernel.name(),
                max = wg_size,
                requested,
                "work-group too large for this kernel"
            );
            return Ok(Some(Evaluation::Rejected));
        }

        arg::bind_all(&probe, args)?;
        let event = self.device().enqueue_kernel(&probe, range)?;
        let probe_ms = timing::elapsed_ms(&event)?;
        info!(kernel = kernel.name(), probe_ms, "single workgroup");

        if timeout.exceeded(probe_ms) {
            return Ok(Some(Evaluation::ProbeTimedOut(probe_ms)));
        }
        Ok(None)
    }

    fn measure(
        &mut self,
        kernel: &KernelSource,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
        iterations: usize,
        timeout: Timeout,
    ) -> Result<Evaluation> {
        let compiled = self.compile(kernel)?;
        arg::bind_all(&compiled, args)?;

        let mut runtimes = Vec::new();
        for i in 0..iterations {
            let event = self.device().enqueue_kernel(&compiled, range)?;
            let runtime = timing::elapsed_ms(&event)?;
            if timeout.exceeded(runtime) {
                warn!(
                    kernel = kernel.name(),
                    iteration = i,
                    runtime_ms = runtime,
                    %timeout,
                    "run exceeded timeout"
                );
                arg::download_all(self.device(), args)?;
                return Ok(Evaluation::RunTimedOut(runtime));
            }
            runtimes.push(runtime);
        }

        arg::download_all(self.device(), args)?;

        let median_ms = median(&mut runtimes).ok_or_else(|| {
            ExecutorError::InvalidArgument("no runtimes collected".into())
        })?;
        debug!(kernel = kernel.name(), iterations, median_ms, "evaluation complete");
        Ok(Evaluation::Success(median_ms))
    }
}

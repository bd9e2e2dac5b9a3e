//! Repeated dispatch with early exit on timeout.

use crate::arg::{self, ArgList};
use crate::device::Device;
use crate::error::Result;
use crate::executor::Executor;
use crate::kernel::KernelSource;
use crate::range::NdRange;
use crate::timeout::Timeout;
use crate::timing::KernelTime;
use tracing::{debug, warn};

impl<D: Device> Executor<D> {
    /// Run `kernel` up to `iterations` times, appending one [`KernelTime`]
    /// per completed iteration to `runtimes`.
    ///
    /// Before each iteration every argument is cleared and the kernel is
    /// compiled afresh, so no device-side state survives from one run to
    /// the next. If `timeout` is enabled and an iteration's launch time
    /// reaches it, that record is still appended and the loop stops;
    /// callers detect the early exit from the number of records added.
    pub fn benchmark(
        &mut self,
        kernel: &KernelSource,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
        iterations: usize,
        timeout: Timeout,
        runtimes: &mut Vec<KernelTime>,
    ) -> Result<()> {
        for i in 0..iterations {
            arg::clear_all(args);
            let compiled = self.compile(kernel)?;
            let runtime = self.execute_kernel(&compiled, range, args)?;
            runtimes.push(runtime);

            if timeout.reached(runtime.launch) {
                warn!(
                    kernel = kernel.name(),
                    iteration = i,
                    launch_ms = runtime.launch,
                    %timeout,
                    "launch time reached timeout, stopping benchmark"
                );
                return Ok(());
            }
        }
        debug!(kernel = kernel.name(), iterations, "benchmark complete");
        Ok(())
    }
}

//! The execution context and the dispatch primitives.

use crate::arg::{self, ArgList};
use crate::device::{Device, DeviceInfo};
use crate::error::Result;
use crate::kernel::KernelSource;
use crate::range::NdRange;
use crate::timing::{self, KernelTime};
use tracing::{debug, info};

/// Exclusive handle on one device for the length of a benchmarking session.
///
/// Every operation takes `&mut self`: markers and profiling queries are
/// ordered by enqueue sequence on a single queue, so two calls must never
/// interleave on the same device.
pub struct Executor<D: Device> {
    device: D,
}

impl<D: Device> Executor<D> {
    /// Start a session on `device`.
    pub fn new(device: D) -> Self {
        info!(device = %device.info(), "executor session started");
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.device.info()
    }

    /// End the session and hand the device back.
    pub fn into_device(self) -> D {
        debug!(device = %self.device.info().name, "executor session ended");
        self.device
    }

    /// One upload → launch → download cycle with an already compiled kernel.
    ///
    /// Arguments are uploaded and bound one by one in list order (argument
    /// `i` is bound at index `i`), the kernel is launched once, and every
    /// argument is downloaded. Upload, download and total are marker
    /// spans; launch is the kernel event's own execution window.
    pub fn execute_kernel(
        &mut self,
        kernel: &D::Kernel,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
    ) -> Result<KernelTime> {
        range.validate()?;
        let device = &self.device;

        let total_begin = device.enqueue_marker()?;
        let upload_begin = device.enqueue_marker()?;
        arg::upload_and_bind_all(device, kernel, args)?;
        let upload_end = device.enqueue_marker()?;
        let upload = timing::elapsed_between_ms(&upload_begin, &upload_end)?;

        let event = device.enqueue_kernel(kernel, range)?;
        let launch = timing::elapsed_ms(&event)?;

        let download_begin = device.enqueue_marker()?;
        arg::download_all(device, args)?;
        let download_end = device.enqueue_marker()?;
        let download = timing::elapsed_between_ms(&download_begin, &download_end)?;

        let total_end = device.enqueue_marker()?;
        let total = timing::elapsed_between_ms(&total_begin, &total_end)?;

        let time = KernelTime::new(upload, launch, download, total);
        debug!(%range, ?time, "kernel executed");
        Ok(time)
    }

    /// Compile `kernel` and run [`Executor::execute_kernel`] once.
    ///
    /// Recompiles on every call; callers that want to reuse a compiled
    /// kernel compile it through [`Executor::compile`] and call
    /// `execute_kernel` directly.
    pub fn execute(
        &mut self,
        kernel: &KernelSource,
        range: &NdRange,
        args: &mut ArgList<'_, D>,
    ) -> Result<KernelTime> {
        let compiled = self.compile(kernel)?;
        self.execute_kernel(&compiled, range, args)
    }

    /// Compile `kernel` against the session device.
    pub fn compile(&self, kernel: &KernelSource) -> Result<D::Kernel> {
        debug!(kernel = kernel.name(), "compiling");
        self.device.compile(kernel)
    }
}

impl<D: Device + std::fmt::Debug> std::fmt::Debug for Executor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").field("device", &self.device).finish()
    }
}

//! Deterministic in-process device.
//!
//! [`ReferenceDevice`] implements the [`Device`] contract without any
//! accelerator: commands advance a nanosecond clock, every command is
//! recorded in a journal, and kernel launch times come from a
//! [`LatencyModel`]. It runs no kernel code. Use it to dry-run a search
//! policy, or to test code built on the executor.

use crate::arg::KernelArg;
use crate::device::{CompiledKernel, Device, DeviceEvent, DeviceInfo, DeviceKind, ProfilingCounter};
use crate::error::{ExecutorError, Result};
use crate::kernel::KernelSource;
use crate::range::NdRange;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

// ---------------------------------------------------------------------------
// Latency models
// ---------------------------------------------------------------------------

/// A kernel launch as seen by a [`LatencyModel`].
#[derive(Debug, Clone, Copy)]
pub struct Launch<'a> {
    pub kernel: &'a str,
    /// Whether the kernel carries the work-group guard.
    pub guarded: bool,
    pub range: &'a NdRange,
    /// Launches already executed on this device.
    pub sequence: usize,
}

impl Launch<'_> {
    /// Work-groups that actually do work: one for guarded kernels.
    pub fn executed_groups(&self) -> usize {
        if self.guarded { 1 } else { self.range.group_count() }
    }
}

/// Decides how long a launch takes, in milliseconds.
pub trait LatencyModel: Send + Sync {
    fn launch_ms(&self, launch: &Launch<'_>) -> f64;
}

impl<F> LatencyModel for F
where
    F: Fn(&Launch<'_>) -> f64 + Send + Sync,
{
    fn launch_ms(&self, launch: &Launch<'_>) -> f64 {
        self(launch)
    }
}

/// Fixed cost per executed work-group.
#[derive(Debug, Clone, Copy)]
pub struct PerGroupLatency {
    pub ms_per_group: f64,
}

impl Default for PerGroupLatency {
    fn default() -> Self {
        Self { ms_per_group: 0.01 }
    }
}

impl LatencyModel for PerGroupLatency {
    fn launch_ms(&self, launch: &Launch<'_>) -> f64 {
        self.ms_per_group * launch.executed_groups() as f64
    }
}

/// Fixed probe time, and a cycle of run times for unguarded launches.
#[derive(Debug)]
pub struct ScriptedLatency {
    probe_ms: f64,
    runs: Vec<f64>,
    next: AtomicUsize,
}

impl ScriptedLatency {
    pub fn new(probe_ms: f64, runs: impl Into<Vec<f64>>) -> Self {
        Self {
            probe_ms,
            runs: runs.into(),
            next: AtomicUsize::new(0),
        }
    }
}

impl LatencyModel for ScriptedLatency {
    fn launch_ms(&self, launch: &Launch<'_>) -> f64 {
        if launch.guarded {
            return self.probe_ms;
        }
        if self.runs.is_empty() {
            return 0.0;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.runs[i % self.runs.len()]
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// One command recorded by the reference device, in enqueue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Compile { kernel: String, guarded: bool },
    Marker { at_ns: u64 },
    Upload { arg: String, bytes: usize },
    Download { arg: String, bytes: usize },
    Bind { kernel: String, index: u32, arg: String },
    Launch {
        kernel: String,
        guarded: bool,
        range: NdRange,
        ms: f64,
    },
}

#[derive(Debug, Default)]
struct State {
    clock_ns: u64,
    launches: usize,
    journal: Vec<Command>,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn ms_to_ns(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1.0e6).round() as u64
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// CPU-side stand-in for an accelerator.
pub struct ReferenceDevice {
    info: DeviceInfo,
    state: Shared,
    latency: Box<dyn LatencyModel>,
    marker_ns: u64,
    transfer_ns_per_byte: f64,
    kernel_work_group_size: Option<usize>,
    private_mem_size: u64,
    profiling: bool,
    fail_builds: bool,
    fail_queries: bool,
}

impl ReferenceDevice {
    pub fn new() -> Self {
        Self {
            info: DeviceInfo {
                name: "Reference Device".to_string(),
                platform_name: "oclbench reference".to_string(),
                kind: DeviceKind::Cpu,
                max_work_group_size: 1024,
                local_mem_size: 64 * 1024,
                global_mem_size: 1 << 30,
                max_mem_alloc_size: 1 << 28,
                supports_double: true,
            },
            state: Shared::default(),
            latency: Box::new(PerGroupLatency::default()),
            marker_ns: 1_000,
            transfer_ns_per_byte: 0.1,
            kernel_work_group_size: None,
            private_mem_size: 0,
            profiling: true,
            fail_builds: false,
            fail_queries: false,
        }
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Device limit, also reported by compiled kernels unless overridden.
    pub fn with_max_work_group_size(mut self, n: usize) -> Self {
        self.info.max_work_group_size = n;
        self
    }

    /// Work-group limit reported by compiled kernels.
    pub fn with_kernel_work_group_size(mut self, n: usize) -> Self {
        self.kernel_work_group_size = Some(n);
        self
    }

    pub fn with_private_mem_size(mut self, bytes: u64) -> Self {
        self.private_mem_size = bytes;
        self
    }

    pub fn with_latency(mut self, model: impl LatencyModel + 'static) -> Self {
        self.latency = Box::new(model);
        self
    }

    /// Nanoseconds each marker advances the clock.
    pub fn with_marker_ns(mut self, ns: u64) -> Self {
        self.marker_ns = ns;
        self
    }

    pub fn with_transfer_ns_per_byte(mut self, ns: f64) -> Self {
        self.transfer_ns_per_byte = ns;
        self
    }

    /// Events report no profiling counters, as with a queue created
    /// without profiling.
    pub fn without_profiling(mut self) -> Self {
        self.profiling = false;
        self
    }

    /// Every compile fails.
    pub fn with_failing_builds(mut self) -> Self {
        self.fail_builds = true;
        self
    }

    /// Work-group and private-memory queries fail on compiled kernels.
    pub fn with_failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Snapshot of every command so far.
    pub fn journal(&self) -> Vec<Command> {
        lock(&self.state).journal.clone()
    }

    /// Kernel launches so far, with their simulated runtime.
    pub fn launches(&self) -> Vec<(String, bool, f64)> {
        lock(&self.state)
            .journal
            .iter()
            .filter_map(|c| match c {
                Command::Launch {
                    kernel, guarded, ms, ..
                } => Some((kernel.clone(), *guarded, *ms)),
                _ => None,
            })
            .collect()
    }

    pub fn clock_ns(&self) -> u64 {
        lock(&self.state).clock_ns
    }

    pub fn clear_journal(&self) {
        lock(&self.state).journal.clear();
    }

    fn event(&self, submit: u64, start: u64, end: u64) -> ReferenceEvent {
        ReferenceEvent {
            submit,
            start,
            end,
            profiling: self.profiling,
        }
    }

    fn transfer(&self, command: Command, bytes: usize) {
        let mut state = lock(&self.state);
        let ns = (bytes as f64 * self.transfer_ns_per_byte).round() as u64;
        state.clock_ns = state.clock_ns.saturating_add(ns);
        state.journal.push(command);
    }
}

impl Default for ReferenceDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReferenceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceDevice")
            .field("info", &self.info)
            .field("clock_ns", &self.clock_ns())
            .field("profiling", &self.profiling)
            .finish()
    }
}

impl Device for ReferenceDevice {
    type Kernel = ReferenceKernel;
    type Event = ReferenceEvent;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn compile(&self, source: &KernelSource) -> Result<ReferenceKernel> {
        if self.fail_builds {
            return Err(ExecutorError::Build {
                name: source.name().to_string(),
                log: "reference device configured to fail builds".into(),
            });
        }
        let guarded = source.is_guarded();
        lock(&self.state).journal.push(Command::Compile {
            kernel: source.name().to_string(),
            guarded,
        });
        Ok(ReferenceKernel {
            name: source.name().to_string(),
            guarded,
            work_group_size: self
                .kernel_work_group_size
                .unwrap_or(self.info.max_work_group_size),
            private_mem_size: self.private_mem_size,
            fail_queries: self.fail_queries,
            state: Arc::clone(&self.state),
        })
    }

    fn enqueue_kernel(&self, kernel: &ReferenceKernel, range: &NdRange) -> Result<ReferenceEvent> {
        let mut state = lock(&self.state);
        let launch = Launch {
            kernel: &kernel.name,
            guarded: kernel.guarded,
            range,
            sequence: state.launches,
        };
        let ms = self.latency.launch_ms(&launch);
        let start = state.clock_ns;
        let end = start.saturating_add(ms_to_ns(ms));
        state.clock_ns = end;
        state.launches += 1;
        state.journal.push(Command::Launch {
            kernel: kernel.name.clone(),
            guarded: kernel.guarded,
            range: *range,
            ms,
        });
        trace!(kernel = %kernel.name, ms, "reference launch");
        Ok(self.event(start, start, end))
    }

    fn enqueue_marker(&self) -> Result<ReferenceEvent> {
        let mut state = lock(&self.state);
        let at = state.clock_ns;
        state.clock_ns = state.clock_ns.saturating_add(self.marker_ns);
        state.journal.push(Command::Marker { at_ns: at });
        Ok(self.event(at, at, at))
    }
}

/// Kernel "compiled" by the reference device.
#[derive(Debug)]
pub struct ReferenceKernel {
    name: String,
    guarded: bool,
    work_group_size: usize,
    private_mem_size: u64,
    fail_queries: bool,
    state: Shared,
}

impl ReferenceKernel {
    pub fn is_guarded(&self) -> bool {
        self.guarded
    }
}

impl CompiledKernel for ReferenceKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn work_group_size(&self) -> Result<usize> {
        if self.fail_queries {
            return Err(ExecutorError::Query("CL_KERNEL_WORK_GROUP_SIZE".into()));
        }
        Ok(self.work_group_size)
    }

    fn private_mem_size(&self) -> Result<u64> {
        if self.fail_queries {
            return Err(ExecutorError::Query("CL_KERNEL_PRIVATE_MEM_SIZE".into()));
        }
        Ok(self.private_mem_size)
    }
}

/// Completed-on-creation event with fixed counters.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEvent {
    submit: u64,
    start: u64,
    end: u64,
    profiling: bool,
}

impl DeviceEvent for ReferenceEvent {
    fn wait(&self) -> Result<()> {
        Ok(())
    }

    fn profiling(&self, counter: ProfilingCounter) -> Result<u64> {
        if !self.profiling {
            return Err(ExecutorError::Profiling {
                counter,
                reason: "profiling information not available".into(),
            });
        }
        Ok(match counter {
            ProfilingCounter::Queued | ProfilingCounter::Submit => self.submit,
            ProfilingCounter::Start => self.start,
            ProfilingCounter::End => self.end,
        })
    }
}

// ---------------------------------------------------------------------------
// Buffer argument
// ---------------------------------------------------------------------------

/// Byte buffer argument for the reference device.
#[derive(Debug, Clone)]
pub struct ReferenceBuffer {
    label: String,
    initial: Vec<u8>,
    host: Vec<u8>,
    device: Option<Vec<u8>>,
    uploads: usize,
    downloads: usize,
    clears: usize,
}

impl ReferenceBuffer {
    pub fn new(label: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            label: label.into(),
            initial: data.clone(),
            host: data,
            device: None,
            uploads: 0,
            downloads: 0,
            clears: 0,
        }
    }

    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(label: impl Into<String>, len: usize) -> Self {
        Self::new(label, vec![0u8; len])
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn host(&self) -> &[u8] {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut [u8] {
        &mut self.host
    }

    /// Whether a device copy exists.
    pub fn is_resident(&self) -> bool {
        self.device.is_some()
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn downloads(&self) -> usize {
        self.downloads
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl KernelArg<ReferenceDevice> for ReferenceBuffer {
    fn upload(&mut self, device: &ReferenceDevice) -> Result<()> {
        self.device = Some(self.host.clone());
        self.uploads += 1;
        device.transfer(
            Command::Upload {
                arg: self.label.clone(),
                bytes: self.host.len(),
            },
            self.host.len(),
        );
        Ok(())
    }

    fn download(&mut self, device: &ReferenceDevice) -> Result<()> {
        let bytes = match &self.device {
            Some(d) => {
                self.host.clone_from(d);
                d.len()
            }
            None => 0,
        };
        self.downloads += 1;
        device.transfer(
            Command::Download {
                arg: self.label.clone(),
                bytes,
            },
            bytes,
        );
        Ok(())
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.device = None;
        self.host.clone_from(&self.initial);
    }

    fn bind(&self, kernel: &ReferenceKernel, index: u32) -> Result<()> {
        lock(&kernel.state).journal.push(Command::Bind {
            kernel: kernel.name.clone(),
            index,
            arg: self.label.clone(),
        });
        Ok(())
    }
}

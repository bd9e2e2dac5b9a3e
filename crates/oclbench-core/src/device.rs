//! Device collaborator seams.
//!
//! A [`Device`] owns one command queue on one physical accelerator. The
//! executor only ever needs to compile a kernel, enqueue it, enqueue a
//! zero-work marker, and read profiling counters back from the events
//! those enqueues return. Everything else (platform discovery, context
//! creation, queue properties) belongs to the implementation.
//!
//! Implementations must execute enqueued commands in FIFO order, and the
//! queue must be created with profiling enabled.

use crate::error::Result;
use crate::kernel::KernelSource;
use crate::range::NdRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-reported profiling timestamps, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfilingCounter {
    /// Command was placed on the host-side queue.
    Queued,
    /// Command was submitted to the device.
    Submit,
    /// Command started executing.
    Start,
    /// Command finished executing.
    End,
}

/// Completion marker returned by every enqueue.
pub trait DeviceEvent {
    /// Block until the command reaches completion.
    fn wait(&self) -> Result<()>;

    /// Read one profiling counter. Only valid after [`DeviceEvent::wait`].
    fn profiling(&self, counter: ProfilingCounter) -> Result<u64>;
}

/// A kernel compiled for the device that produced it.
pub trait CompiledKernel {
    /// Entry-point name.
    fn name(&self) -> &str;

    /// Largest work-group this kernel can be launched with on its device.
    fn work_group_size(&self) -> Result<usize>;

    /// Private memory used by each work-item, in bytes.
    fn private_mem_size(&self) -> Result<u64>;
}

/// One accelerator with one in-order, profiling-enabled command queue.
pub trait Device {
    type Kernel: CompiledKernel;
    type Event: DeviceEvent;

    /// Static device properties.
    fn info(&self) -> &DeviceInfo;

    /// Compile `source` against this device.
    fn compile(&self, source: &KernelSource) -> Result<Self::Kernel>;

    /// Enqueue `kernel` with the given global/local ranges.
    fn enqueue_kernel(&self, kernel: &Self::Kernel, range: &NdRange) -> Result<Self::Event>;

    /// Enqueue a zero-work marker.
    fn enqueue_marker(&self) -> Result<Self::Event>;
}

/// Device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Gpu,
    Accelerator,
    Custom,
    Unknown,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Gpu => write!(f, "GPU"),
            Self::Accelerator => write!(f, "ACCELERATOR"),
            Self::Custom => write!(f, "CUSTOM"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "accelerator" | "acc" => Ok(Self::Accelerator),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Properties queried once when a device is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g. "Intel(R) Arc(TM) A770 Graphics").
    pub name: String,
    /// Name of the platform the device belongs to.
    pub platform_name: String,
    pub kind: DeviceKind,
    /// Maximum work-items in one work-group.
    pub max_work_group_size: usize,
    /// Local memory per work-group, in bytes.
    pub local_mem_size: u64,
    /// Global memory, in bytes.
    pub global_mem_size: u64,
    /// Largest single allocation, in bytes.
    pub max_mem_alloc_size: u64,
    /// Whether the device implements `cl_khr_fp64` or equivalent.
    pub supports_double: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            platform_name: "unknown".to_string(),
            kind: DeviceKind::Unknown,
            max_work_group_size: 1,
            local_mem_size: 0,
            global_mem_size: 0,
            max_mem_alloc_size: 0,
            supports_double: false,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] on {} (max wg {}, local {} B, global {} B)",
            self.name,
            self.kind,
            self.platform_name,
            self.max_work_group_size,
            self.local_mem_size,
            self.global_mem_size
        )
    }
}

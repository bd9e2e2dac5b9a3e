//! OpenCL device, compiled kernel and event.
//!
//! [`ClDevice`] owns a context and a single in-order command queue created
//! with `CL_QUEUE_PROFILING_ENABLE`, so every event it returns carries
//! profiling counters.

use crate::error::{OpenClError, Result, api};
use crate::select::{self, Candidate};
use oclbench_core::{
    CompiledKernel, Device, DeviceEvent, DeviceInfo, DeviceKind, ExecutorConfig, ExecutorError,
    KernelSource, NdRange, ProfilingCounter,
};
use opencl3::command_queue::{CL_QUEUE_PROFILING_ENABLE, CommandQueue};
use opencl3::context::Context;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_CUSTOM,
    CL_DEVICE_TYPE_GPU, Device as RawDevice,
};
use opencl3::event::Event;
use opencl3::kernel::Kernel;
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_device_type};
use std::fmt;
use tracing::{debug, info, warn};

/// Map an OpenCL device type bitfield to [`DeviceKind`].
pub fn kind_from_cl_type(bits: cl_device_type) -> DeviceKind {
    if bits & CL_DEVICE_TYPE_GPU != 0 {
        DeviceKind::Gpu
    } else if bits & CL_DEVICE_TYPE_CPU != 0 {
        DeviceKind::Cpu
    } else if bits & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        DeviceKind::Accelerator
    } else if bits & CL_DEVICE_TYPE_CUSTOM != 0 {
        DeviceKind::Custom
    } else {
        DeviceKind::Unknown
    }
}

/// Every device on every platform, in index order.
fn enumerate_raw() -> Result<Vec<(Candidate, cl_device_id)>> {
    let platforms = get_platforms().map_err(|_| OpenClError::NoPlatforms)?;
    if platforms.is_empty() {
        return Err(OpenClError::NoPlatforms);
    }

    let mut found = Vec::new();
    for (platform_index, platform) in platforms.iter().enumerate() {
        let platform_name = platform.name().unwrap_or_default();
        debug!(platform_index, %platform_name, "scanning OpenCL platform");

        let ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();
        for (device_index, id) in ids.into_iter().enumerate() {
            let device = RawDevice::new(id);
            let candidate = Candidate {
                platform_index,
                device_index,
                platform_name: platform_name.clone(),
                name: device.name().unwrap_or_default(),
                kind: kind_from_cl_type(device.dev_type().unwrap_or(0)),
            };
            debug!(%candidate, "found OpenCL device");
            found.push((candidate, id));
        }
    }
    Ok(found)
}

/// List every OpenCL device visible to this process.
pub fn enumerate() -> Result<Vec<Candidate>> {
    Ok(enumerate_raw()?.into_iter().map(|(c, _)| c).collect())
}

fn query_info(device: &RawDevice, candidate: &Candidate) -> Result<DeviceInfo> {
    Ok(DeviceInfo {
        name: candidate.name.clone(),
        platform_name: candidate.platform_name.clone(),
        kind: candidate.kind,
        max_work_group_size: device
            .max_work_group_size()
            .map_err(api("CL_DEVICE_MAX_WORK_GROUP_SIZE"))?,
        local_mem_size: device
            .local_mem_size()
            .map_err(api("CL_DEVICE_LOCAL_MEM_SIZE"))?,
        global_mem_size: device
            .global_mem_size()
            .map_err(api("CL_DEVICE_GLOBAL_MEM_SIZE"))?,
        max_mem_alloc_size: device
            .max_mem_alloc_size()
            .map_err(api("CL_DEVICE_MAX_MEM_ALLOC_SIZE"))?,
        supports_double: device.double_fp_config().map(|c| c != 0).unwrap_or(false),
    })
}

/// A profiling-enabled OpenCL device.
pub struct ClDevice {
    device: RawDevice,
    context: Context,
    queue: CommandQueue,
    info: DeviceInfo,
}

impl ClDevice {
    /// Open the device named by `config`.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        let found = enumerate_raw()?;
        let candidates: Vec<Candidate> = found.iter().map(|(c, _)| c.clone()).collect();
        let chosen = select::select(&candidates, config)?;
        let id = found
            .iter()
            .find(|(c, _)| c == chosen)
            .map(|(_, id)| *id)
            .ok_or_else(|| OpenClError::NoDevice {
                reason: format!("device {chosen} vanished during selection"),
            })?;
        Self::open(RawDevice::new(id), chosen)
    }

    /// Open the device selected by `OCLBENCH_*` environment variables.
    pub fn from_env() -> std::result::Result<Self, ExecutorError> {
        let config = ExecutorConfig::from_env()
            .map_err(|e| ExecutorError::InvalidArgument(e.to_string()))?;
        Ok(Self::from_config(&config)?)
    }

    fn open(device: RawDevice, candidate: &Candidate) -> Result<Self> {
        let info = query_info(&device, candidate)?;
        let context = Context::from_device(&device).map_err(api("clCreateContext"))?;
        let queue =
            CommandQueue::create_default_with_properties(&context, CL_QUEUE_PROFILING_ENABLE, 0)
                .map_err(api("clCreateCommandQueue"))?;
        info!(device = %info, "OpenCL device opened");
        Ok(Self {
            device,
            context,
            queue,
            info,
        })
    }

    pub(crate) fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

impl fmt::Debug for ClDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClDevice").field("info", &self.info).finish()
    }
}

impl Device for ClDevice {
    type Kernel = ClKernel;
    type Event = ClEvent;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn compile(&self, source: &KernelSource) -> oclbench_core::Result<ClKernel> {
        let program = Program::create_and_build_from_source(
            &self.context,
            source.source(),
            source.build_options(),
        )
        .map_err(|log| {
            warn!(kernel = source.name(), "OpenCL build failed");
            OpenClError::KernelCompileFailed {
                kernel_name: source.name().to_string(),
                log,
            }
        })?;
        let kernel = Kernel::create(&program, source.name()).map_err(|e| {
            OpenClError::KernelCompileFailed {
                kernel_name: source.name().to_string(),
                log: e.to_string(),
            }
        })?;
        Ok(ClKernel {
            name: source.name().to_string(),
            kernel,
            _program: program,
            device_id: self.device.id(),
        })
    }

    fn enqueue_kernel(&self, kernel: &ClKernel, range: &NdRange) -> oclbench_core::Result<ClEvent> {
        // SAFETY: the size arrays outlive the call and every argument was
        // bound by the executor before launch.
        let event = unsafe {
            self.queue.enqueue_nd_range_kernel(
                kernel.kernel.get(),
                3,
                std::ptr::null(),
                range.global.as_ptr(),
                range.local.as_ptr(),
                &[],
            )
        }
        .map_err(|e| ExecutorError::Enqueue(format!("{}: {e}", kernel.name)))?;
        Ok(ClEvent(event))
    }

    #[allow(unused_unsafe)]
    fn enqueue_marker(&self) -> oclbench_core::Result<ClEvent> {
        // SAFETY: an empty wait list; the marker touches no memory.
        let marker = unsafe { self.queue.enqueue_marker_with_wait_list(&[]) };
        marker
            .map(ClEvent)
            .map_err(|e| ExecutorError::Enqueue(format!("marker: {e}")))
    }
}

/// A kernel built from source on one device.
pub struct ClKernel {
    name: String,
    kernel: Kernel,
    _program: Program,
    device_id: cl_device_id,
}

impl ClKernel {
    pub(crate) fn raw(&self) -> &Kernel {
        &self.kernel
    }
}

impl fmt::Debug for ClKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClKernel").field("name", &self.name).finish()
    }
}

impl CompiledKernel for ClKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn work_group_size(&self) -> oclbench_core::Result<usize> {
        self.kernel
            .get_work_group_size(self.device_id)
            .map_err(|e| ExecutorError::Query(format!("CL_KERNEL_WORK_GROUP_SIZE: {e}")))
    }

    fn private_mem_size(&self) -> oclbench_core::Result<u64> {
        self.kernel
            .get_private_mem_size(self.device_id)
            .map_err(|e| ExecutorError::Query(format!("CL_KERNEL_PRIVATE_MEM_SIZE: {e}")))
    }
}

/// Completion event with profiling counters.
#[derive(Debug)]
pub struct ClEvent(Event);

impl DeviceEvent for ClEvent {
    fn wait(&self) -> oclbench_core::Result<()> {
        self.0
            .wait()
            .map_err(|e| ExecutorError::Device(format!("clWaitForEvents: {e}")))
    }

    fn profiling(&self, counter: ProfilingCounter) -> oclbench_core::Result<u64> {
        let value = match counter {
            ProfilingCounter::Queued => self.0.profiling_command_queued(),
            ProfilingCounter::Submit => self.0.profiling_command_submit(),
            ProfilingCounter::Start => self.0.profiling_command_start(),
            ProfilingCounter::End => self.0.profiling_command_end(),
        };
        value.map_err(|e| ExecutorError::Profiling {
            counter,
            reason: e.to_string(),
        })
    }
}

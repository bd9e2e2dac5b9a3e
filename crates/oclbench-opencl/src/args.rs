//! Kernel arguments for [`ClDevice`](crate::ClDevice).
//!
//! Three kinds cover every OpenCL C parameter: a global buffer, a
//! work-group local allocation, and a scalar passed by value.

#[cfg(feature = "opencl-runtime")]
use opencl3::memory::Buffer;
use std::fmt;

/// Which directions a [`GlobalArg`] moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Uploaded, never read back.
    Input,
    /// Allocated on upload, read back on download.
    Output,
    /// Uploaded and read back.
    InOut,
}

impl Access {
    pub fn uploads(self) -> bool {
        matches!(self, Self::Input | Self::InOut)
    }

    pub fn downloads(self) -> bool {
        matches!(self, Self::Output | Self::InOut)
    }
}

/// `__global T*` parameter backed by a host vector.
pub struct GlobalArg<T> {
    access: Access,
    host: Vec<T>,
    #[cfg(feature = "opencl-runtime")]
    buffer: Option<Buffer<T>>,
}

impl<T: Copy + Default> GlobalArg<T> {
    fn with_access(access: Access, host: Vec<T>) -> Self {
        Self {
            access,
            host,
            #[cfg(feature = "opencl-runtime")]
            buffer: None,
        }
    }

    pub fn input(data: impl Into<Vec<T>>) -> Self {
        Self::with_access(Access::Input, data.into())
    }

    /// `len` elements, zeroed on the host.
    pub fn output(len: usize) -> Self {
        Self::with_access(Access::Output, vec![T::default(); len])
    }

    pub fn in_out(data: impl Into<Vec<T>>) -> Self {
        Self::with_access(Access::InOut, data.into())
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn len(&self) -> usize {
        self.host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.host.len() * std::mem::size_of::<T>()
    }

    pub fn host(&self) -> &[T] {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut [T] {
        &mut self.host
    }

    pub fn at(&self, index: usize) -> Option<T> {
        self.host.get(index).copied()
    }

    pub fn into_host(self) -> Vec<T> {
        self.host
    }

    /// Host half of `clear`: output contents are zeroed, inputs keep
    /// their data.
    pub fn reset_host(&mut self) {
        if self.access == Access::Output {
            self.host.fill(T::default());
        }
    }
}

impl<T> fmt::Debug for GlobalArg<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("GlobalArg");
        s.field("access", &self.access).field("len", &self.host.len());
        #[cfg(feature = "opencl-runtime")]
        s.field("resident", &self.buffer.is_some());
        s.finish()
    }
}

/// `__local` parameter: a per-work-group allocation with no host data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalArg {
    bytes: usize,
}

impl LocalArg {
    pub fn new(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Room for `count` elements of `T`.
    pub fn of<T>(count: usize) -> Self {
        Self::new(count * std::mem::size_of::<T>())
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

/// Scalar parameter passed by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueArg<T> {
    value: T,
}

impl<T: Copy> ValueArg<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }
}

#[cfg(feature = "opencl-runtime")]
mod runtime {
    use super::{Access, GlobalArg, LocalArg, ValueArg};
    use crate::device::{ClDevice, ClKernel};
    use crate::error::OpenClError;
    use oclbench_core::{ExecutorError, KernelArg, Result};
    use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY, ClMem};
    use opencl3::types::CL_BLOCKING;
    use tracing::trace;

    fn set_arg_error(e: impl std::fmt::Display) -> ExecutorError {
        ExecutorError::Device(format!("clSetKernelArg: {e}"))
    }

    impl<T: Copy + Default> GlobalArg<T> {
        fn allocate(&mut self, device: &ClDevice) -> Result<()> {
            if self.buffer.is_some() {
                return Ok(());
            }
            if self.host.is_empty() {
                return Err(ExecutorError::InvalidArgument(
                    "global argument has no elements".into(),
                ));
            }
            let flags = match self.access {
                Access::Input => CL_MEM_READ_ONLY,
                Access::Output => CL_MEM_WRITE_ONLY,
                Access::InOut => CL_MEM_READ_WRITE,
            };
            // SAFETY: no host pointer is passed; the runtime owns the allocation.
            let buffer = unsafe {
                Buffer::<T>::create(device.context(), flags, self.host.len(), std::ptr::null_mut())
            }
            .map_err(|e| OpenClError::BufferAllocationFailed {
                size_bytes: self.size_bytes(),
                reason: e.to_string(),
            })?;
            trace!(bytes = self.size_bytes(), "allocated global buffer");
            self.buffer = Some(buffer);
            Ok(())
        }
    }

    impl<T: Copy + Default> KernelArg<ClDevice> for GlobalArg<T> {
        fn upload(&mut self, device: &ClDevice) -> Result<()> {
            self.allocate(device)?;
            if !self.access.uploads() {
                return Ok(());
            }
            if let Some(buffer) = self.buffer.as_mut() {
                // SAFETY: blocking write from a host slice of matching length.
                let written = unsafe {
                    device
                        .queue()
                        .enqueue_write_buffer(buffer, CL_BLOCKING, 0, &self.host, &[])
                };
                written.map_err(|e| ExecutorError::Device(format!("clEnqueueWriteBuffer: {e}")))?;
            }
            Ok(())
        }

        fn download(&mut self, device: &ClDevice) -> Result<()> {
            if !self.access.downloads() {
                return Ok(());
            }
            if let Some(buffer) = self.buffer.as_ref() {
                // SAFETY: blocking read into a host slice of matching length.
                let read = unsafe {
                    device
                        .queue()
                        .enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut self.host, &[])
                };
                read.map_err(|e| ExecutorError::Device(format!("clEnqueueReadBuffer: {e}")))?;
            }
            Ok(())
        }

        fn clear(&mut self) {
            self.buffer = None;
            self.reset_host();
        }

        fn bind(&self, kernel: &ClKernel, index: u32) -> Result<()> {
            let buffer = self.buffer.as_ref().ok_or_else(|| {
                ExecutorError::InvalidArgument("global argument bound before upload".into())
            })?;
            // SAFETY: `buffer` lives as long as this argument, which the
            // caller keeps alive across the launch.
            let set = unsafe { kernel.raw().set_arg(index, &buffer.get()) };
            set.map_err(set_arg_error)
        }
    }

    impl KernelArg<ClDevice> for LocalArg {
        fn upload(&mut self, _: &ClDevice) -> Result<()> {
            Ok(())
        }

        fn download(&mut self, _: &ClDevice) -> Result<()> {
            Ok(())
        }

        fn clear(&mut self) {}

        fn bind(&self, kernel: &ClKernel, index: u32) -> Result<()> {
            // SAFETY: a null-pointer local allocation of `bytes`.
            let set = unsafe { kernel.raw().set_arg_local_buffer(index, self.bytes) };
            set.map_err(set_arg_error)
        }
    }

    impl<T: Copy> KernelArg<ClDevice> for ValueArg<T> {
        fn upload(&mut self, _: &ClDevice) -> Result<()> {
            Ok(())
        }

        fn download(&mut self, _: &ClDevice) -> Result<()> {
            Ok(())
        }

        fn clear(&mut self) {}

        fn bind(&self, kernel: &ClKernel, index: u32) -> Result<()> {
            // SAFETY: the kernel parameter at `index` is declared as `T`.
            let set = unsafe { kernel.raw().set_arg(index, &self.value) };
            set.map_err(set_arg_error)
        }
    }
}

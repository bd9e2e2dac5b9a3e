//! Errors from the OpenCL backend.

use oclbench_core::ExecutorError;
use std::fmt::Display;

/// Failures while opening a device or talking to the OpenCL runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpenClError {
    #[error("no OpenCL platforms found")]
    NoPlatforms,

    #[error("no OpenCL device: {reason}")]
    NoDevice { reason: String },

    #[error("{op} failed: {reason}")]
    Api { op: &'static str, reason: String },

    #[error("kernel '{kernel_name}' compile failed: {log}")]
    KernelCompileFailed { kernel_name: String, log: String },

    #[error("buffer allocation ({size_bytes} bytes) failed: {reason}")]
    BufferAllocationFailed { size_bytes: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, OpenClError>;

/// Wrap a runtime error code with the name of the call that produced it.
#[cfg_attr(not(feature = "opencl-runtime"), allow(dead_code))]
pub(crate) fn api<E: Display>(op: &'static str) -> impl FnOnce(E) -> OpenClError {
    move |e| OpenClError::Api {
        op,
        reason: e.to_string(),
    }
}

impl From<OpenClError> for ExecutorError {
    fn from(e: OpenClError) -> Self {
        match e {
            OpenClError::NoPlatforms | OpenClError::NoDevice { .. } => {
                ExecutorError::NoDevice(e.to_string())
            }
            OpenClError::KernelCompileFailed { kernel_name, log } => ExecutorError::Build {
                name: kernel_name,
                log,
            },
            other => ExecutorError::Device(other.to_string()),
        }
    }
}

//! OpenCL collaborator for `oclbench-core`.
//!
//! This crate provides:
//! - [`select`]: device selection policy from an [`ExecutorConfig`](oclbench_core::ExecutorConfig)
//! - [`args`]: global, local and by-value kernel arguments
//! - [`error`]: backend errors and their mapping into
//!   [`ExecutorError`](oclbench_core::ExecutorError)
//!
//! With the `opencl-runtime` feature, [`ClDevice`] opens a real device
//! through `opencl3` and the argument kinds implement
//! [`KernelArg`](oclbench_core::KernelArg) for it. Without the feature
//! only the host-side halves are built, so the workspace compiles and
//! tests on machines without an ICD loader.

pub mod args;
#[cfg(feature = "opencl-runtime")]
pub mod device;
pub mod error;
pub mod select;

// Re-export primary public types.
pub use args::{Access, GlobalArg, LocalArg, ValueArg};
#[cfg(feature = "opencl-runtime")]
pub use device::{ClDevice, ClEvent, ClKernel, enumerate, kind_from_cl_type};
pub use error::OpenClError;
pub use select::{Candidate, select};

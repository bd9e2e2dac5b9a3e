//! Kernel execution and timing harness for auto-tuning.
//!
//! This crate provides:
//! - [`Executor`]: exclusive session on one device with `execute`,
//!   `benchmark`, `evaluate` and `benchmark_suite`
//! - [`device`] and [`arg`]: the traits a backend and its kernel
//!   arguments implement
//! - [`timing`], [`outcome`], [`timeout`]: profiling arithmetic and result
//!   types
//! - [`config`]: TOML and `OCLBENCH_*` environment configuration
//! - [`reference`]: a deterministic in-process device for dry runs and tests
//!
//! A search loop calls [`Executor::evaluate`] per configuration and reads
//! [`Evaluation`]; configurations that do not fit or run too long are
//! results, not errors.

pub mod arg;
mod bench;
pub mod config;
pub mod device;
pub mod error;
mod evaluate;
pub mod executor;
pub mod kernel;
pub mod outcome;
pub mod range;
pub mod reference;
pub mod suite;
pub mod timeout;
pub mod timing;

// Re-export primary public types.
pub use arg::{ArgList, KernelArg};
pub use config::{ConfigError, ExecutorConfig};
pub use device::{CompiledKernel, Device, DeviceEvent, DeviceInfo, DeviceKind, ProfilingCounter};
pub use error::{ExecutorError, Result};
pub use executor::Executor;
pub use kernel::{KernelSource, WORKGROUP_GUARD_PREAMBLE};
pub use outcome::{Evaluation, median};
pub use range::NdRange;
pub use reference::{
    Command, LatencyModel, PerGroupLatency, ReferenceBuffer, ReferenceDevice, ScriptedLatency,
};
pub use suite::{ArgFactory, SuiteReport, human_bytes};
pub use timeout::Timeout;
pub use timing::{KernelTime, human_ms};

//! Executor error types.

use crate::device::ProfilingCounter;
use thiserror::Error;

/// Errors produced by the executor and its device collaborators.
///
/// Only device contract violations travel through this type. Expected
/// search outcomes (oversized work-groups, slow configurations) are
/// reported through [`crate::Evaluation`] instead.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no device available: {0}")]
    NoDevice(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("failed to build kernel '{name}': {log}")]
    Build { name: String, log: String },

    #[error("profiling counter {counter:?} unavailable: {reason}")]
    Profiling {
        counter: ProfilingCounter,
        reason: String,
    },

    #[error("enqueue failed: {0}")]
    Enqueue(String),

    #[error("argument {index} failed to {op}: {reason}")]
    Argument {
        index: usize,
        op: &'static str,
        reason: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("work-group query failed: {0}")]
    Query(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ExecutorError>;

impl ExecutorError {
    /// Attach a positional index and operation name to an argument failure.
    pub fn for_argument(self, index: usize, op: &'static str) -> Self {
        match self {
            Self::Argument { .. } => self,
            other => Self::Argument {
                index,
                op,
                reason: other.to_string(),
            },
        }
    }
}

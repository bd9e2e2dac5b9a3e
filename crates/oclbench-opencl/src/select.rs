//! Device selection from an [`ExecutorConfig`].
//!
//! Kept free of runtime calls so the policy can be tested without an
//! OpenCL installation.

use crate::error::{OpenClError, Result};
use oclbench_core::{DeviceKind, ExecutorConfig};
use std::fmt;

/// One device found while enumerating platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub platform_index: usize,
    pub device_index: usize,
    pub platform_name: String,
    pub name: String,
    pub kind: DeviceKind,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {} ({}) on {}",
            self.platform_index, self.device_index, self.name, self.kind, self.platform_name
        )
    }
}

/// Pick the device `config` asks for.
///
/// With `device_type` set, the first device of that kind wins, scanning
/// platforms and devices in index order. Otherwise the platform and
/// device indices must name an existing device.
pub fn select<'a>(candidates: &'a [Candidate], config: &ExecutorConfig) -> Result<&'a Candidate> {
    if candidates.is_empty() {
        return Err(OpenClError::NoPlatforms);
    }

    if let Some(kind) = config.device_type {
        return candidates
            .iter()
            .find(|c| c.kind == kind)
            .ok_or_else(|| OpenClError::NoDevice {
                reason: format!("no {kind} device on any platform"),
            });
    }

    let on_platform: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.platform_index == config.platform_index)
        .collect();
    if on_platform.is_empty() {
        let platforms = candidates
            .iter()
            .map(|c| c.platform_index)
            .max()
            .map_or(0, |m| m + 1);
        return Err(OpenClError::NoDevice {
            reason: format!(
                "platform {} not available ({platforms} platform(s) with devices)",
                config.platform_index
            ),
        });
    }

    on_platform
        .iter()
        .copied()
        .find(|c| c.device_index == config.device_index)
        .ok_or_else(|| OpenClError::NoDevice {
            reason: format!(
                "platform {} has {} device(s), index {} requested",
                config.platform_index,
                on_platform.len(),
                config.device_index
            ),
        })
}

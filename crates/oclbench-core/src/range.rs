//! Work-size configuration for a 3-D dispatch.

use crate::error::{ExecutorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local (work-group) and global sizes for all three dimensions.
///
/// Divisibility of global by local is left to the device; the executor
/// only checks the local product against the kernel's work-group limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NdRange {
    pub local: [usize; 3],
    pub global: [usize; 3],
}

impl NdRange {
    pub fn new(local: [usize; 3], global: [usize; 3]) -> Self {
        Self { local, global }
    }

    /// Build from the six scalar sizes in (local×3, global×3) order.
    pub fn from_sizes(
        local1: usize,
        local2: usize,
        local3: usize,
        global1: usize,
        global2: usize,
        global3: usize,
    ) -> Self {
        Self::new([local1, local2, local3], [global1, global2, global3])
    }

    /// A 1-D range; the other two dimensions are 1.
    pub fn linear(local: usize, global: usize) -> Self {
        Self::new([local, 1, 1], [global, 1, 1])
    }

    /// Work-items per work-group, or `None` if the product overflows.
    pub fn local_size(&self) -> Option<usize> {
        checked_product(&self.local)
    }

    /// Total work-items, or `None` if the product overflows.
    pub fn global_size(&self) -> Option<usize> {
        checked_product(&self.global)
    }

    /// Number of work-groups, rounding partial groups up. Saturates at
    /// `usize::MAX`.
    pub fn group_count(&self) -> usize {
        self.global
            .iter()
            .zip(self.local.iter())
            .map(|(&g, &l)| if l == 0 { 0 } else { g.div_ceil(l) })
            .fold(1usize, usize::saturating_mul)
    }

    /// Reject zero sizes.
    pub fn validate(&self) -> Result<()> {
        if self.local.iter().chain(self.global.iter()).any(|&s| s == 0) {
            return Err(ExecutorError::InvalidArgument(format!(
                "work sizes must be positive, got {self}"
            )));
        }
        Ok(())
    }
}

fn checked_product(sizes: &[usize; 3]) -> Option<usize> {
    sizes.iter().try_fold(1usize, |acc, &s| acc.checked_mul(s))
}

impl fmt::Display for NdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "local=({},{},{}) global=({},{},{})",
            self.local[0], self.local[1], self.local[2], self.global[0], self.global[1], self.global[2]
        )
    }
}

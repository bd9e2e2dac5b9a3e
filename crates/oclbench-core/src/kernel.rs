//! Kernel descriptions.

use std::sync::Arc;

/// Preamble prepended to probe kernels.
///
/// Kernels opt in by expanding `WORKGROUP_GUARD` at the top of their body;
/// with this definition every work-item outside work-group `(0,0,0)`
/// returns immediately.
pub const WORKGROUP_GUARD_PREAMBLE: &str = "#define WORKGROUP_GUARD {for(int i = 0; i < get_work_dim(); ++i) if(get_group_id(i)!=0) return;}\n";

/// Immutable source, entry-point name and build options.
///
/// Cloning is cheap; derived descriptions share nothing mutable with the
/// source they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    source: Arc<str>,
    name: Arc<str>,
    build_options: Arc<str>,
}

impl KernelSource {
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        build_options: impl Into<String>,
    ) -> Self {
        Self {
            source: Arc::from(source.into()),
            name: Arc::from(name.into()),
            build_options: Arc::from(build_options.into()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build_options(&self) -> &str {
        &self.build_options
    }

    /// Derive a description with different source text, keeping name and
    /// build options.
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self {
            source: Arc::from(source.into()),
            name: Arc::clone(&self.name),
            build_options: Arc::clone(&self.build_options),
        }
    }

    /// Derive the single-work-group probe variant of this kernel.
    pub fn with_workgroup_guard(&self) -> Self {
        self.with_source(format!("{WORKGROUP_GUARD_PREAMBLE}{}", self.source))
    }

    /// Whether the source starts with the work-group guard preamble.
    pub fn is_guarded(&self) -> bool {
        self.source.starts_with(WORKGROUP_GUARD_PREAMBLE)
    }
}

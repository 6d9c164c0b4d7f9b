//! Compiler configuration.

use bitflags::bitflags;
use dyncode_compiler::{DEFAULT_MODULE_NAME, MethodFlags};

/// Call depth allowed before a running callable fails with a stack overflow.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

bitflags! {
    /// Which compiled members the orchestrator may bind.
    ///
    /// A member is admitted when both its access (public or not) and its
    /// storage (static or instance) are in the mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Visibility: u8 {
        const PUBLIC     = 1 << 0;
        const NON_PUBLIC = 1 << 1;
        const STATIC     = 1 << 2;
        const INSTANCE   = 1 << 3;
    }
}

impl Default for Visibility {
    /// Public members, static or not.
    fn default() -> Self {
        Visibility::PUBLIC | Visibility::STATIC | Visibility::INSTANCE
    }
}

impl Visibility {
    pub fn admits(&self, flags: MethodFlags) -> bool {
        let access = if flags.contains(MethodFlags::PUBLIC) {
            Visibility::PUBLIC
        } else {
            Visibility::NON_PUBLIC
        };
        let storage = if flags.is_static() {
            Visibility::STATIC
        } else {
            Visibility::INSTANCE
        };
        self.contains(access | storage)
    }
}

/// Settings for a [`DynamicCompiler`](crate::DynamicCompiler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Name given to every compiled module.
    pub module_name: String,
    /// Members the orchestrator may bind.
    pub visibility: Visibility,
    /// Frames a callable may nest before failing.
    pub max_call_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            visibility: Visibility::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

//! Orchestrator errors.

use dyncode_core::Diagnostics;
use thiserror::Error;

use crate::analyzer::AnalysisError;
use crate::backend::{BindingError, LoadError};
use crate::contract::ContractError;
use crate::matcher::MatchError;

/// Coarse grouping of [`CompileError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The source could not be turned into a single loadable type.
    MalformedSource,
    /// The source is fine but nothing in it fits the contract.
    ContractNotImplemented,
    /// The contract itself was built wrong.
    BuilderMisuse,
}

/// Everything [`DynamicCompiler::compile`](crate::DynamicCompiler::compile) can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    NoMatch(#[from] MatchError),

    #[error("compilation failed with {} error(s):\n{diagnostics}", diagnostics.error_count())]
    CompilationFailed { diagnostics: Diagnostics },

    #[error("the compiled module could not be loaded: {0}")]
    LoadFailed(#[from] LoadError),

    #[error("'{type_name}' has no accessible member '{member}' matching the contract")]
    MemberNotFound { type_name: String, member: String },

    #[error("the compiled member does not fit the contract: {0}")]
    BindingMismatch(#[from] BindingError),
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::Contract(_) => ErrorCategory::BuilderMisuse,
            CompileError::Analysis(_) | CompileError::CompilationFailed { .. } | CompileError::LoadFailed(_) => {
                ErrorCategory::MalformedSource
            }
            CompileError::NoMatch(_) | CompileError::MemberNotFound { .. } | CompileError::BindingMismatch(_) => {
                ErrorCategory::ContractNotImplemented
            }
        }
    }

    /// Compiler diagnostics, when compilation is what failed.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::CompilationFailed { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }
}

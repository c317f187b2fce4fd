use thiserror::Error;

use crate::dependence::AnalysisError;
use crate::ir::IrError;

/// Fatal conditions of a slicing run.
///
/// None of these is recoverable in place: a partially sliced program is not a
/// meaningful result, so callers are expected to abort on any of them.
#[derive(Debug, Error)]
pub enum SliceError {
    /// A call's target is not statically known.
    #[error("Cannot resolve callee of {instruction} in @{function}: indirect calls are not supported")]
    Resolution { function: String, instruction: String },

    #[error("No instruction found at {file}:{line}")]
    TargetNotFound { file: String, line: u32 },

    #[error("Source function @{0} does not exist in the module")]
    RootNotFound(String),

    #[error("No call path from @{source_function} reaches a target instruction ({targets})")]
    PathNotFound { source_function: String, targets: String },

    /// Removing `function` would drop a value some surviving code still consumes.
    #[error(
        "Refusing to remove @{function}: {instruction} in @{caller} uses its non-void result ({ty})"
    )]
    UnsafeRemoval { function: String, caller: String, instruction: String, ty: String },

    #[error("Invalid slice configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Ir(#[from] IrError),
}

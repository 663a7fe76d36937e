//! Map function errors
//!
//! None of these reach a store caller. The view layer logs them and treats
//! the document as having emitted nothing.

use thiserror::Error;

/// Result type alias for map function compilation and evaluation
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Error raised while compiling or running a map function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Source could not be tokenized or parsed
    #[error("syntax error at offset {position}: {message}")]
    Syntax {
        /// Byte offset into the source
        position: usize,
        /// What went wrong
        message: String,
    },

    /// The function threw while running
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Evaluation ran past its step budget
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),

    /// Evaluation or parsing nested too deeply
    #[error("nesting depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    /// A string, array or object grew past the size budget
    #[error("value size limit of {0} bytes exceeded")]
    SizeLimitExceeded(usize),
}

impl ScriptError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ScriptError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        ScriptError::Runtime(message.into())
    }
}

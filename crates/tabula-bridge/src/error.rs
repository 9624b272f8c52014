//! Error types for the bridge
//!
//! - `ScriptError`: the error a trampoline hands back to its adapter, which
//!   the adapter raises inside the scripting runtime
//! - `CallError`: why a bridged call failed (argument count, argument type,
//!   contained panic, marshalling)
//! - `MarshalError`: failures while moving values across the stack

use crate::state::ScriptState;
use thiserror::Error;

/// An error raised into the scripting runtime
///
/// Built by [`ScriptState::raise_error`] / [`ScriptState::raise_arg_error`] so
/// each adapter controls the final message format.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    /// Script-visible message
    pub message: String,
    /// 1-based argument index, for argument errors
    pub argument: Option<usize>,
}

impl ScriptError {
    /// Create a general runtime error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            argument: None,
        }
    }

    /// Create an error blaming a specific argument
    pub fn argument(index: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            argument: Some(index),
        }
    }
}

/// Failures while marshalling values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// Table nesting went past the configured limit (usually a cycle)
    #[error("value nesting exceeds the limit of {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Why a bridged native function call failed
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    /// Fewer arguments than required parameters
    #[error("got {given} arguments, needed {needed}")]
    ArgumentCount { given: usize, needed: usize },

    /// Argument not convertible to the parameter type
    #[error("wrong argument type: got {given}, wanted {wanted}")]
    ArgumentType {
        index: usize,
        given: String,
        wanted: String,
    },

    /// The native function panicked
    #[error("function panic: {message}")]
    Panic { message: String },

    /// Reading arguments or writing results failed
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

impl CallError {
    /// Raise this error through the adapter
    ///
    /// Argument type errors go through `raise_arg_error` so the adapter can
    /// cite the offending argument; everything else uses `raise_error`.
    pub fn raise<S: ScriptState + ?Sized>(&self, state: &mut S) -> ScriptError {
        match self {
            CallError::ArgumentType { index, .. } => {
                state.raise_arg_error(*index, &self.to_string())
            }
            _ => state.raise_error(&self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_count_message() {
        let err = CallError::ArgumentCount {
            given: 1,
            needed: 2,
        };
        insta::assert_snapshot!(err.to_string(), @"got 1 arguments, needed 2");
    }

    #[test]
    fn test_argument_type_message() {
        let err = CallError::ArgumentType {
            index: 2,
            given: "string".to_string(),
            wanted: "integer".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"wrong argument type: got string, wanted integer");
    }

    #[test]
    fn test_panic_message() {
        let err = CallError::Panic {
            message: "boom".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"function panic: boom");
    }

    #[test]
    fn test_marshal_error_is_transparent() {
        let err: CallError = MarshalError::DepthExceeded { limit: 4 }.into();
        insta::assert_snapshot!(err.to_string(), @"value nesting exceeds the limit of 4 levels");
    }

    #[test]
    fn test_script_error_argument() {
        let err = ScriptError::argument(3, "bad");
        assert_eq!(err.argument, Some(3));
        assert_eq!(err.to_string(), "bad");
    }
}

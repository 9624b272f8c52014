//! Native functions as runtime-callable values

use super::MarshalContext;
use crate::error::{CallError, ScriptError};
use crate::function::NativeFunction;
use crate::state::{ScriptState, Trampoline};
use std::rc::Rc;
use tracing::{debug, trace};

impl MarshalContext {
    /// Wrap `function` into a trampoline the runtime can call
    ///
    /// The trampoline keeps a copy of this context, so arguments and results
    /// are marshalled with the same settings the function was written with.
    pub fn trampoline(&self, function: NativeFunction) -> Trampoline {
        let context = self.clone();
        Rc::new(move |state: &mut dyn ScriptState| context.invoke(state, &function))
    }

    /// Run one call of `function` against the arguments on the stack
    ///
    /// Arguments occupy positions `1..=top()`. Missing arguments, arguments
    /// of the wrong type and panics are raised through the adapter. On
    /// success every result is pushed and their count returned.
    pub fn invoke(
        &self,
        state: &mut dyn ScriptState,
        function: &NativeFunction,
    ) -> Result<usize, ScriptError> {
        let name = function.name().unwrap_or("<anonymous>");
        let given = usize::try_from(state.top()).unwrap_or(0);
        let accepted = function.signature().accepted_arguments(given);
        trace!(function = name, given, accepted, "reconciling arguments");

        if accepted > given {
            let err = CallError::ArgumentCount {
                given,
                needed: accepted,
            };
            debug!(function = name, error = %err, "call rejected");
            return Err(err.raise(state));
        }

        let mut args = Vec::with_capacity(accepted);
        for pos in 1..=accepted {
            match self.read(state, pos as i32) {
                Ok(value) => args.push(value),
                Err(e) => return Err(CallError::from(e).raise(state)),
            }
        }

        let results = match function.call(args) {
            Ok(results) => results,
            Err(err) => {
                if let CallError::ArgumentType { .. } = err {
                    debug!(function = name, error = %err, "call rejected");
                }
                return Err(err.raise(state));
            }
        };

        for (pushed, value) in results.iter().enumerate() {
            if let Err(e) = self.write(state, value) {
                state.pop(pushed);
                return Err(CallError::from(e).raise(state));
            }
        }
        Ok(results.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarshalError;
    use crate::function::Variadic;
    use crate::memory::MemoryState;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn push_args(state: &mut MemoryState, args: &[Value]) {
        let ctx = MarshalContext::new();
        for arg in args {
            ctx.write(state, arg).unwrap();
        }
    }

    #[test]
    fn test_invoke_pushes_results() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();
        push_args(&mut state, &[Value::Float(3.0), Value::Float(4.0)]);

        let multiply = NativeFunction::wrap(|a: i64, b: i64| a * b);
        let count = ctx.invoke(&mut state, &multiply).unwrap();

        assert_eq!(count, 1);
        assert_eq!(state.to_number(-1), 12.0);
    }

    #[test]
    fn test_invoke_too_few_arguments() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();
        push_args(&mut state, &[Value::Float(3.0)]);

        let multiply = NativeFunction::wrap(|a: i64, b: i64| a * b);
        let err = ctx.invoke(&mut state, &multiply).unwrap_err();

        assert_eq!(err.message, "got 1 arguments, needed 2");
        assert_eq!(err.argument, None);
    }

    #[test]
    fn test_invoke_argument_type_blames_index() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();
        push_args(&mut state, &[Value::Float(3.0), Value::from("four")]);

        let multiply = NativeFunction::wrap(|a: i64, b: i64| a * b);
        let err = ctx.invoke(&mut state, &multiply).unwrap_err();

        assert_eq!(err.argument, Some(2));
        assert!(err.message.contains("got string, wanted integer"));
    }

    #[test]
    fn test_invoke_variadic_with_no_rest() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();
        push_args(&mut state, &[Value::from("p")]);

        let tag = NativeFunction::wrap(|prefix: String, rest: Variadic<Value>| {
            format!("{}{}", prefix, rest.len())
        });
        ctx.invoke(&mut state, &tag).unwrap();

        assert_eq!(state.to_text(-1).as_deref(), Some("p0"));
    }

    #[test]
    fn test_invoke_result_too_deep_leaves_no_results() {
        let ctx = MarshalContext::with_max_depth(1);
        let mut state = MemoryState::new();

        let nested = NativeFunction::wrap(|| (1i64, vec![vec![1i64]]));
        let err = ctx.invoke(&mut state, &nested).unwrap_err();

        assert_eq!(
            err.message,
            MarshalError::DepthExceeded { limit: 1 }.to_string()
        );
        assert_eq!(state.top(), 0);
    }
}

//! Named globals

use super::MarshalContext;
use crate::conversion::IntoValue;
use crate::error::MarshalError;
use crate::state::ScriptState;
use crate::value::Value;
use std::collections::HashMap;
use tracing::debug;

impl MarshalContext {
    /// Bind every `(name, value)` pair as a global of the runtime
    pub fn set_globals<S, I, K, V>(&self, state: &mut S, globals: I) -> Result<(), MarshalError>
    where
        S: ScriptState + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoValue,
    {
        for (name, value) in globals {
            let name = name.as_ref();
            let value = value.into_value();
            let value = match value {
                Value::Function(function) if function.name().is_none() => {
                    Value::Function(function.with_name(name))
                }
                other => other,
            };

            self.write(state, &value)?;
            state.set_global(name);
            debug!(name, kind = value.type_name(), "bound global");
        }
        Ok(())
    }

    /// Read the named globals
    ///
    /// Unset globals read as [`Value::Nil`]. The stack depth is unchanged on
    /// return.
    pub fn get_globals<S, I, K>(&self, state: &mut S, names: I) -> Result<HashMap<String, Value>, MarshalError>
    where
        S: ScriptState + ?Sized,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut globals = HashMap::new();
        for name in names {
            let name = name.as_ref();
            state.get_global(name);
            let value = self.read(state, -1);
            state.pop(1);
            globals.insert(name.to_string(), value?);
        }
        Ok(globals)
    }

    /// Read every slot of the current frame, bottom first, without popping
    pub fn get_full_stack<S: ScriptState + ?Sized>(&self, state: &mut S) -> Result<Vec<Value>, MarshalError> {
        let top = state.top();
        (1..=top).map(|pos| self.read(state, pos)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::NativeFunction;
    use crate::memory::MemoryState;
    use crate::state::ValueTag;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_then_get() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();

        ctx.set_globals(&mut state, [("answer", 42i64)]).unwrap();
        let globals = ctx.get_globals(&mut state, ["answer", "missing"]).unwrap();

        assert_eq!(globals["answer"], Value::Float(42.0));
        assert_eq!(globals["missing"], Value::Nil);
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_functions_named_after_global() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();

        ctx.set_globals(&mut state, [("double", NativeFunction::wrap(|n: f64| n * 2.0))])
            .unwrap();

        state.get_global("double");
        assert_eq!(state.type_at(-1), ValueTag::Function);
    }

    #[test]
    fn test_full_stack_keeps_slots() {
        let ctx = MarshalContext::new();
        let mut state = MemoryState::new();
        state.push_string("a");
        state.push_bool(true);

        let stack = ctx.get_full_stack(&mut state).unwrap();
        assert_eq!(stack, vec![Value::from("a"), Value::Bool(true)]);
        assert_eq!(state.top(), 2);
    }
}

//! Native value → stack push

use super::MarshalContext;
use crate::error::MarshalError;
use crate::state::ScriptState;
use crate::value::{Capability, Value};
use std::collections::HashMap;

impl MarshalContext {
    /// Push `value` as exactly one runtime value
    ///
    /// Numbers of every kind are pushed as `f64`. Native functions become
    /// trampolines. Opaque values surface as their error text, else their
    /// display text, else nil.
    ///
    /// Nesting deeper than the context limit fails with `DepthExceeded`.
    /// A `Value` tree cannot be cyclic, so the limit only bounds recursion
    /// on the host stack; raise it for legitimately deep values.
    ///
    /// On error nothing is left on the stack.
    pub fn write<S: ScriptState + ?Sized>(&self, state: &mut S, value: &Value) -> Result<(), MarshalError> {
        self.write_at(state, value, 0)
    }

    /// Push `items` as a table indexed from 1
    pub fn write_sequence<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        items: &[Value],
    ) -> Result<(), MarshalError> {
        self.write_sequence_at(state, items, 0)
    }

    /// Push `entries` as a string-keyed table
    pub fn write_mapping<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        entries: &HashMap<String, Value>,
    ) -> Result<(), MarshalError> {
        self.write_mapping_at(state, entries, 0)
    }

    fn write_at<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        value: &Value,
        depth: usize,
    ) -> Result<(), MarshalError> {
        match value {
            Value::Nil => state.push_nil(),
            Value::Bool(b) => state.push_bool(*b),
            Value::Integer(i) => state.push_number(*i as f64),
            Value::Unsigned(u) => state.push_number(*u as f64),
            Value::Float(n) => state.push_number(*n),
            Value::String(s) => state.push_string(s),
            Value::Sequence(items) => self.write_sequence_at(state, items, depth)?,
            Value::Mapping(entries) => self.write_mapping_at(state, entries, depth)?,
            Value::Function(function) => state.push_function(self.trampoline(function.clone())),
            Value::Opaque(capability) => match capability_text(capability.as_ref()) {
                Some(text) => state.push_string(&text),
                None => state.push_nil(),
            },
        }
        Ok(())
    }

    fn write_sequence_at<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        items: &[Value],
        depth: usize,
    ) -> Result<(), MarshalError> {
        self.check_depth(depth)?;

        state.create_table(items.len(), 0);
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = self.write_at(state, item, depth + 1) {
                state.pop(1);
                return Err(e);
            }
            state.raw_set_index(-2, index as i64 + 1);
        }
        Ok(())
    }

    fn write_mapping_at<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        entries: &HashMap<String, Value>,
        depth: usize,
    ) -> Result<(), MarshalError> {
        self.check_depth(depth)?;

        state.create_table(0, entries.len());
        for (key, item) in entries {
            state.push_string(key);
            if let Err(e) = self.write_at(state, item, depth + 1) {
                state.pop(2);
                return Err(e);
            }
            state.raw_set();
        }
        Ok(())
    }
}

fn capability_text(capability: &dyn Capability) -> Option<String> {
    capability
        .error_text()
        .or_else(|| capability.display_text())
}

//! Tabula Bridge - value marshalling for stack-based scripting runtimes
//!
//! This library moves values between Rust and an embedded scripting runtime
//! that exposes a C-style stack API:
//! - Reading stack values (including nested tables) as native [`Value`]s
//! - Classifying tables as sequences or mappings
//! - Writing native values, including callable Rust functions
//! - Binding and reading named globals
//!
//! The runtime is reached only through the [`ScriptState`] trait. The
//! [`memory`] module provides an in-process implementation of it.
//!
//! # Examples
//!
//! ```
//! use tabula_bridge::memory::MemoryState;
//! use tabula_bridge::{get_globals, set_globals, NativeFunction, ScriptState, Value};
//!
//! let mut state = MemoryState::new();
//! set_globals(&mut state, [("multiply", NativeFunction::wrap(|a: i64, b: i64| a * b))]).unwrap();
//!
//! state.get_global("multiply");
//! state.push_number(6.0);
//! state.push_number(7.0);
//! state.call(2).unwrap();
//! state.set_global("answer");
//!
//! let globals = get_globals(&mut state, ["answer"]).unwrap();
//! assert_eq!(globals["answer"], Value::Float(42.0));
//! ```

/// Tabula bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod conversion;
pub mod error;
pub mod function;
pub mod marshal;
pub mod memory;
pub mod state;
pub mod value;

pub use conversion::{ConversionError, FromValue, IntoValue, IntoValues};
pub use error::{CallError, MarshalError, ScriptError};
pub use function::{
    BuildError, IntoNativeFunction, NativeFunction, NativeFunctionBuilder, Param, ParamKind,
    Signature, Variadic,
};
pub use marshal::{read_text, MarshalContext, TableShape};
pub use state::{ScriptState, Trampoline, ValueTag};
pub use value::{Capability, DisplayText, ErrorText, Value, ValueType};

use std::collections::HashMap;

/// Bind every `(name, value)` pair as a global, with the default context
pub fn set_globals<S, I, K, V>(state: &mut S, globals: I) -> Result<(), MarshalError>
where
    S: ScriptState + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: IntoValue,
{
    MarshalContext::default().set_globals(state, globals)
}

/// Read the named globals, with the default context
pub fn get_globals<S, I, K>(state: &mut S, names: I) -> Result<HashMap<String, Value>, MarshalError>
where
    S: ScriptState + ?Sized,
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    MarshalContext::default().get_globals(state, names)
}

/// Read every slot of the current frame, with the default context
pub fn get_full_stack<S: ScriptState + ?Sized>(state: &mut S) -> Result<Vec<Value>, MarshalError> {
    MarshalContext::default().get_full_stack(state)
}

/// Read the value at `pos`, with the default context
pub fn read_any<S: ScriptState + ?Sized>(state: &mut S, pos: i32) -> Result<Value, MarshalError> {
    MarshalContext::default().read(state, pos)
}

/// Classify the table at `pos`, with the default context
pub fn read_table<S: ScriptState + ?Sized>(state: &mut S, pos: i32) -> Result<TableShape, MarshalError> {
    MarshalContext::default().classify(state, pos)
}

/// Push `value`, with the default context
pub fn push_any<S: ScriptState + ?Sized>(state: &mut S, value: &Value) -> Result<(), MarshalError> {
    MarshalContext::default().write(state, value)
}

/// Push `items` as a sequence table, with the default context
pub fn push_sequence<S: ScriptState + ?Sized>(state: &mut S, items: &[Value]) -> Result<(), MarshalError> {
    MarshalContext::default().write_sequence(state, items)
}

/// Push `entries` as a mapping table, with the default context
pub fn push_mapping<S: ScriptState + ?Sized>(
    state: &mut S,
    entries: &HashMap<String, Value>,
) -> Result<(), MarshalError> {
    MarshalContext::default().write_mapping(state, entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        assert_eq!(VERSION, "0.1.0");
    }
}

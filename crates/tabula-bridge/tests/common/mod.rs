//! Shared test utilities
//!
//! Helpers that perform what a script would do against a `MemoryState`:
//! calling a global function, collecting results into a table, assigning
//! globals.

#![allow(dead_code)]

use tabula_bridge::memory::MemoryState;
use tabula_bridge::{push_any, read_any, ScriptError, ScriptState, Value};

/// Call the global function `name` with `args` and read back its results
///
/// # Example
/// ```
/// let results = call_global(&mut state, "multi", &[]).unwrap();
/// ```
pub fn call_global(state: &mut MemoryState, name: &str, args: &[Value]) -> Result<Vec<Value>, ScriptError> {
    let count = call_leaving_results(state, name, args)?;
    let top = state.top();
    let first = top - count as i32 + 1;
    let results = (first..=top)
        .map(|pos| read_any(state, pos).expect("result readable"))
        .collect();
    state.pop(count);
    Ok(results)
}

/// Call the global function `name` and collect its results into a table,
/// the way `{name(args...)}` would, then read that table back
///
/// Nil results leave holes, so `{nil, "x"}` reads as a mapping.
pub fn call_packed(state: &mut MemoryState, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let count = call_leaving_results(state, name, args)?;
    let first = state.top() - count as i32 + 1;

    state.new_table();
    let table = state.top();
    for i in 0..count as i32 {
        state.push_value(first + i);
        state.raw_set_index(table, i64::from(i) + 1);
    }

    let packed = read_any(state, table).expect("packed table readable");
    state.pop(count + 1);
    Ok(packed)
}

/// `target = name(args...)`: bind the first result (or nil) as a global
pub fn assign_call(state: &mut MemoryState, target: &str, name: &str, args: &[Value]) -> Result<(), ScriptError> {
    let count = call_leaving_results(state, name, args)?;
    if count == 0 {
        state.push_nil();
    } else {
        state.pop(count - 1);
    }
    state.set_global(target);
    Ok(())
}

fn call_leaving_results(state: &mut MemoryState, name: &str, args: &[Value]) -> Result<usize, ScriptError> {
    state.get_global(name);
    for arg in args {
        push_any(state, arg).expect("argument writable");
    }
    state.call(args.len())
}

/// Numbers as the runtime reads them back
pub fn num(n: f64) -> Value {
    Value::Float(n)
}

pub fn text(s: &str) -> Value {
    Value::from(s)
}

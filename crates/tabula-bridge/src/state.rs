//! Abstract runtime interface
//!
//! The primitive stack operations every concrete scripting-engine binding
//! must provide. The marshalling core only ever talks to a runtime through
//! [`ScriptState`].
//!
//! Positions follow the usual stack API convention: positive positions are
//! absolute (1-based from the bottom of the current frame), negative
//! positions are relative to the top (`-1` is the top slot).

use crate::error::ScriptError;
use std::fmt;
use std::rc::Rc;

/// Tag of a runtime value
///
/// The ordinals are fixed; adapters translate their engine's own tag
/// enumeration into exactly this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ValueTag {
    /// Position outside the stack
    None = -1,
    Nil = 0,
    Boolean = 1,
    LightUserdata = 2,
    Number = 3,
    String = 4,
    Table = 5,
    Function = 6,
    Userdata = 7,
    Thread = 8,
}

impl ValueTag {
    /// Translate a raw ordinal, returning `None` for unknown tags
    pub fn from_raw(raw: i32) -> Option<Self> {
        let tag = match raw {
            -1 => ValueTag::None,
            0 => ValueTag::Nil,
            1 => ValueTag::Boolean,
            2 => ValueTag::LightUserdata,
            3 => ValueTag::Number,
            4 => ValueTag::String,
            5 => ValueTag::Table,
            6 => ValueTag::Function,
            7 => ValueTag::Userdata,
            8 => ValueTag::Thread,
            _ => return None,
        };
        Some(tag)
    }

    /// The fixed ordinal of this tag
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Script-facing type name
    pub fn name(self) -> &'static str {
        match self {
            ValueTag::None => "no value",
            ValueTag::Nil => "nil",
            ValueTag::Boolean => "boolean",
            ValueTag::LightUserdata | ValueTag::Userdata => "userdata",
            ValueTag::Number => "number",
            ValueTag::String => "string",
            ValueTag::Table => "table",
            ValueTag::Function => "function",
            ValueTag::Thread => "thread",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-side entry point of a runtime function value
///
/// Receives the runtime with the call's arguments at positions `1..=top()`,
/// returns how many values it left on top of the stack as results. An `Err`
/// is raised by the adapter as a script-level error.
pub type Trampoline = Rc<dyn Fn(&mut dyn ScriptState) -> Result<usize, ScriptError>>;

/// Primitive stack operations of an embedded scripting runtime
///
/// The trait is object safe: trampolines receive `&mut dyn ScriptState`.
pub trait ScriptState {
    /// Pop the top value and bind it to the global `name`
    fn set_global(&mut self, name: &str);

    /// Push the value of the global `name` (nil when unset)
    fn get_global(&mut self, name: &str);

    /// Pop `n` values
    fn pop(&mut self, n: usize);

    /// Index of the top slot, which is also the number of slots in the frame
    fn top(&self) -> i32;

    /// Tag of the value at `pos`, [`ValueTag::None`] if `pos` is not valid
    fn type_at(&self, pos: i32) -> ValueTag;

    /// Truthiness of the value at `pos`
    fn to_bool(&self, pos: i32) -> bool;

    /// Text of a string (or number) value at `pos`
    fn to_text(&self, pos: i32) -> Option<String>;

    /// Numeric value at `pos`, `0.0` when not convertible
    fn to_number(&self, pos: i32) -> f64;

    /// Integer value at `pos`, `0` when not convertible
    fn to_integer(&self, pos: i32) -> i64;

    /// The runtime's length operator applied to the value at `pos`
    fn length(&self, pos: i32) -> usize;

    /// Table iteration step
    ///
    /// Pops a key and pushes the next key/value pair of the table at `table`,
    /// returning `true`; returns `false` (pushing nothing) when the table is
    /// exhausted. Start the iteration by pushing nil.
    fn next(&mut self, table: i32) -> bool;

    /// Push a new table with capacity hints for its array and record parts
    fn create_table(&mut self, narr: usize, nrec: usize);

    /// Pop a value and a key and store them in the table below them, without
    /// invoking metamethods
    fn raw_set(&mut self);

    /// Pop a value and store it at integer key `n` of the table at `table`
    fn raw_set_index(&mut self, table: i32, n: i64);

    /// Push a host function
    fn push_function(&mut self, function: Trampoline);

    fn push_string(&mut self, s: &str);

    fn push_number(&mut self, n: f64);

    fn push_bool(&mut self, b: bool);

    fn push_nil(&mut self);

    /// Build the error that aborts the current call
    fn raise_error(&mut self, message: &str) -> ScriptError;

    /// Build the error that aborts the current call, blaming argument `arg`
    fn raise_arg_error(&mut self, arg: usize, message: &str) -> ScriptError;

    /// Resolve a top-relative position to an absolute one
    fn absolute(&self, pos: i32) -> i32 {
        if pos < 0 {
            self.top() + 1 + pos
        } else {
            pos
        }
    }
}

//! In-process reference runtime
//!
//! [`MemoryState`] implements [`ScriptState`] over a plain value stack with
//! call frames, a global table and reference-semantics tables. It follows
//! the conventions of Lua-style engines closely enough to drive the
//! marshalling core end to end without linking a real interpreter:
//!
//! - the length of a table is its border (the count of consecutive non-nil
//!   integer keys starting at 1);
//! - `next` iterates keys in a stable order (booleans, then numbers, then
//!   strings);
//! - storing nil removes a key, and NaN keys are ignored;
//! - functions run in their own frame, so position 1 is their first
//!   argument.

use crate::error::ScriptError;
use crate::state::{ScriptState, Trampoline, ValueTag};
use ordered_float::OrderedFloat;
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::rc::Rc;

type TableRef = Rc<RefCell<Table>>;

#[derive(Clone)]
enum Slot {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Table(TableRef),
    Function(Trampoline),
    Userdata { _data: Rc<dyn Any> },
}

impl Slot {
    fn tag(&self) -> ValueTag {
        match self {
            Slot::Nil => ValueTag::Nil,
            Slot::Bool(_) => ValueTag::Boolean,
            Slot::Number(_) => ValueTag::Number,
            Slot::String(_) => ValueTag::String,
            Slot::Table(_) => ValueTag::Table,
            Slot::Function(_) => ValueTag::Function,
            Slot::Userdata { .. } => ValueTag::Userdata,
        }
    }
}

/// Table key with a total order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(Rc<str>),
}

impl Key {
    fn from_slot(slot: &Slot) -> Option<Self> {
        match slot {
            Slot::Bool(b) => Some(Key::Bool(*b)),
            Slot::Number(n) => Self::number(*n),
            Slot::String(s) => Some(Key::String(Rc::clone(s))),
            _ => None,
        }
    }

    fn number(n: f64) -> Option<Self> {
        if n.is_nan() {
            return None;
        }
        // -0.0 and 0.0 are the same key
        let normalized = if n == 0.0 { 0.0 } else { n };
        Some(Key::Number(OrderedFloat(normalized)))
    }

    fn to_slot(&self) -> Slot {
        match self {
            Key::Bool(b) => Slot::Bool(*b),
            Key::Number(n) => Slot::Number(n.0),
            Key::String(s) => Slot::String(Rc::clone(s)),
        }
    }
}

#[derive(Default)]
struct Table {
    entries: BTreeMap<Key, Slot>,
}

impl Table {
    fn get(&self, key: &Key) -> Slot {
        self.entries.get(key).cloned().unwrap_or(Slot::Nil)
    }

    fn set(&mut self, key: Key, value: Slot) {
        match value {
            Slot::Nil => {
                self.entries.remove(&key);
            }
            value => {
                self.entries.insert(key, value);
            }
        }
    }

    fn border(&self) -> usize {
        let mut n = 0usize;
        while self
            .entries
            .contains_key(&Key::Number(OrderedFloat((n + 1) as f64)))
        {
            n += 1;
        }
        n
    }

    fn next_after(&self, key: Option<&Key>) -> Option<(Key, Slot)> {
        let mut range = match key {
            Some(key) => self.entries.range((Bound::Excluded(key), Bound::Unbounded)),
            None => self.entries.range::<Key, _>(..),
        };
        range.next().map(|(k, v)| (k.clone(), v.clone()))
    }
}

/// Reference implementation of [`ScriptState`]
///
/// # Example
///
/// ```
/// use tabula_bridge::memory::MemoryState;
/// use tabula_bridge::{set_globals, NativeFunction, ScriptState};
///
/// let mut state = MemoryState::new();
/// set_globals(&mut state, [("add", NativeFunction::wrap(|a: f64, b: f64| a + b))]).unwrap();
///
/// state.get_global("add");
/// state.push_number(2.0);
/// state.push_number(3.0);
/// assert_eq!(state.call(2), Ok(1));
/// assert_eq!(state.to_number(-1), 5.0);
/// ```
pub struct MemoryState {
    stack: Vec<Slot>,
    /// Index into `stack` of position 1 of the current frame
    base: usize,
    globals: TableRef,
}

impl MemoryState {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            base: 0,
            globals: Rc::new(RefCell::new(Table::default())),
        }
    }

    fn index(&self, pos: i32) -> Option<usize> {
        let index = if pos > 0 {
            self.base + (pos as usize - 1)
        } else if pos < 0 {
            let back = pos.unsigned_abs() as usize;
            if back > self.stack.len() - self.base {
                return None;
            }
            self.stack.len() - back
        } else {
            return None;
        };
        (index < self.stack.len()).then_some(index)
    }

    fn slot(&self, pos: i32) -> Option<&Slot> {
        self.index(pos).map(|index| &self.stack[index])
    }

    fn table(&self, pos: i32) -> Option<TableRef> {
        match self.slot(pos) {
            Some(Slot::Table(table)) => Some(Rc::clone(table)),
            _ => None,
        }
    }

    fn push(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    fn pop_slot(&mut self) -> Slot {
        if self.stack.len() > self.base {
            self.stack.pop().unwrap_or(Slot::Nil)
        } else {
            Slot::Nil
        }
    }

    /// Push a copy of the value at `pos` (nil when `pos` is not valid)
    ///
    /// Tables are copied by reference.
    pub fn push_value(&mut self, pos: i32) {
        let slot = self.slot(pos).cloned().unwrap_or(Slot::Nil);
        self.push(slot);
    }

    /// Push a new empty table
    pub fn new_table(&mut self) {
        self.create_table(0, 0);
    }

    /// Push an opaque host object
    pub fn push_userdata(&mut self, data: Rc<dyn Any>) {
        self.push(Slot::Userdata { _data: data });
    }

    /// Set the top of the current frame, padding with nil or popping
    pub fn set_top(&mut self, top: usize) {
        self.stack.resize(self.base + top, Slot::Nil);
    }

    /// Push `t[name]` where `t` is the table at `table` (nil for non-tables)
    pub fn get_field(&mut self, table: i32, name: &str) {
        let value = match self.table(table) {
            Some(t) => t.borrow().get(&Key::String(Rc::from(name))),
            None => Slot::Nil,
        };
        self.push(value);
    }

    /// Pop a value and store it as `t[name]` where `t` is the table at `table`
    pub fn set_field(&mut self, table: i32, name: &str) {
        let target = self.table(table);
        let value = self.pop_slot();
        if let Some(t) = target {
            t.borrow_mut().set(Key::String(Rc::from(name)), value);
        }
    }

    /// Push `t[n]` where `t` is the table at `table` (nil for non-tables)
    pub fn raw_get_index(&mut self, table: i32, n: i64) {
        let value = match (self.table(table), Key::number(n as f64)) {
            (Some(t), Some(key)) => t.borrow().get(&key),
            _ => Slot::Nil,
        };
        self.push(value);
    }

    /// Protected call
    ///
    /// Calls the function sitting below the top `nargs` values. The function
    /// runs in its own frame. On success its results replace the function
    /// and arguments and their count is returned; on error the function and
    /// arguments are removed and the raised error is returned.
    pub fn call(&mut self, nargs: usize) -> Result<usize, ScriptError> {
        let available = self.stack.len() - self.base;
        if nargs >= available {
            return Err(ScriptError::new("attempt to call a nil value"));
        }

        let func_index = self.stack.len() - nargs - 1;
        let function = match &self.stack[func_index] {
            Slot::Function(f) => Rc::clone(f),
            other => {
                let message = format!("attempt to call a {} value", other.tag());
                self.stack.truncate(func_index);
                return Err(ScriptError::new(message));
            }
        };

        let saved_base = self.base;
        self.base = func_index + 1;
        let outcome = function(self);
        let frame_top = self.stack.len();
        self.base = saved_base;

        match outcome {
            Ok(count) => {
                let count = count.min(frame_top.saturating_sub(func_index + 1));
                let results = self.stack.split_off(frame_top - count);
                self.stack.truncate(func_index);
                self.stack.extend(results);
                Ok(count)
            }
            Err(e) => {
                self.stack.truncate(func_index);
                Err(e)
            }
        }
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryState")
            .field("top", &self.top())
            .field("base", &self.base)
            .finish()
    }
}

impl ScriptState for MemoryState {
    fn set_global(&mut self, name: &str) {
        let value = self.pop_slot();
        self.globals
            .borrow_mut()
            .set(Key::String(Rc::from(name)), value);
    }

    fn get_global(&mut self, name: &str) {
        let value = self.globals.borrow().get(&Key::String(Rc::from(name)));
        self.push(value);
    }

    fn pop(&mut self, n: usize) {
        let len = self.stack.len().saturating_sub(n).max(self.base);
        self.stack.truncate(len);
    }

    fn top(&self) -> i32 {
        (self.stack.len() - self.base) as i32
    }

    fn type_at(&self, pos: i32) -> ValueTag {
        self.slot(pos).map_or(ValueTag::None, Slot::tag)
    }

    fn to_bool(&self, pos: i32) -> bool {
        !matches!(self.slot(pos), None | Some(Slot::Nil) | Some(Slot::Bool(false)))
    }

    fn to_text(&self, pos: i32) -> Option<String> {
        match self.slot(pos)? {
            Slot::String(s) => Some(s.to_string()),
            Slot::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn to_number(&self, pos: i32) -> f64 {
        match self.slot(pos) {
            Some(Slot::Number(n)) => *n,
            Some(Slot::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn to_integer(&self, pos: i32) -> i64 {
        let n = match self.slot(pos) {
            Some(Slot::Number(n)) => *n,
            Some(Slot::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
            _ => return 0,
        };
        if n.fract() == 0.0 {
            n as i64
        } else {
            0
        }
    }

    fn length(&self, pos: i32) -> usize {
        match self.slot(pos) {
            Some(Slot::Table(t)) => t.borrow().border(),
            Some(Slot::String(s)) => s.len(),
            _ => 0,
        }
    }

    fn next(&mut self, table: i32) -> bool {
        let target = self.table(table);
        let key = self.pop_slot();
        let Some(target) = target else {
            return false;
        };

        let after = Key::from_slot(&key);
        let entry = target.borrow().next_after(after.as_ref());
        match entry {
            Some((key, value)) => {
                self.push(key.to_slot());
                self.push(value);
                true
            }
            None => false,
        }
    }

    fn create_table(&mut self, _narr: usize, _nrec: usize) {
        self.push(Slot::Table(Rc::new(RefCell::new(Table::default()))));
    }

    fn raw_set(&mut self) {
        let value = self.pop_slot();
        let key = self.pop_slot();
        if let (Some(t), Some(key)) = (self.table(-1), Key::from_slot(&key)) {
            t.borrow_mut().set(key, value);
        }
    }

    fn raw_set_index(&mut self, table: i32, n: i64) {
        let target = self.table(table);
        let value = self.pop_slot();
        if let (Some(t), Some(key)) = (target, Key::number(n as f64)) {
            t.borrow_mut().set(key, value);
        }
    }

    fn push_function(&mut self, function: Trampoline) {
        self.push(Slot::Function(function));
    }

    fn push_string(&mut self, s: &str) {
        self.push(Slot::String(Rc::from(s)));
    }

    fn push_number(&mut self, n: f64) {
        self.push(Slot::Number(n));
    }

    fn push_bool(&mut self, b: bool) {
        self.push(Slot::Bool(b));
    }

    fn push_nil(&mut self) {
        self.push(Slot::Nil);
    }

    fn raise_error(&mut self, message: &str) -> ScriptError {
        ScriptError::new(message)
    }

    fn raise_arg_error(&mut self, arg: usize, message: &str) -> ScriptError {
        ScriptError::argument(arg, format!("bad argument #{} ({})", arg, message))
    }
}

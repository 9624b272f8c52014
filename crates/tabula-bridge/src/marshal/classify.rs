//! Sequence-or-mapping heuristic for tables

use super::reader::read_text;
use super::MarshalContext;
use crate::error::MarshalError;
use crate::state::{ScriptState, ValueTag};
use crate::value::Value;
use std::collections::HashMap;
use tracing::trace;

/// How a table was classified
#[derive(Debug, Clone, PartialEq)]
pub enum TableShape {
    /// Every key was an integer in `1..=length`
    Sequence(Vec<Value>),
    /// Anything else, keyed by the text form of each key
    Mapping(HashMap<String, Value>),
}

impl TableShape {
    pub fn is_sequence(&self) -> bool {
        matches!(self, TableShape::Sequence(_))
    }

    pub fn len(&self) -> usize {
        match self {
            TableShape::Sequence(items) => items.len(),
            TableShape::Mapping(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<TableShape> for Value {
    fn from(shape: TableShape) -> Self {
        match shape {
            TableShape::Sequence(items) => Value::Sequence(items),
            TableShape::Mapping(map) => Value::Mapping(map),
        }
    }
}

impl MarshalContext {
    /// Classify the table at `table`
    ///
    /// A table is a sequence when its length is positive and every key is
    /// an integer between 1 and that length. An empty table is always a
    /// mapping. The stack is left as it was.
    pub fn classify<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        table: i32,
    ) -> Result<TableShape, MarshalError> {
        self.classify_at(state, table, 0)
    }

    pub(super) fn classify_at<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        table: i32,
        depth: usize,
    ) -> Result<TableShape, MarshalError> {
        self.check_depth(depth)?;

        // Iteration pushes onto the stack, so a relative position would drift
        let table = state.absolute(table);
        let size = state.length(table);

        let mut is_sequence = size > 0;
        let mut sequence = vec![Value::Nil; size];
        let mut mapping = HashMap::new();

        state.push_nil();
        while state.next(table) {
            let value = match self.read_at(state, -1, depth + 1) {
                Ok(value) => value,
                Err(e) => {
                    state.pop(2);
                    return Err(e);
                }
            };
            state.pop(1);

            if is_sequence {
                match sequence_index(state, -1, size) {
                    Some(index) => sequence[index] = value.clone(),
                    None => is_sequence = false,
                }
            }
            mapping.insert(read_text(state, -1), value);
        }

        trace!(size, entries = mapping.len(), is_sequence, "classified table");

        if is_sequence {
            Ok(TableShape::Sequence(sequence))
        } else {
            Ok(TableShape::Mapping(mapping))
        }
    }
}

/// 0-based sequence slot of the key at `pos`, if it is an integer in `1..=size`
///
/// Numeric string keys such as `"2"` count as their number.
fn sequence_index<S: ScriptState + ?Sized>(state: &S, pos: i32, size: usize) -> Option<usize> {
    if !matches!(state.type_at(pos), ValueTag::Number | ValueTag::String) {
        return None;
    }
    let key = state.to_number(pos);
    if key.fract() != 0.0 || key < 1.0 || key > size as f64 {
        return None;
    }
    Some(key as usize - 1)
}

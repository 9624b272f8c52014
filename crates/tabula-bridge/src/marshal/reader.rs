//! Stack slot → native value

use super::MarshalContext;
use crate::error::MarshalError;
use crate::state::{ScriptState, ValueTag};
use crate::value::Value;

impl MarshalContext {
    /// Read the value at `pos`
    ///
    /// Numbers always come back as [`Value::Float`]. Tables are classified
    /// into sequences or mappings. Functions, userdata and threads have no
    /// native image and read as [`Value::Nil`].
    ///
    /// Leaves the stack as it was.
    pub fn read<S: ScriptState + ?Sized>(&self, state: &mut S, pos: i32) -> Result<Value, MarshalError> {
        self.read_at(state, pos, 0)
    }

    pub(super) fn read_at<S: ScriptState + ?Sized>(
        &self,
        state: &mut S,
        pos: i32,
        depth: usize,
    ) -> Result<Value, MarshalError> {
        let value = match state.type_at(pos) {
            ValueTag::Boolean => Value::Bool(state.to_bool(pos)),
            ValueTag::Number => Value::Float(state.to_number(pos)),
            ValueTag::String => Value::String(state.to_text(pos).unwrap_or_default()),
            ValueTag::Table => self.classify_at(state, pos, depth)?.into(),
            ValueTag::None
            | ValueTag::Nil
            | ValueTag::LightUserdata
            | ValueTag::Function
            | ValueTag::Userdata
            | ValueTag::Thread => Value::Nil,
        };
        Ok(value)
    }
}

/// Text form of the scalar at `pos`
///
/// Numbers use their shortest form (`1.0` is `"1"`), switching to an
/// exponent outside `1e-4..1e21` (`"1e+21"`). Booleans are `"true"` or
/// `"false"`. Every other tag yields an empty string.
pub fn read_text<S: ScriptState + ?Sized>(state: &S, pos: i32) -> String {
    match state.type_at(pos) {
        ValueTag::Number => number_text(state.to_number(pos)),
        ValueTag::Boolean => state.to_bool(pos).to_string(),
        ValueTag::String => state.to_text(pos).unwrap_or_default(),
        _ => String::new(),
    }
}

fn number_text(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if n == 0.0 || n.is_nan() {
        return n.to_string();
    }

    let scientific = format!("{:e}", n);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..21).contains(&exponent) {
        return n.to_string();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

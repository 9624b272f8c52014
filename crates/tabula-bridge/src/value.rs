//! Native value representation
//!
//! `Value` is the host-side image of anything that crosses the script
//! boundary. `ValueType` describes what a bridged function expects and is
//! used to coerce incoming arguments.

use crate::conversion::ConversionError;
use crate::function::NativeFunction;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Host value that surfaces in the runtime as text
///
/// The writer prefers `error_text`, then `display_text`, and pushes nil when
/// both are absent.
pub trait Capability {
    fn error_text(&self) -> Option<String> {
        None
    }

    fn display_text(&self) -> Option<String> {
        None
    }
}

/// Native value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    /// Ordered values, index 0 corresponds to runtime index 1
    Sequence(Vec<Value>),
    /// String-keyed values
    Mapping(HashMap<String, Value>),
    Function(NativeFunction),
    Opaque(Rc<dyn Capability>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Sequence(items.into_iter().collect())
    }

    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn opaque(capability: impl Capability + 'static) -> Self {
        Value::Opaque(Rc::new(capability))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Function(_) => "function",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Numeric value as `f64`, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Unsigned(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key of a mapping
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Unsigned(a), Value::Unsigned(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Integer(i) => write!(f, "Integer({})", i),
            Value::Unsigned(u) => write!(f, "Unsigned({})", u),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Sequence(items) => f.debug_list().entries(items).finish(),
            Value::Mapping(map) => f.debug_map().entries(map).finish(),
            Value::Function(func) => write!(f, "{:?}", func),
            Value::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Unsigned(u)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

impl From<NativeFunction> for Value {
    fn from(function: NativeFunction) -> Self {
        Value::Function(function)
    }
}

/// Type a bridged parameter or return value is declared with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Any,
    Bool,
    Integer,
    Unsigned,
    Float,
    String,
    Sequence(Box<ValueType>),
    Mapping(Box<ValueType>),
    /// Nil, or a value of the inner type
    Optional(Box<ValueType>),
    Function,
    Opaque,
}

impl ValueType {
    pub fn sequence_of(element: ValueType) -> Self {
        ValueType::Sequence(Box::new(element))
    }

    pub fn mapping_of(element: ValueType) -> Self {
        ValueType::Mapping(Box::new(element))
    }

    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    /// Value substituted for an absent argument
    ///
    /// Function and opaque parameters have none; an absent argument for them
    /// is an error.
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            ValueType::Any | ValueType::Optional(_) => Some(Value::Nil),
            ValueType::Bool => Some(Value::Bool(false)),
            ValueType::Integer => Some(Value::Integer(0)),
            ValueType::Unsigned => Some(Value::Unsigned(0)),
            ValueType::Float => Some(Value::Float(0.0)),
            ValueType::String => Some(Value::String(String::new())),
            ValueType::Sequence(_) => Some(Value::Sequence(Vec::new())),
            ValueType::Mapping(_) => Some(Value::Mapping(HashMap::new())),
            ValueType::Function | ValueType::Opaque => None,
        }
    }

    /// Convert `value` into the shape this type describes
    ///
    /// Numbers convert between each other with truncating casts. Composites
    /// convert element-wise, absent elements becoming the element's zero
    /// value. An empty mapping is accepted as an empty sequence and a
    /// sequence as a mapping keyed by its 1-based indices.
    pub fn coerce(&self, value: Value) -> Result<Value, ConversionError> {
        match (self, value) {
            (ValueType::Any, value) => Ok(value),
            (ValueType::Optional(_), Value::Nil) => Ok(Value::Nil),
            (ValueType::Optional(inner), value) => inner.coerce(value),

            (ValueType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),

            (ValueType::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ValueType::Integer, Value::Unsigned(u)) => Ok(Value::Integer(u as i64)),
            (ValueType::Integer, Value::Float(n)) => Ok(Value::Integer(n as i64)),

            (ValueType::Unsigned, Value::Integer(i)) => Ok(Value::Unsigned(i as u64)),
            (ValueType::Unsigned, Value::Unsigned(u)) => Ok(Value::Unsigned(u)),
            (ValueType::Unsigned, Value::Float(n)) => Ok(Value::Unsigned(n as u64)),

            (ValueType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (ValueType::Float, Value::Unsigned(u)) => Ok(Value::Float(u as f64)),
            (ValueType::Float, Value::Float(n)) => Ok(Value::Float(n)),

            (ValueType::String, Value::String(s)) => Ok(Value::String(s)),

            (ValueType::Sequence(element), Value::Sequence(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    element.coerce_element(item).map_err(|e| {
                        ConversionError::SequenceElementTypeMismatch {
                            index,
                            expected: e.expected().to_string(),
                            found: e.found().to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            (ValueType::Sequence(_), Value::Mapping(map)) if map.is_empty() => {
                Ok(Value::Sequence(Vec::new()))
            }

            (ValueType::Mapping(element), Value::Mapping(map)) => map
                .into_iter()
                .map(|(key, item)| match element.coerce_element(item) {
                    Ok(item) => Ok((key, item)),
                    Err(e) => Err(ConversionError::MappingValueTypeMismatch {
                        expected: e.expected().to_string(),
                        found: e.found().to_string(),
                        key,
                    }),
                })
                .collect::<Result<HashMap<_, _>, _>>()
                .map(Value::Mapping),
            (ValueType::Mapping(element), Value::Sequence(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let key = (index + 1).to_string();
                    match element.coerce_element(item) {
                        Ok(item) => Ok((key, item)),
                        Err(e) => Err(ConversionError::MappingValueTypeMismatch {
                            expected: e.expected().to_string(),
                            found: e.found().to_string(),
                            key,
                        }),
                    }
                })
                .collect::<Result<HashMap<_, _>, _>>()
                .map(Value::Mapping),

            (ValueType::Function, value @ Value::Function(_)) => Ok(value),
            (ValueType::Opaque, value @ Value::Opaque(_)) => Ok(value),

            (wanted, value) => Err(ConversionError::TypeMismatch {
                expected: wanted.to_string(),
                found: value.type_name().to_string(),
            }),
        }
    }

    fn coerce_element(&self, value: Value) -> Result<Value, ConversionError> {
        if value.is_nil() {
            if let Some(zero) = self.zero_value() {
                return Ok(zero);
            }
        }
        self.coerce(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Unsigned => write!(f, "unsigned"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Sequence(element) => write!(f, "sequence<{}>", element),
            ValueType::Mapping(element) => write!(f, "mapping<{}>", element),
            ValueType::Optional(inner) => write!(f, "optional<{}>", inner),
            ValueType::Function => write!(f, "function"),
            ValueType::Opaque => write!(f, "opaque"),
        }
    }
}

/// Capability exposing an error's message as error text
pub struct ErrorText<E>(pub E);

impl<E: std::error::Error> Capability for ErrorText<E> {
    fn error_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// Capability exposing a value's `Display` form as display text
pub struct DisplayText<T>(pub T);

impl<T: fmt::Display> Capability for DisplayText<T> {
    fn display_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ValueType::Integer, Value::Float(3.9), Value::Integer(3))]
    #[case(ValueType::Integer, Value::Float(-3.9), Value::Integer(-3))]
    #[case(ValueType::Unsigned, Value::Float(7.0), Value::Unsigned(7))]
    #[case(ValueType::Float, Value::Integer(2), Value::Float(2.0))]
    #[case(ValueType::Bool, Value::Bool(true), Value::Bool(true))]
    #[case(ValueType::String, Value::string("x"), Value::string("x"))]
    #[case(ValueType::Any, Value::Nil, Value::Nil)]
    #[case(ValueType::optional(ValueType::Integer), Value::Nil, Value::Nil)]
    #[case(ValueType::optional(ValueType::Integer), Value::Float(1.0), Value::Integer(1))]
    fn test_coerce_accepts(#[case] wanted: ValueType, #[case] given: Value, #[case] expected: Value) {
        assert_eq!(wanted.coerce(given).unwrap(), expected);
    }

    #[rstest]
    #[case(ValueType::Integer, Value::string("1"))]
    #[case(ValueType::String, Value::Float(1.0))]
    #[case(ValueType::Bool, Value::Float(0.0))]
    #[case(ValueType::Function, Value::Float(0.0))]
    #[case(ValueType::sequence_of(ValueType::Any), Value::Bool(true))]
    fn test_coerce_rejects(#[case] wanted: ValueType, #[case] given: Value) {
        let err = wanted.coerce(given).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_coerce_sequence_elementwise() {
        let wanted = ValueType::sequence_of(ValueType::Integer);
        let given = Value::sequence(vec![Value::Float(1.0), Value::Nil, Value::Float(3.5)]);
        assert_eq!(
            wanted.coerce(given).unwrap(),
            Value::sequence(vec![Value::Integer(1), Value::Integer(0), Value::Integer(3)])
        );
    }

    #[test]
    fn test_coerce_sequence_reports_element() {
        let wanted = ValueType::sequence_of(ValueType::Float);
        let given = Value::sequence(vec![Value::Float(1.0), Value::string("two")]);
        assert_eq!(
            wanted.coerce(given).unwrap_err(),
            ConversionError::SequenceElementTypeMismatch {
                index: 1,
                expected: "float".to_string(),
                found: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_mapping_is_empty_sequence() {
        let wanted = ValueType::sequence_of(ValueType::String);
        let given = Value::Mapping(HashMap::new());
        assert_eq!(wanted.coerce(given).unwrap(), Value::Sequence(Vec::new()));
    }

    #[test]
    fn test_sequence_as_mapping_rekeyed() {
        let wanted = ValueType::mapping_of(ValueType::Any);
        let given = Value::sequence(vec![Value::string("a"), Value::string("b")]);
        assert_eq!(
            wanted.coerce(given).unwrap(),
            Value::mapping(vec![("1", Value::string("a")), ("2", Value::string("b"))])
        );
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ValueType::Any.zero_value(), Some(Value::Nil));
        assert_eq!(ValueType::Integer.zero_value(), Some(Value::Integer(0)));
        assert_eq!(ValueType::String.zero_value(), Some(Value::string("")));
        assert_eq!(
            ValueType::mapping_of(ValueType::Any).zero_value(),
            Some(Value::Mapping(HashMap::new()))
        );
        assert_eq!(ValueType::Function.zero_value(), None);
        assert_eq!(ValueType::Opaque.zero_value(), None);
    }

    #[test]
    fn test_type_display() {
        let ty = ValueType::mapping_of(ValueType::sequence_of(ValueType::optional(ValueType::Float)));
        assert_eq!(ty.to_string(), "mapping<sequence<optional<float>>>");
    }

    #[test]
    fn test_opaque_equality_is_identity() {
        let a: Rc<dyn Capability> = Rc::new(DisplayText("x"));
        let b: Rc<dyn Capability> = Rc::new(DisplayText("x"));
        assert_eq!(Value::Opaque(a.clone()), Value::Opaque(a.clone()));
        assert_ne!(Value::Opaque(a), Value::Opaque(b));
    }

    #[test]
    fn test_numeric_variants_are_distinct() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Integer(1).as_f64(), Value::Float(1.0).as_f64());
    }
}

//! Type conversion between Rust and bridge values
//!
//! Provides traits and implementations for bidirectional conversion:
//! - `IntoValue` - Convert Rust types to a bridge `Value`
//! - `IntoValues` - Convert a function's return into the values it pushes
//! - `FromValue` - Convert a bridge `Value` to Rust types
//!
//! # Examples
//!
//! ```
//! use tabula_bridge::{FromValue, IntoValue, Value};
//!
//! let value = 42i64.into_value();
//! assert_eq!(value, Value::Integer(42));
//!
//! let back: i64 = FromValue::from_value(Value::Float(42.0)).unwrap();
//! assert_eq!(back, 42);
//! ```

use crate::error::CallError;
use crate::function::NativeFunction;
use crate::value::{Capability, DisplayText, ErrorText, Value, ValueType};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;
use std::rc::Rc;
use thiserror::Error;

/// Error type for value conversion failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Sequence element type mismatch
    #[error("sequence element type mismatch at index {index}: expected {expected}, found {found}")]
    SequenceElementTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// Mapping value type mismatch
    #[error("mapping value type mismatch for key '{key}': expected {expected}, found {found}")]
    MappingValueTypeMismatch {
        key: String,
        expected: String,
        found: String,
    },
}

impl ConversionError {
    fn mismatch(expected: &ValueType, found: &Value) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            found: found.type_name().to_string(),
        }
    }

    pub fn expected(&self) -> &str {
        match self {
            ConversionError::TypeMismatch { expected, .. }
            | ConversionError::SequenceElementTypeMismatch { expected, .. }
            | ConversionError::MappingValueTypeMismatch { expected, .. } => expected,
        }
    }

    pub fn found(&self) -> &str {
        match self {
            ConversionError::TypeMismatch { found, .. }
            | ConversionError::SequenceElementTypeMismatch { found, .. }
            | ConversionError::MappingValueTypeMismatch { found, .. } => found,
        }
    }

    /// Report this failure against the 1-based argument `index`
    pub fn into_argument_error(self, index: usize) -> CallError {
        match self {
            ConversionError::TypeMismatch { expected, found }
            | ConversionError::SequenceElementTypeMismatch {
                expected, found, ..
            }
            | ConversionError::MappingValueTypeMismatch {
                expected, found, ..
            } => CallError::ArgumentType {
                index,
                given: found,
                wanted: expected,
            },
        }
    }
}

/// Trait for converting a bridge `Value` to Rust types
pub trait FromValue: Sized {
    /// Declared type of parameters of this Rust type
    fn value_type() -> ValueType;

    /// Convert from a bridge `Value`
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` if the value cannot be converted to the target type.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

/// Trait for converting Rust types to a bridge `Value`
pub trait IntoValue {
    /// Declared type of return values of this Rust type
    fn value_type() -> ValueType
    where
        Self: Sized;

    fn into_value(self) -> Value;
}

/// Conversion of a function's return into the list of values it yields
///
/// `()` yields nothing, a single value yields one, tuples yield one value
/// per element and `Result<T, E>` yields `(value, nil)` or `(nil, message)`.
pub trait IntoValues {
    fn value_types() -> Vec<ValueType>;

    fn into_values(self) -> Vec<Value>;
}

// Value itself

impl FromValue for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn into_value(self) -> Value {
        self
    }
}

// Numbers

macro_rules! impl_number {
    ($variant:ident, $value_type:expr, $target:ty => $($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn value_type() -> ValueType {
                    $value_type
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Integer(i) => Ok(i as $t),
                        Value::Unsigned(u) => Ok(u as $t),
                        Value::Float(n) => Ok(n as $t),
                        other => Err(ConversionError::mismatch(&$value_type, &other)),
                    }
                }
            }

            impl IntoValue for $t {
                fn value_type() -> ValueType {
                    $value_type
                }

                fn into_value(self) -> Value {
                    Value::$variant(self as $target)
                }
            }
        )*
    };
}

impl_number!(Integer, ValueType::Integer, i64 => i8, i16, i32, i64, isize);
impl_number!(Unsigned, ValueType::Unsigned, u64 => u8, u16, u32, u64, usize);
impl_number!(Float, ValueType::Float, f64 => f32, f64);

// bool

impl FromValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ConversionError::mismatch(&ValueType::Bool, &other)),
        }
    }
}

impl IntoValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

// Strings

impl FromValue for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(ConversionError::mismatch(&ValueType::String, &other)),
        }
    }
}

impl IntoValue for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

// Option<T>

impl<T: FromValue> FromValue for Option<T> {
    fn value_type() -> ValueType {
        ValueType::optional(T::value_type())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Nil => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn value_type() -> ValueType {
        ValueType::optional(T::value_type())
    }

    fn into_value(self) -> Value {
        match self {
            None => Value::Nil,
            Some(v) => v.into_value(),
        }
    }
}

// Vec<T> (sequence)

impl<T: FromValue> FromValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Sequence(items) => {
                let mut result = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match T::from_value(item) {
                        Ok(converted) => result.push(converted),
                        Err(ConversionError::TypeMismatch { expected, found }) => {
                            return Err(ConversionError::SequenceElementTypeMismatch {
                                index,
                                expected,
                                found,
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(result)
            }
            // An empty table reads back as an empty mapping
            Value::Mapping(map) if map.is_empty() => Ok(Vec::new()),
            other => Err(ConversionError::mismatch(&<Self as FromValue>::value_type(), &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }

    fn into_value(self) -> Value {
        Value::Sequence(self.into_iter().map(IntoValue::into_value).collect())
    }
}

// Maps (mapping)

fn mapping_entries<T: FromValue>(value: Value) -> Result<Vec<(String, T)>, ConversionError> {
    match value {
        Value::Mapping(map) => map
            .into_iter()
            .map(|(key, item)| match T::from_value(item) {
                Ok(converted) => Ok((key, converted)),
                Err(ConversionError::TypeMismatch { expected, found }) => {
                    Err(ConversionError::MappingValueTypeMismatch {
                        key,
                        expected,
                        found,
                    })
                }
                Err(e) => Err(e),
            })
            .collect(),
        other => Err(ConversionError::mismatch(
            &ValueType::mapping_of(T::value_type()),
            &other,
        )),
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn value_type() -> ValueType {
        ValueType::mapping_of(T::value_type())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(mapping_entries(value)?.into_iter().collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn value_type() -> ValueType {
        ValueType::mapping_of(T::value_type())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(mapping_entries(value)?.into_iter().collect())
    }
}

impl<K: Display, V: IntoValue, S> IntoValue for HashMap<K, V, S> {
    fn value_type() -> ValueType {
        ValueType::mapping_of(V::value_type())
    }

    fn into_value(self) -> Value {
        Value::Mapping(
            self.into_iter()
                .map(|(k, v)| (k.to_string(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: Display, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::mapping_of(V::value_type())
    }

    fn into_value(self) -> Value {
        Value::Mapping(
            self.into_iter()
                .map(|(k, v)| (k.to_string(), v.into_value()))
                .collect(),
        )
    }
}

// Functions and capabilities

impl FromValue for NativeFunction {
    fn value_type() -> ValueType {
        ValueType::Function
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Function(f) => Ok(f),
            other => Err(ConversionError::mismatch(&ValueType::Function, &other)),
        }
    }
}

impl IntoValue for NativeFunction {
    fn value_type() -> ValueType {
        ValueType::Function
    }

    fn into_value(self) -> Value {
        Value::Function(self)
    }
}

impl FromValue for Rc<dyn Capability> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Opaque(c) => Ok(c),
            other => Err(ConversionError::mismatch(&ValueType::Opaque, &other)),
        }
    }
}

impl IntoValue for Rc<dyn Capability> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn into_value(self) -> Value {
        Value::Opaque(self)
    }
}

impl<E: Error + 'static> IntoValue for ErrorText<E> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn into_value(self) -> Value {
        Value::Opaque(Rc::new(self))
    }
}

impl<T: Display + 'static> IntoValue for DisplayText<T> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn into_value(self) -> Value {
        Value::Opaque(Rc::new(self))
    }
}

// Boxed errors carry their message as error text

struct BoxedError(Box<dyn Error>);

impl Capability for BoxedError {
    fn error_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

impl IntoValue for Box<dyn Error> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn into_value(self) -> Value {
        Value::Opaque(Rc::new(BoxedError(self)))
    }
}

impl IntoValue for Box<dyn Error + Send + Sync> {
    fn value_type() -> ValueType {
        ValueType::Opaque
    }

    fn into_value(self) -> Value {
        let inner: Box<dyn Error> = self;
        Value::Opaque(Rc::new(BoxedError(inner)))
    }
}

// Multiple returns

impl IntoValues for () {
    fn value_types() -> Vec<ValueType> {
        Vec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T: IntoValue> IntoValues for T {
    fn value_types() -> Vec<ValueType> {
        vec![T::value_type()]
    }

    fn into_values(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<T: IntoValue, E: Display> IntoValues for Result<T, E> {
    fn value_types() -> Vec<ValueType> {
        vec![T::value_type(), ValueType::optional(ValueType::String)]
    }

    fn into_values(self) -> Vec<Value> {
        match self {
            Ok(value) => vec![value.into_value(), Value::Nil],
            Err(e) => vec![Value::Nil, Value::String(e.to_string())],
        }
    }
}

macro_rules! impl_tuple_values {
    ($($name:ident $var:ident),+) => {
        impl<$($name: IntoValue),+> IntoValues for ($($name,)+) {
            fn value_types() -> Vec<ValueType> {
                vec![$($name::value_type()),+]
            }

            fn into_values(self) -> Vec<Value> {
                let ($($var,)+) = self;
                vec![$($var.into_value()),+]
            }
        }
    };
}

impl_tuple_values!(A a);
impl_tuple_values!(A a, B b);
impl_tuple_values!(A a, B b, C c);
impl_tuple_values!(A a, B b, C c, D d);
impl_tuple_values!(A a, B b, C c, D d, E e);
impl_tuple_values!(A a, B b, C c, D d, E e, F f);
impl_tuple_values!(A a, B b, C c, D d, E e, F f, G g);
impl_tuple_values!(A a, B b, C c, D d, E e, F f, G g, H h);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fmt;

    #[derive(Debug)]
    struct Failure;

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "it failed")
        }
    }

    impl Error for Failure {}

    #[test]
    fn test_integer_from_float_truncates() {
        let result: i32 = FromValue::from_value(Value::Float(6.75)).unwrap();
        assert_eq!(result, 6);
    }

    #[test]
    fn test_integer_from_string_fails() {
        let result: Result<i64, _> = FromValue::from_value(Value::string("6"));
        match result.unwrap_err() {
            ConversionError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "integer");
                assert_eq!(found, "string");
            }
            other => panic!("Expected TypeMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_number_into_value_variants() {
        assert_eq!(7u8.into_value(), Value::Unsigned(7));
        assert_eq!((-7i16).into_value(), Value::Integer(-7));
        assert_eq!(0.5f32.into_value(), Value::Float(0.5));
    }

    #[test]
    fn test_vec_from_value_reports_index() {
        let value = Value::sequence(vec![Value::Bool(true), Value::Float(1.0)]);
        let result: Result<Vec<bool>, _> = FromValue::from_value(value);
        assert_eq!(
            result.unwrap_err(),
            ConversionError::SequenceElementTypeMismatch {
                index: 1,
                expected: "bool".to_string(),
                found: "float".to_string(),
            }
        );
    }

    #[test]
    fn test_vec_from_empty_mapping() {
        let result: Vec<String> = FromValue::from_value(Value::Mapping(HashMap::new())).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_hashmap_roundtrip() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i64);
        map.insert("b".to_string(), 2i64);

        let value = map.clone().into_value();
        let back: HashMap<String, i64> = FromValue::from_value(value).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_map_keys_stringified() {
        let mut map = BTreeMap::new();
        map.insert(1, "one");
        map.insert(2, "two");

        assert_eq!(
            map.into_value(),
            Value::mapping(vec![("1", Value::string("one")), ("2", Value::string("two"))])
        );
    }

    #[test]
    fn test_option_conversions() {
        let none: Option<i64> = FromValue::from_value(Value::Nil).unwrap();
        assert_eq!(none, None);
        assert_eq!(Some("x").into_value(), Value::string("x"));
        assert_eq!(None::<String>.into_value(), Value::Nil);
    }

    #[test]
    fn test_result_values() {
        let ok: Result<i64, Failure> = Ok(3);
        assert_eq!(ok.into_values(), vec![Value::Integer(3), Value::Nil]);

        let err: Result<i64, Failure> = Err(Failure);
        assert_eq!(err.into_values(), vec![Value::Nil, Value::string("it failed")]);
    }

    #[test]
    fn test_tuple_values() {
        assert_eq!(
            (1i64, "two", true).into_values(),
            vec![Value::Integer(1), Value::string("two"), Value::Bool(true)]
        );
        assert_eq!(
            <(i64, Option<String>)>::value_types(),
            vec![ValueType::Integer, ValueType::optional(ValueType::String)]
        );
        assert!(().into_values().is_empty());
    }

    #[test]
    fn test_boxed_error_carries_text() {
        let err: Box<dyn Error> = Box::new(Failure);
        match err.into_value() {
            Value::Opaque(c) => assert_eq!(c.error_text().as_deref(), Some("it failed")),
            other => panic!("Expected Opaque, got {:?}", other),
        }
    }

    #[test]
    fn test_into_argument_error() {
        let err = ConversionError::TypeMismatch {
            expected: "float".to_string(),
            found: "bool".to_string(),
        };
        assert_eq!(
            err.into_argument_error(2),
            CallError::ArgumentType {
                index: 2,
                given: "bool".to_string(),
                wanted: "float".to_string(),
            }
        );
    }
}

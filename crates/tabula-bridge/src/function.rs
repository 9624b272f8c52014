//! Native functions callable from scripts
//!
//! A [`NativeFunction`] pairs a Rust callable with the [`Signature`] it was
//! wrapped with. Signatures are captured once, from the Rust type of the
//! closure (see [`IntoNativeFunction`]) or described explicitly with
//! [`NativeFunctionBuilder`], and never change afterwards.
//!
//! # Examples
//!
//! ```
//! use tabula_bridge::{NativeFunction, Value, Variadic};
//!
//! let multiply = NativeFunction::wrap(|a: i64, b: i64| a * b);
//! assert_eq!(multiply.signature().to_string(), "(integer, integer) -> (integer)");
//!
//! let count = NativeFunction::wrap(|rest: Variadic<Value>| rest.len() as u64);
//! assert_eq!(count.call(vec![]).unwrap(), vec![Value::Unsigned(0)]);
//! ```

use crate::conversion::{ConversionError, FromValue, IntoValues};
use crate::error::CallError;
use crate::value::{Value, ValueType};
use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::vec;
use thiserror::Error;
use tracing::warn;

/// Trailing parameter collecting every remaining argument
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    pub fn new() -> Self {
        Variadic(Vec::new())
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for Variadic<T> {
    fn from(items: Vec<T>) -> Self {
        Variadic(items)
    }
}

impl<T> Deref for Variadic<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Variadic<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> IntoIterator for Variadic<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// How the last parameter of a function consumes arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Exactly one argument of this type
    Fixed(ValueType),
    /// Every remaining argument, each of this type
    Variadic(ValueType),
}

/// A type usable as the last parameter of a wrapped function
///
/// Every [`FromValue`] type is a fixed parameter; [`Variadic<T>`] collects
/// the rest. Only the last parameter may be variadic: earlier parameters
/// must be [`FromValue`].
pub trait Param: Sized {
    fn kind() -> ParamKind;

    /// Consume the arguments this parameter stands for
    fn from_arguments(args: &mut vec::IntoIter<Value>) -> Result<Self, ConversionError>;
}

impl<T: FromValue> Param for T {
    fn kind() -> ParamKind {
        ParamKind::Fixed(T::value_type())
    }

    fn from_arguments(args: &mut vec::IntoIter<Value>) -> Result<Self, ConversionError> {
        T::from_value(args.next().unwrap_or_default())
    }
}

impl<T: FromValue> Param for Variadic<T> {
    fn kind() -> ParamKind {
        ParamKind::Variadic(T::value_type())
    }

    fn from_arguments(args: &mut vec::IntoIter<Value>) -> Result<Self, ConversionError> {
        args.map(T::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Variadic)
    }
}

/// Parameter and return types of a native function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ValueType>,
    variadic: Option<ValueType>,
    returns: Vec<ValueType>,
}

impl Signature {
    pub fn new(params: Vec<ValueType>, variadic: Option<ValueType>, returns: Vec<ValueType>) -> Self {
        Self {
            params,
            variadic,
            returns,
        }
    }

    /// Fixed parameter types, in order
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Element type of the trailing variadic parameter
    pub fn variadic(&self) -> Option<&ValueType> {
        self.variadic.as_ref()
    }

    pub fn returns(&self) -> &[ValueType] {
        &self.returns
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Declared parameter count; the variadic parameter counts as one
    pub fn declared(&self) -> usize {
        self.params.len() + usize::from(self.is_variadic())
    }

    /// How many of `given` arguments a call takes
    ///
    /// A variadic function takes all of them once the fixed parameters are
    /// covered. Otherwise exactly the declared count is taken and surplus
    /// arguments are ignored. A result larger than `given` means the call
    /// is short of arguments.
    pub fn accepted_arguments(&self, given: usize) -> usize {
        let declared = self.declared();
        if self.is_variadic() && given + 1 >= declared {
            given
        } else {
            declared
        }
    }

    /// Type required of the argument at 0-based `index`
    pub fn parameter_type(&self, index: usize) -> Option<&ValueType> {
        match self.params.get(index) {
            Some(ty) => Some(ty),
            None => self.variadic.as_ref(),
        }
    }

    /// Reconcile raw arguments with this signature
    ///
    /// Checks the count, drops surplus arguments, substitutes zero values
    /// for nil arguments and coerces the rest to their parameter types.
    pub fn prepare(&self, args: Vec<Value>) -> Result<Vec<Value>, CallError> {
        let given = args.len();
        let accepted = self.accepted_arguments(given);
        if accepted > given {
            return Err(CallError::ArgumentCount {
                given,
                needed: accepted,
            });
        }

        args.into_iter()
            .take(accepted)
            .enumerate()
            .map(|(index, value)| match self.parameter_type(index) {
                Some(wanted) => coerce_argument(index + 1, wanted, value),
                None => Ok(value),
            })
            .collect()
    }
}

fn coerce_argument(index: usize, wanted: &ValueType, value: Value) -> Result<Value, CallError> {
    if value.is_nil() {
        return wanted.zero_value().ok_or_else(|| CallError::ArgumentType {
            index,
            given: "nil".to_string(),
            wanted: wanted.to_string(),
        });
    }

    let given = value.type_name();
    wanted.coerce(value).map_err(|_| CallError::ArgumentType {
        index,
        given: given.to_string(),
        wanted: wanted.to_string(),
    })
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        if let Some(variadic) = &self.variadic {
            params.push(format!("...{}", variadic));
        }
        let returns: Vec<String> = self.returns.iter().map(ToString::to_string).collect();
        write!(f, "({}) -> ({})", params.join(", "), returns.join(", "))
    }
}

type Invoke = dyn Fn(Vec<Value>) -> Result<Vec<Value>, CallError>;

struct FunctionInner {
    signature: Signature,
    invoke: Box<Invoke>,
}

/// A Rust function exposed to scripts
///
/// Cloning is cheap and clones share the same underlying function.
#[derive(Clone)]
pub struct NativeFunction {
    name: Option<Rc<str>>,
    inner: Rc<FunctionInner>,
}

impl NativeFunction {
    /// Wrap a Rust closure, capturing its signature from its type
    pub fn wrap<F, Args, R>(function: F) -> Self
    where
        F: IntoNativeFunction<Args, R>,
    {
        function.into_native()
    }

    fn from_parts<F>(signature: Signature, invoke: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, CallError> + 'static,
    {
        Self {
            name: None,
            inner: Rc::new(FunctionInner {
                signature,
                invoke: Box::new(invoke),
            }),
        }
    }

    /// Attach a name used in diagnostics
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(Rc::from(name.as_ref()));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Call the function with raw arguments
    ///
    /// Arguments are reconciled with the signature first. A panic inside the
    /// function is contained and reported as [`CallError::Panic`].
    pub fn call(&self, args: Vec<Value>) -> Result<Vec<Value>, CallError> {
        let args = self.inner.signature.prepare(args)?;
        let invoke = &self.inner.invoke;

        match panic::catch_unwind(AssertUnwindSafe(|| invoke(args))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(
                    function = self.name().unwrap_or("<anonymous>"),
                    %message,
                    "native function panicked"
                );
                Err(CallError::Panic { message })
            }
        }
    }

    /// Whether both handles refer to the same function
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NativeFunction({}{})",
            self.name().unwrap_or(""),
            self.signature()
        )
    }
}

/// Conversion of a Rust callable into a [`NativeFunction`]
///
/// Implemented for closures of up to eight parameters whose parameters are
/// [`FromValue`] (the last may also be [`Variadic`]) and whose return type is
/// [`IntoValues`].
pub trait IntoNativeFunction<Args, R> {
    fn into_native(self) -> NativeFunction;
}

impl<Func, R> IntoNativeFunction<(), R> for Func
where
    Func: Fn() -> R + 'static,
    R: IntoValues,
{
    fn into_native(self) -> NativeFunction {
        let signature = Signature::new(Vec::new(), None, R::value_types());
        NativeFunction::from_parts(signature, move |_args: Vec<Value>| Ok(self().into_values()))
    }
}

fn next_argument<T: FromValue>(args: &mut vec::IntoIter<Value>, total: usize) -> Result<T, CallError> {
    let index = total - args.len() + 1;
    T::from_value(args.next().unwrap_or_default()).map_err(|e| e.into_argument_error(index))
}

fn last_argument<T: Param>(args: &mut vec::IntoIter<Value>, total: usize) -> Result<T, CallError> {
    let index = total - args.len() + 1;
    T::from_arguments(args).map_err(|e| e.into_argument_error(index))
}

macro_rules! impl_into_native {
    ($($fixed:ident $farg:ident),* ; $last:ident $larg:ident) => {
        impl<Func, $($fixed,)* $last, R> IntoNativeFunction<($($fixed,)* $last,), R> for Func
        where
            Func: Fn($($fixed,)* $last) -> R + 'static,
            $($fixed: FromValue,)*
            $last: Param,
            R: IntoValues,
        {
            fn into_native(self) -> NativeFunction {
                #[allow(unused_mut)]
                let mut params: Vec<ValueType> = vec![$($fixed::value_type()),*];
                let variadic = match $last::kind() {
                    ParamKind::Fixed(ty) => {
                        params.push(ty);
                        None
                    }
                    ParamKind::Variadic(ty) => Some(ty),
                };
                let signature = Signature::new(params, variadic, R::value_types());

                NativeFunction::from_parts(signature, move |args: Vec<Value>| {
                    let total = args.len();
                    let mut args = args.into_iter();
                    $(let $farg: $fixed = next_argument(&mut args, total)?;)*
                    let $larg: $last = last_argument(&mut args, total)?;
                    Ok(self($($farg,)* $larg).into_values())
                })
            }
        }
    };
}

impl_into_native!(; A a);
impl_into_native!(A a ; B b);
impl_into_native!(A a, B b ; C c);
impl_into_native!(A a, B b, C c ; D d);
impl_into_native!(A a, B b, C c, D d ; E e);
impl_into_native!(A a, B b, C c, D d, E e ; F f);
impl_into_native!(A a, B b, C c, D d, E e, F f ; G g);
impl_into_native!(A a, B b, C c, D d, E e, F f, G g ; H h);

type BuilderImpl = Box<dyn Fn(Vec<Value>) -> Vec<Value>>;

/// Error building a native function
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("native function '{name}' has no implementation")]
    MissingImplementation { name: String },
}

/// Builder for native functions with an explicit signature
///
/// Useful when the argument list is only known at runtime. The
/// implementation receives the arguments already reconciled with the
/// signature: counted, zero-filled and coerced.
///
/// ```
/// use tabula_bridge::{NativeFunctionBuilder, Value, ValueType};
///
/// let concat = NativeFunctionBuilder::new("concat")
///     .variadic(ValueType::String)
///     .returns(ValueType::String)
///     .with_implementation(|args| {
///         let joined: String = args.iter().filter_map(Value::as_str).collect();
///         vec![Value::String(joined)]
///     })
///     .build()
///     .unwrap();
///
/// let result = concat.call(vec![Value::from("a"), Value::from("b")]).unwrap();
/// assert_eq!(result, vec![Value::from("ab")]);
/// ```
pub struct NativeFunctionBuilder {
    name: String,
    params: Vec<ValueType>,
    variadic: Option<ValueType>,
    returns: Vec<ValueType>,
    implementation: Option<BuilderImpl>,
}

impl NativeFunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            variadic: None,
            returns: Vec::new(),
            implementation: None,
        }
    }

    /// Append a fixed parameter
    pub fn param(mut self, ty: ValueType) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, types: impl IntoIterator<Item = ValueType>) -> Self {
        self.params.extend(types);
        self
    }

    /// Collect remaining arguments, each of type `ty`
    pub fn variadic(mut self, ty: ValueType) -> Self {
        self.variadic = Some(ty);
        self
    }

    /// Append a return type
    pub fn returns(mut self, ty: ValueType) -> Self {
        self.returns.push(ty);
        self
    }

    pub fn with_implementation<F>(mut self, implementation: F) -> Self
    where
        F: Fn(Vec<Value>) -> Vec<Value> + 'static,
    {
        self.implementation = Some(Box::new(implementation));
        self
    }

    /// Build the native function
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingImplementation` if no implementation was provided.
    pub fn build(self) -> Result<NativeFunction, BuildError> {
        let implementation = self.implementation.ok_or_else(|| BuildError::MissingImplementation {
            name: self.name.clone(),
        })?;
        let signature = Signature::new(self.params, self.variadic, self.returns);

        Ok(NativeFunction::from_parts(signature, move |args| Ok(implementation(args)))
            .with_name(&self.name))
    }
}

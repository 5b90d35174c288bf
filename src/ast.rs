//! This module defines the expression tree produced by the reader and the runtime
//! values produced by the evaluator. [`Expr`] is a tagged union of atoms and lists;
//! atoms are classified once, at read time, into [`Atom::Symbol`] or
//! [`Atom::Number`]. [`Value`] adds the runtime-only kinds: booleans, procedures and
//! the unspecified result of `define`. Ergonomic helpers such as [`val`], [`sym`] and
//! [`nil`] keep value construction short in tests, and `From` conversions cover the
//! common Rust literals.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::builtinops::OperationFn;

/// A numeric atom. Integers stay integers until an operation forces a float.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(x) => x == 0.0,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) if x.is_nan() => write!(f, "nan"),
            Number::Float(x) if x.is_infinite() => {
                write!(f, "{}", if *x > 0.0 { "inf" } else { "-inf" })
            }
            // Debug keeps the trailing ".0" on integral floats
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::Float(x)
    }
}

/// An indivisible expression: a symbol or a number
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Symbol(String),
    Number(Number),
}

/// Expression tree produced by the reader
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Atom(Atom),
    List(Vec<Expr>),
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Atom(Atom::Symbol(name.into()))
    }

    pub fn int(n: i64) -> Self {
        Expr::Atom(Atom::Number(Number::Int(n)))
    }

    pub fn float(x: f64) -> Self {
        Expr::Atom(Atom::Number(Number::Float(x)))
    }

    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::List(items.into_iter().collect())
    }

    /// The symbol name, if this expression is a symbol atom
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Atom(Atom::Symbol(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(s) => write!(f, "{s}"),
            Atom::Number(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(atom) => write!(f, "{atom}"),
            Expr::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Runtime value produced by evaluation
#[derive(Clone)]
pub enum Value {
    Number(Number),
    Bool(bool),
    /// Symbols as data. Evaluation never produces these (there is no `quote`), but
    /// hosts can bind them or convert an expression tree with `Value::from`.
    Symbol(String),
    List(Vec<Value>),
    /// Native procedure supplied by the builtin table or the host
    Procedure {
        name: String,
        func: Arc<OperationFn>,
    },
    /// Result of forms with no meaningful value (`define`, `print`)
    Unspecified,
}

impl Value {
    /// Truthiness used by `if` and `not`: false, zero, the empty list and
    /// unspecified are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::List(items) => !items.is_empty(),
            Value::Unspecified => false,
            Value::Symbol(_) | Value::Procedure { .. } => true,
        }
    }

    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Procedure { .. })
    }

    /// Short type name used in error messages
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Number(Number::Int(_)) => "integer",
            Value::Number(Number::Float(_)) => "float",
            Value::Bool(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Procedure { .. } => "procedure",
            Value::Unspecified => "unspecified",
        }
    }

    /// Identity comparison backing `eq?`. Atoms compare by value within the same
    /// kind, procedures by pointer, and lists only when both are empty.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(Number::Int(a)), Value::Number(Number::Int(b))) => a == b,
            (Value::Number(Number::Float(a)), Value::Number(Number::Float(b))) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.is_empty() && b.is_empty(),
            (Value::Procedure { func: f1, .. }, Value::Procedure { func: f2, .. }) => {
                std::ptr::addr_eq(Arc::as_ptr(f1), Arc::as_ptr(f2))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(Number::Int(n)) => write!(f, "Int({n})"),
            Value::Number(Number::Float(x)) => write!(f, "Float({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Procedure { name, .. } => write!(f, "Procedure({name})"),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Procedure { name, .. } => write!(f, "#<procedure:{name}>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Procedure { .. }, Value::Procedure { .. }) => self.is_identical(other),
            // Unspecified never equals anything, itself included
            _ => false,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(Number::Int(i64::from(n)))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Converts an expression tree to data: symbols stay symbols, lists become lists.
impl From<&Expr> for Value {
    fn from(expr: &Expr) -> Self {
        match expr {
            Expr::Atom(Atom::Symbol(s)) => Value::Symbol(s.clone()),
            Expr::Atom(Atom::Number(n)) => Value::Number(*n),
            Expr::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

/// Helper for creating symbol values
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating Values from anything convertible
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper for creating the empty list
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}

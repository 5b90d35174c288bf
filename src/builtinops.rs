//! Builtin procedure registry.
//!
//! Every entry is a plain Rust function over already-evaluated arguments plus the
//! [`Arity`] it accepts. [`crate::evaluator::standard_env`] turns each entry into a
//! [`Value::Procedure`] whose wrapper checks the arity before the body runs, so
//! the bodies below can assume the argument count they were registered with.
//!
//! ```scheme
//! (+ 1 2 3)            ; => 6
//! (/ 1 2)              ; => 0.5, division is always true division
//! (map abs (list -1 2)); => (1 2)
//! (apply max (list 3 9 4))
//! ```
//!
//! ## Numbers
//!
//! Integer arithmetic stays integral and reports overflow as an error instead of
//! wrapping. Any float operand promotes the operation to float.
//!
//! ## Adding New Operations
//!
//! 1. Implement `fn(args: &[Value]) -> Result<Value, Error>`
//! 2. Add a [`BuiltinOp`] to `BUILTIN_OPS` (or `math::MATH_OPS`) with its arity
//! 3. Add cases to the table-driven tests below

pub(crate) mod math;

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::ast::{Number, Value};
use crate::evaluator::apply_procedure;

/// Canonical erased procedure type stored in [`Value::Procedure`].
///
/// Procedures receive ownership of their argument vector.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error> + Send + Sync;

/// Signature of a registry entry
pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// Number of arguments a builtin accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
            Arity::Any => true,
        }
    }

    pub fn validate(self, name: &str, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(Error::arity(name, self, count))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Definition of a builtin procedure
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub func: BuiltinFn,
    pub arity: Arity,
}

impl BuiltinOp {
    /// Wrap this entry as a procedure value with arity checking in front.
    pub fn to_procedure(&'static self) -> Value {
        let op = self;
        Value::Procedure {
            name: op.name.to_owned(),
            func: Arc::new(move |args: Vec<Value>| {
                op.arity.validate(op.name, args.len())?;
                (op.func)(&args)
            }),
        }
    }
}

//
// Argument helpers
//

pub(crate) fn type_error(name: &str, expected: &str, got: &Value) -> Error {
    Error::TypeError(format!(
        "{name}: expected {expected}, got {} {got}",
        got.type_name()
    ))
}

pub(crate) fn number_arg(name: &str, value: &Value) -> Result<Number, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(name, "number", other)),
    }
}

pub(crate) fn number_args(name: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter().map(|arg| number_arg(name, arg)).collect()
}

pub(crate) fn list_arg<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], Error> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(type_error(name, "list", other)),
    }
}

pub(crate) fn one<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, Error> {
    match args {
        [x] => Ok(x),
        _ => Err(Error::arity(name, 1, args.len())),
    }
}

pub(crate) fn two<'a>(name: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), Error> {
    match args {
        [x, y] => Ok((x, y)),
        _ => Err(Error::arity(name, 2, args.len())),
    }
}

fn overflow(operation: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {operation}"))
}

//
// Numeric primitives
//

pub(crate) fn add(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .ok_or_else(|| overflow("addition")),
        (x, y) => Ok(Number::Float(x.as_f64() + y.as_f64())),
    }
}

pub(crate) fn sub(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .ok_or_else(|| overflow("subtraction")),
        (x, y) => Ok(Number::Float(x.as_f64() - y.as_f64())),
    }
}

pub(crate) fn mul(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .ok_or_else(|| overflow("multiplication")),
        (x, y) => Ok(Number::Float(x.as_f64() * y.as_f64())),
    }
}

pub(crate) fn div(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::EvalError("division by zero".into()));
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

fn negate(n: Number) -> Result<Number, Error> {
    match n {
        Number::Int(x) => x
            .checked_neg()
            .map(Number::Int)
            .ok_or_else(|| overflow("negation")),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

/// Convert a float to an integer, failing on NaN, infinity and out-of-range values.
pub(crate) fn float_to_int(name: &str, x: f64) -> Result<i64, Error> {
    // i64::MAX is not representable; 2^63 is the first value past it
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !x.is_finite() {
        return Err(Error::EvalError(format!(
            "{name}: cannot convert float {} to integer",
            Number::Float(x)
        )));
    }
    if !(-LIMIT..LIMIT).contains(&x) {
        return Err(overflow(name));
    }
    Ok(x as i64)
}

//
// Builtin Function Implementations
//

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    let mut sum = Number::Int(0);
    for n in number_args("+", args)? {
        sum = add(sum, n)?;
    }
    Ok(Value::Number(sum))
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    match number_args("-", args)?.as_slice() {
        [] => Err(Error::arity("-", Arity::AtLeast(1), 0)),
        [only] => negate(*only).map(Value::Number),
        [first, rest @ ..] => {
            let mut result = *first;
            for n in rest {
                result = sub(result, *n)?;
            }
            Ok(Value::Number(result))
        }
    }
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    let mut product = Number::Int(1);
    for n in number_args("*", args)? {
        product = mul(product, n)?;
    }
    Ok(Value::Number(product))
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    match number_args("/", args)?.as_slice() {
        [] => Err(Error::arity("/", Arity::AtLeast(1), 0)),
        [only] => div(Number::Int(1), *only).map(Value::Number),
        [first, rest @ ..] => {
            let mut result = *first;
            for n in rest {
                result = div(result, *n)?;
            }
            Ok(Value::Number(result))
        }
    }
}

// Chained comparisons: every adjacent pair must satisfy the operator
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let nums = number_args($op_str, args)?;
            Ok(Value::Bool(nums.windows(2).all(|pair| pair[0] $op pair[1])))
        }
    };
}

numeric_comparison!(builtin_eq, ==, "=");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ge, >=, ">=");

fn builtin_abs(args: &[Value]) -> Result<Value, Error> {
    match number_arg("abs", one("abs", args)?)? {
        Number::Int(x) => x
            .checked_abs()
            .map(|n| Value::Number(Number::Int(n)))
            .ok_or_else(|| overflow("abs")),
        Number::Float(x) => Ok(Value::Number(Number::Float(x.abs()))),
    }
}

fn builtin_append(args: &[Value]) -> Result<Value, Error> {
    let mut result = Vec::new();
    for arg in args {
        result.extend_from_slice(list_arg("append", arg)?);
    }
    Ok(Value::List(result))
}

fn builtin_apply(args: &[Value]) -> Result<Value, Error> {
    let (procedure, arguments) = two("apply", args)?;
    let arguments = list_arg("apply", arguments)?;
    apply_procedure(procedure, arguments.to_vec())
}

fn builtin_begin(args: &[Value]) -> Result<Value, Error> {
    args.last()
        .cloned()
        .ok_or_else(|| Error::arity("begin", Arity::AtLeast(1), 0))
}

fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    match list_arg("car", one("car", args)?)? {
        [first, ..] => Ok(first.clone()),
        [] => Err(Error::EvalError("car of empty list".into())),
    }
}

/// The tail of the empty list is the empty list.
fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    let items = list_arg("cdr", one("cdr", args)?)?;
    Ok(Value::List(items.get(1..).unwrap_or_default().to_vec()))
}

fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    let (first, rest) = two("cons", args)?;
    let tail = list_arg("cons", rest)?;
    let mut new_list = Vec::with_capacity(tail.len() + 1);
    new_list.push(first.clone());
    new_list.extend_from_slice(tail);
    Ok(Value::List(new_list))
}

fn builtin_eq_p(args: &[Value]) -> Result<Value, Error> {
    let (a, b) = two("eq?", args)?;
    Ok(Value::Bool(a.is_identical(b)))
}

fn builtin_equal_p(args: &[Value]) -> Result<Value, Error> {
    let (a, b) = two("equal?", args)?;
    Ok(Value::Bool(a == b))
}

fn builtin_expt(args: &[Value]) -> Result<Value, Error> {
    let (base, exponent) = two("expt", args)?;
    let base = number_arg("expt", base)?;
    let exponent = number_arg("expt", exponent)?;

    if base.is_zero() && exponent < Number::Int(0) {
        return Err(Error::EvalError(
            "0 cannot be raised to a negative power".into(),
        ));
    }

    match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => u32::try_from(e)
            .ok()
            .and_then(|e| b.checked_pow(e))
            .map(|n| Value::Number(Number::Int(n)))
            .ok_or_else(|| overflow("exponentiation")),
        (b, e) => math::checked_float(
            "expt",
            &[b.as_f64(), e.as_f64()],
            b.as_f64().powf(e.as_f64()),
        ),
    }
}

fn builtin_length(args: &[Value]) -> Result<Value, Error> {
    let items = list_arg("length", one("length", args)?)?;
    i64::try_from(items.len())
        .map(|n| Value::Number(Number::Int(n)))
        .map_err(|_| overflow("length"))
}

fn builtin_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::List(args.to_vec()))
}

fn builtin_list_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one("list?", args)?, Value::List(_))))
}

/// `(map proc list ...)`: with several lists the shortest one bounds the result.
fn builtin_map(args: &[Value]) -> Result<Value, Error> {
    let [procedure, lists @ ..] = args else {
        return Err(Error::arity("map", Arity::AtLeast(2), 0));
    };
    if lists.is_empty() {
        return Err(Error::arity("map", Arity::AtLeast(2), args.len()));
    }
    let lists = lists
        .iter()
        .map(|list| list_arg("map", list))
        .collect::<Result<Vec<_>, _>>()?;
    let len = lists.iter().map(|list| list.len()).min().unwrap_or(0);

    (0..len)
        .map(|i| apply_procedure(procedure, lists.iter().map(|list| list[i].clone()).collect()))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

/// Shared body of `max` and `min`: a single list argument is searched element-wise,
/// otherwise the arguments themselves are. The first extreme value wins ties.
fn extreme(
    name: &str,
    args: &[Value],
    replaces: fn(Number, Number) -> bool,
) -> Result<Value, Error> {
    let candidates = match args {
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let nums = number_args(name, candidates)?;
    let Some((&first, rest)) = nums.split_first() else {
        return Err(Error::EvalError(format!("{name}: empty sequence")));
    };
    let best = rest
        .iter()
        .fold(first, |best, &n| if replaces(n, best) { n } else { best });
    Ok(Value::Number(best))
}

fn builtin_max(args: &[Value]) -> Result<Value, Error> {
    extreme("max", args, |n, best| n > best)
}

fn builtin_min(args: &[Value]) -> Result<Value, Error> {
    extreme("min", args, |n, best| n < best)
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(!one("not", args)?.is_truthy()))
}

fn builtin_null_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(one("null?", args)?.is_nil()))
}

fn builtin_number_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one("number?", args)?, Value::Number(_))))
}

fn builtin_print(args: &[Value]) -> Result<Value, Error> {
    let parts: Vec<String> = args.iter().map(ToString::to_string).collect();
    println!("{}", parts.join(" "));
    Ok(Value::Unspecified)
}

fn builtin_procedure_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(one("procedure?", args)?.is_procedure()))
}

/// Round half to even. One argument rounds to an integer; a second argument gives
/// the number of decimal digits to keep.
fn builtin_round(args: &[Value]) -> Result<Value, Error> {
    match args {
        [x] => match number_arg("round", x)? {
            Number::Int(n) => Ok(Value::Number(Number::Int(n))),
            Number::Float(f) => {
                float_to_int("round", f.round_ties_even()).map(|n| Value::Number(Number::Int(n)))
            }
        },
        [x, digits] => {
            let x = number_arg("round", x)?;
            let Number::Int(digits) = number_arg("round", digits)? else {
                return Err(type_error("round", "integer digit count", digits));
            };
            // Past this every finite f64 is either left alone or rounded to zero
            let digits = digits.clamp(-400, 400) as i32;
            let scale = 10f64.powi(digits.abs());
            match x {
                Number::Int(n) if digits >= 0 => Ok(Value::Number(Number::Int(n))),
                Number::Int(_) if scale.is_infinite() => Ok(Value::Number(Number::Int(0))),
                Number::Int(n) => {
                    let rounded = (n as f64 / scale).round_ties_even() * scale;
                    float_to_int("round", rounded).map(|n| Value::Number(Number::Int(n)))
                }
                Number::Float(f) if digits >= 0 => {
                    let scaled = f * scale;
                    let rounded = if scaled.is_finite() {
                        scaled.round_ties_even() / scale
                    } else {
                        f
                    };
                    Ok(Value::Number(Number::Float(rounded)))
                }
                Number::Float(f) if !f.is_finite() => Ok(Value::Number(Number::Float(f))),
                Number::Float(f) if scale.is_infinite() => {
                    Ok(Value::Number(Number::Float(0f64.copysign(f))))
                }
                Number::Float(f) => Ok(Value::Number(Number::Float(
                    (f / scale).round_ties_even() * scale,
                ))),
            }
        }
        _ => Err(Error::arity("round", Arity::Range(1, 2), args.len())),
    }
}

fn builtin_symbol_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(one("symbol?", args)?, Value::Symbol(_))))
}

/// Global registry of the builtin procedures other than the math library.
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic
    BuiltinOp {
        name: "+",
        func: builtin_add,
        arity: Arity::Any,
    },
    BuiltinOp {
        name: "-",
        func: builtin_sub,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "*",
        func: builtin_mul,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "/",
        func: builtin_div,
        arity: Arity::AtLeast(1),
    },
    // Comparison
    BuiltinOp {
        name: ">",
        func: builtin_gt,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "<",
        func: builtin_lt,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: ">=",
        func: builtin_ge,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "<=",
        func: builtin_le,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "=",
        func: builtin_eq,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "abs",
        func: builtin_abs,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "expt",
        func: builtin_expt,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "max",
        func: builtin_max,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "min",
        func: builtin_min,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "round",
        func: builtin_round,
        arity: Arity::Range(1, 2),
    },
    // Lists
    BuiltinOp {
        name: "append",
        func: builtin_append,
        arity: Arity::Any,
    },
    BuiltinOp {
        name: "car",
        func: builtin_car,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "cdr",
        func: builtin_cdr,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "cons",
        func: builtin_cons,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "length",
        func: builtin_length,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "list",
        func: builtin_list,
        arity: Arity::Any,
    },
    BuiltinOp {
        name: "map",
        func: builtin_map,
        arity: Arity::AtLeast(2),
    },
    // Procedures and sequencing
    BuiltinOp {
        name: "apply",
        func: builtin_apply,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "begin",
        func: builtin_begin,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "print",
        func: builtin_print,
        arity: Arity::Any,
    },
    // Equality and logic
    BuiltinOp {
        name: "eq?",
        func: builtin_eq_p,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "equal?",
        func: builtin_equal_p,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "not",
        func: builtin_not,
        arity: Arity::Exact(1),
    },
    // Type predicates
    BuiltinOp {
        name: "list?",
        func: builtin_list_p,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "null?",
        func: builtin_null_p,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "number?",
        func: builtin_number_p,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "procedure?",
        func: builtin_procedure_p,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "symbol?",
        func: builtin_symbol_p,
        arity: Arity::Exact(1),
    },
];

/// All builtin procedures, math library included
pub fn get_builtin_ops() -> impl Iterator<Item = &'static BuiltinOp> {
    BUILTIN_OPS.iter().chain(math::MATH_OPS.iter())
}

#[cfg(test)]
pub(crate) fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    get_builtin_ops().find(|op| op.name == name)
}

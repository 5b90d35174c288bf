//! Math library: constants and the transcendental, rounding and integer helpers.
//!
//! Float functions never hand back a silent NaN or infinity for ordinary input:
//! a NaN produced from non-NaN arguments is a `math domain error` and an infinity
//! produced from finite arguments is a `math range error`. NaN input propagates.

use std::f64::consts::{E, PI, TAU};

use super::{Arity, BuiltinOp, float_to_int, list_arg, mul, number_arg, one, two, type_error};
use crate::Error;
use crate::ast::{Number, Value};

/// Named constants installed alongside the math procedures.
pub(crate) static CONSTANTS: &[(&str, f64)] = &[
    ("pi", PI),
    ("e", E),
    ("tau", TAU),
    ("inf", f64::INFINITY),
    ("nan", f64::NAN),
];

fn domain_error(name: &str) -> Error {
    Error::EvalError(format!("{name}: math domain error"))
}

fn float_arg(name: &str, value: &Value) -> Result<f64, Error> {
    number_arg(name, value).map(Number::as_f64)
}

fn int_arg(name: &str, value: &Value) -> Result<i64, Error> {
    match number_arg(name, value)? {
        Number::Int(n) => Ok(n),
        Number::Float(_) => Err(type_error(name, "integer", value)),
    }
}

fn float_list(name: &str, value: &Value) -> Result<Vec<f64>, Error> {
    list_arg(name, value)?
        .iter()
        .map(|item| float_arg(name, item))
        .collect()
}

fn int_overflow(name: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {name}"))
}

fn int_value(n: i64) -> Value {
    Value::Number(Number::Int(n))
}

/// Wrap a float result, rejecting NaN or infinity that the inputs did not carry.
pub(crate) fn checked_float(name: &str, inputs: &[f64], result: f64) -> Result<Value, Error> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        return Err(domain_error(name));
    }
    if result.is_infinite() && inputs.iter().all(|x| x.is_finite()) {
        return Err(Error::EvalError(format!("{name}: math range error")));
    }
    Ok(Value::Number(Number::Float(result)))
}

macro_rules! unary_float {
    ($fn_name:ident, $name:literal, $f:expr) => {
        unary_float!($fn_name, $name, $f, |_| true);
    };
    ($fn_name:ident, $name:literal, $f:expr, $domain:expr) => {
        fn $fn_name(args: &[Value]) -> Result<Value, Error> {
            let x = float_arg($name, one($name, args)?)?;
            let in_domain: fn(f64) -> bool = $domain;
            if !x.is_nan() && !in_domain(x) {
                return Err(domain_error($name));
            }
            let f: fn(f64) -> f64 = $f;
            checked_float($name, &[x], f(x))
        }
    };
}

unary_float!(math_sqrt, "sqrt", f64::sqrt);
unary_float!(math_exp, "exp", f64::exp);
unary_float!(math_expm1, "expm1", f64::exp_m1);
unary_float!(math_log2, "log2", f64::log2, |x| x > 0.0);
unary_float!(math_log10, "log10", f64::log10, |x| x > 0.0);
unary_float!(math_log1p, "log1p", f64::ln_1p, |x| x > -1.0);
unary_float!(math_sin, "sin", f64::sin);
unary_float!(math_cos, "cos", f64::cos);
unary_float!(math_tan, "tan", f64::tan);
unary_float!(math_asin, "asin", f64::asin);
unary_float!(math_acos, "acos", f64::acos);
unary_float!(math_atan, "atan", f64::atan);
unary_float!(math_sinh, "sinh", f64::sinh);
unary_float!(math_cosh, "cosh", f64::cosh);
unary_float!(math_tanh, "tanh", f64::tanh);
unary_float!(math_asinh, "asinh", f64::asinh);
unary_float!(math_acosh, "acosh", f64::acosh);
unary_float!(math_atanh, "atanh", f64::atanh, |x| x.abs() < 1.0);
unary_float!(math_fabs, "fabs", f64::abs);
unary_float!(math_degrees, "degrees", f64::to_degrees);
unary_float!(math_radians, "radians", f64::to_radians);
unary_float!(math_cbrt, "cbrt", f64::cbrt);
unary_float!(math_exp2, "exp2", f64::exp2);
unary_float!(math_erf, "erf", libm::erf);
unary_float!(math_erfc, "erfc", libm::erfc);
// Poles at zero and the negative integers
unary_float!(math_gamma, "gamma", libm::tgamma, |x| x > 0.0 || x.fract() != 0.0);
unary_float!(math_lgamma, "lgamma", libm::lgamma, |x| x > 0.0 || x.fract() != 0.0);

macro_rules! binary_float {
    ($fn_name:ident, $name:literal, $f:expr) => {
        fn $fn_name(args: &[Value]) -> Result<Value, Error> {
            let (x, y) = two($name, args)?;
            let (x, y) = (float_arg($name, x)?, float_arg($name, y)?);
            let f: fn(f64, f64) -> f64 = $f;
            checked_float($name, &[x, y], f(x, y))
        }
    };
}

binary_float!(math_atan2, "atan2", f64::atan2);
binary_float!(math_copysign, "copysign", f64::copysign);
binary_float!(math_fmod, "fmod", |x, y| x % y);
binary_float!(math_remainder, "remainder", libm::remainder);

fn math_pow(args: &[Value]) -> Result<Value, Error> {
    let (x, y) = two("pow", args)?;
    let (x, y) = (float_arg("pow", x)?, float_arg("pow", y)?);
    if x == 0.0 && y < 0.0 {
        return Err(domain_error("pow"));
    }
    checked_float("pow", &[x, y], x.powf(y))
}

fn math_hypot(args: &[Value]) -> Result<Value, Error> {
    let coords = args
        .iter()
        .map(|arg| float_arg("hypot", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let result = coords.iter().fold(0.0, |acc: f64, &x| acc.hypot(x));
    checked_float("hypot", &coords, result)
}

/// `(log x)` is the natural logarithm, `(log x base)` divides by `ln base`.
fn math_log(args: &[Value]) -> Result<Value, Error> {
    let ln = |value: &Value| -> Result<f64, Error> {
        let x = float_arg("log", value)?;
        if !x.is_nan() && x <= 0.0 {
            return Err(domain_error("log"));
        }
        Ok(x.ln())
    };
    match args {
        [x] => {
            let result = ln(x)?;
            checked_float("log", &[result], result)
        }
        [x, base] => {
            let (numerator, denominator) = (ln(x)?, ln(base)?);
            if denominator == 0.0 {
                return Err(Error::EvalError("division by zero".into()));
            }
            checked_float("log", &[numerator, denominator], numerator / denominator)
        }
        _ => Err(Error::arity("log", Arity::Range(1, 2), args.len())),
    }
}

macro_rules! float_to_integer {
    ($fn_name:ident, $name:literal, $f:expr) => {
        fn $fn_name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64) -> f64 = $f;
            match number_arg($name, one($name, args)?)? {
                Number::Int(n) => Ok(Value::Number(Number::Int(n))),
                Number::Float(x) => float_to_int($name, f(x)).map(int_value),
            }
        }
    };
}

float_to_integer!(math_floor, "floor", f64::floor);
float_to_integer!(math_ceil, "ceil", f64::ceil);
float_to_integer!(math_trunc, "trunc", f64::trunc);

fn math_factorial(args: &[Value]) -> Result<Value, Error> {
    let n = int_arg("factorial", one("factorial", args)?)?;
    if n < 0 {
        return Err(Error::EvalError(
            "factorial() not defined for negative values".into(),
        ));
    }
    (1..=n)
        .try_fold(1i64, i64::checked_mul)
        .map(int_value)
        .ok_or_else(|| int_overflow("factorial"))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn math_gcd(args: &[Value]) -> Result<Value, Error> {
    let mut result = 0u64;
    for arg in args {
        result = gcd(result, int_arg("gcd", arg)?.unsigned_abs());
    }
    i64::try_from(result)
        .map(int_value)
        .map_err(|_| int_overflow("gcd"))
}

fn math_lcm(args: &[Value]) -> Result<Value, Error> {
    let mut result = 1u64;
    for arg in args {
        let n = int_arg("lcm", arg)?.unsigned_abs();
        result = if result == 0 || n == 0 {
            0
        } else {
            (result / gcd(result, n))
                .checked_mul(n)
                .ok_or_else(|| int_overflow("lcm"))?
        };
    }
    i64::try_from(result)
        .map(int_value)
        .map_err(|_| int_overflow("lcm"))
}

fn math_isqrt(args: &[Value]) -> Result<Value, Error> {
    let n = int_arg("isqrt", one("isqrt", args)?)?;
    if n < 0 {
        return Err(Error::EvalError(
            "isqrt() argument must be nonnegative".into(),
        ));
    }
    // The float estimate is within one of the answer; settle it exactly
    let target = i128::from(n);
    let mut root = i128::from((n as f64).sqrt() as i64);
    while root * root > target {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= target {
        root += 1;
    }
    i64::try_from(root)
        .map(int_value)
        .map_err(|_| int_overflow("isqrt"))
}

fn non_negative(name: &str, what: &str, value: &Value) -> Result<i64, Error> {
    let n = int_arg(name, value)?;
    if n < 0 {
        return Err(Error::EvalError(format!(
            "{name}: {what} must be a non-negative integer"
        )));
    }
    Ok(n)
}

/// `(comb n k)`: ways to choose `k` of `n` items, zero when `k > n`.
fn math_comb(args: &[Value]) -> Result<Value, Error> {
    let (n, k) = two("comb", args)?;
    let n = non_negative("comb", "n", n)?;
    let k = non_negative("comb", "k", k)?;
    if k > n {
        return Ok(int_value(0));
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc is C(n, i) here, so the division is exact
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > i64::MAX as u128 {
            return Err(int_overflow("comb"));
        }
    }
    i64::try_from(acc)
        .map(int_value)
        .map_err(|_| int_overflow("comb"))
}

/// `(perm n)` or `(perm n k)`: ordered arrangements, zero when `k > n`.
fn math_perm(args: &[Value]) -> Result<Value, Error> {
    let (n, k) = match args {
        [n] => {
            let n = non_negative("perm", "n", n)?;
            (n, n)
        }
        [n, k] => (non_negative("perm", "n", n)?, non_negative("perm", "k", k)?),
        _ => return Err(Error::arity("perm", Arity::Range(1, 2), args.len())),
    };
    if k > n {
        return Ok(int_value(0));
    }
    ((n - k + 1)..=n)
        .try_fold(1i64, i64::checked_mul)
        .map(int_value)
        .ok_or_else(|| int_overflow("perm"))
}

/// `(ldexp x i)` is `x * 2^i`.
fn math_ldexp(args: &[Value]) -> Result<Value, Error> {
    let (x, exp) = two("ldexp", args)?;
    let x = float_arg("ldexp", x)?;
    let exp = int_arg("ldexp", exp)?.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    checked_float("ldexp", &[x], libm::ldexp(x, exp))
}

/// `(frexp x)` is the list `(mantissa exponent)` with `0.5 <= |mantissa| < 1`.
fn math_frexp(args: &[Value]) -> Result<Value, Error> {
    let x = float_arg("frexp", one("frexp", args)?)?;
    let (mantissa, exponent) = libm::frexp(x);
    Ok(Value::List(vec![
        Value::Number(Number::Float(mantissa)),
        int_value(i64::from(exponent)),
    ]))
}

/// `(modf x)` is the list `(fractional integral)`, both carrying the sign of `x`.
fn math_modf(args: &[Value]) -> Result<Value, Error> {
    let x = float_arg("modf", one("modf", args)?)?;
    let integral = x.trunc();
    let fractional = (if x.is_infinite() { 0.0 } else { x - integral }).copysign(x);
    Ok(Value::List(vec![
        Value::Number(Number::Float(fractional)),
        Value::Number(Number::Float(integral)),
    ]))
}

/// Shewchuk's exact summation over non-overlapping partials.
fn exact_sum(values: &[f64]) -> f64 {
    if values.iter().any(|x| !x.is_finite()) {
        return values.iter().sum();
    }
    let mut partials: Vec<f64> = Vec::new();
    for &value in values {
        let mut x = value;
        let mut kept = 0;
        for j in 0..partials.len() {
            let mut y = partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        partials.truncate(kept);
        partials.push(x);
    }
    partials.iter().rev().fold(0.0, |acc, p| acc + p)
}

fn math_fsum(args: &[Value]) -> Result<Value, Error> {
    let values = float_list("fsum", one("fsum", args)?)?;
    checked_float("fsum", &values, exact_sum(&values))
}

/// Product of a list of numbers; integers stay integral.
fn math_prod(args: &[Value]) -> Result<Value, Error> {
    let mut product = Number::Int(1);
    for item in list_arg("prod", one("prod", args)?)? {
        product = mul(product, number_arg("prod", item)?)?;
    }
    Ok(Value::Number(product))
}

/// Euclidean distance between two points given as equal-length lists.
fn math_dist(args: &[Value]) -> Result<Value, Error> {
    let (p, q) = two("dist", args)?;
    let (p, q) = (float_list("dist", p)?, float_list("dist", q)?);
    if p.len() != q.len() {
        return Err(Error::EvalError(
            "dist: both points must have the same number of dimensions".into(),
        ));
    }
    let diffs: Vec<f64> = p.iter().zip(&q).map(|(a, b)| a - b).collect();
    let result = diffs.iter().fold(0.0, |acc: f64, &d| acc.hypot(d));
    checked_float("dist", &diffs, result)
}

/// `(isclose a b [rel_tol [abs_tol]])` with defaults `1e-9` and `0.0`.
fn math_isclose(args: &[Value]) -> Result<Value, Error> {
    let (a, b, rel_tol, abs_tol) = match args {
        [a, b, rest @ ..] if rest.len() <= 2 => (
            float_arg("isclose", a)?,
            float_arg("isclose", b)?,
            rest.first().map_or(Ok(1e-9), |v| float_arg("isclose", v))?,
            rest.get(1).map_or(Ok(0.0), |v| float_arg("isclose", v))?,
        ),
        _ => return Err(Error::arity("isclose", Arity::Range(2, 4), args.len())),
    };
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(Error::EvalError(
            "isclose: tolerances must be non-negative".into(),
        ));
    }
    if a == b {
        return Ok(Value::Bool(true));
    }
    if a.is_infinite() || b.is_infinite() {
        return Ok(Value::Bool(false));
    }
    let diff = (b - a).abs();
    Ok(Value::Bool(
        diff <= (rel_tol * b).abs() || diff <= (rel_tol * a).abs() || diff <= abs_tol,
    ))
}

macro_rules! float_predicate {
    ($fn_name:ident, $name:literal, $f:expr) => {
        fn $fn_name(args: &[Value]) -> Result<Value, Error> {
            let f: fn(f64) -> bool = $f;
            Ok(Value::Bool(f(float_arg($name, one($name, args)?)?)))
        }
    };
}

float_predicate!(math_isnan, "isnan", f64::is_nan);
float_predicate!(math_isinf, "isinf", f64::is_infinite);
float_predicate!(math_isfinite, "isfinite", f64::is_finite);

const fn unary(name: &'static str, func: super::BuiltinFn) -> BuiltinOp {
    BuiltinOp {
        name,
        func,
        arity: Arity::Exact(1),
    }
}

const fn binary(name: &'static str, func: super::BuiltinFn) -> BuiltinOp {
    BuiltinOp {
        name,
        func,
        arity: Arity::Exact(2),
    }
}

pub(crate) static MATH_OPS: &[BuiltinOp] = &[
    unary("sqrt", math_sqrt),
    unary("exp", math_exp),
    unary("expm1", math_expm1),
    BuiltinOp {
        name: "log",
        func: math_log,
        arity: Arity::Range(1, 2),
    },
    unary("log2", math_log2),
    unary("log10", math_log10),
    unary("log1p", math_log1p),
    unary("sin", math_sin),
    unary("cos", math_cos),
    unary("tan", math_tan),
    unary("asin", math_asin),
    unary("acos", math_acos),
    unary("atan", math_atan),
    binary("atan2", math_atan2),
    unary("sinh", math_sinh),
    unary("cosh", math_cosh),
    unary("tanh", math_tanh),
    unary("asinh", math_asinh),
    unary("acosh", math_acosh),
    unary("atanh", math_atanh),
    unary("floor", math_floor),
    unary("ceil", math_ceil),
    unary("trunc", math_trunc),
    unary("fabs", math_fabs),
    binary("pow", math_pow),
    BuiltinOp {
        name: "hypot",
        func: math_hypot,
        arity: Arity::Any,
    },
    unary("degrees", math_degrees),
    unary("radians", math_radians),
    binary("copysign", math_copysign),
    binary("fmod", math_fmod),
    unary("factorial", math_factorial),
    BuiltinOp {
        name: "gcd",
        func: math_gcd,
        arity: Arity::Any,
    },
    unary("isnan", math_isnan),
    unary("isinf", math_isinf),
    unary("isfinite", math_isfinite),
    unary("cbrt", math_cbrt),
    unary("exp2", math_exp2),
    binary("remainder", math_remainder),
    binary("ldexp", math_ldexp),
    unary("frexp", math_frexp),
    unary("modf", math_modf),
    unary("erf", math_erf),
    unary("erfc", math_erfc),
    unary("gamma", math_gamma),
    unary("lgamma", math_lgamma),
    BuiltinOp {
        name: "lcm",
        func: math_lcm,
        arity: Arity::Any,
    },
    unary("isqrt", math_isqrt),
    binary("comb", math_comb),
    BuiltinOp {
        name: "perm",
        func: math_perm,
        arity: Arity::Range(1, 2),
    },
    unary("fsum", math_fsum),
    unary("prod", math_prod),
    binary("dist", math_dist),
    BuiltinOp {
        name: "isclose",
        func: math_isclose,
        arity: Arity::Range(2, 4),
    },
];

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::builtinops::find_builtin_op;
    use crate::evaluator::apply_procedure;

    fn call(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_builtin_op(name).unwrap();
        apply_procedure(&op.to_procedure(), args.to_vec())
    }

    fn float(name: &str, args: &[Value]) -> f64 {
        match call(name, args) {
            Ok(Value::Number(Number::Float(x))) => x,
            other => panic!("{name}: expected float result, got {other:?}"),
        }
    }

    #[test]
    fn test_float_functions() {
        let cases: Vec<(&str, Vec<Value>, f64)> = vec![
            ("sqrt", vec![val(16)], 4.0),
            ("sqrt", vec![val(2.25)], 1.5),
            ("exp", vec![val(0)], 1.0),
            ("log", vec![val(E)], 1.0),
            ("log", vec![val(8), val(2)], 3.0),
            ("log2", vec![val(1024)], 10.0),
            ("log10", vec![val(0.001)], -3.0),
            ("log1p", vec![val(0)], 0.0),
            ("sin", vec![val(0)], 0.0),
            ("cos", vec![val(PI)], -1.0),
            ("atan2", vec![val(1), val(1)], PI / 4.0),
            ("hypot", vec![val(3), val(4)], 5.0),
            ("hypot", vec![], 0.0),
            ("pow", vec![val(2), val(0.5)], std::f64::consts::SQRT_2),
            ("degrees", vec![val(PI)], 180.0),
            ("radians", vec![val(180)], PI),
            ("fabs", vec![val(-3)], 3.0),
            ("copysign", vec![val(2), val(-0.0)], -2.0),
            ("fmod", vec![val(7), val(3)], 1.0),
            ("fmod", vec![val(-7), val(3)], -1.0),
            ("tanh", vec![val(0)], 0.0),
            ("cbrt", vec![val(-27)], -3.0),
            ("exp2", vec![val(10)], 1024.0),
            ("remainder", vec![val(7), val(2)], -1.0),
            ("remainder", vec![val(5.5), val(2)], -0.5),
            ("erf", vec![val(0)], 0.0),
            ("erf", vec![val(1)], 0.842_700_792_949_714_9),
            ("erfc", vec![val(0)], 1.0),
            ("gamma", vec![val(5)], 24.0),
            ("gamma", vec![val(0.5)], PI.sqrt()),
            ("lgamma", vec![val(1)], 0.0),
            ("ldexp", vec![val(0.75), val(3)], 6.0),
            ("fsum", vec![val([1.5, 2.5])], 4.0),
            ("fsum", vec![val(Vec::<f64>::new())], 0.0),
            ("dist", vec![val([0, 0]), val([3, 4])], 5.0),
        ];

        for (name, args, expected) in cases {
            let actual = float(name, &args);
            assert!(
                (actual - expected).abs() < 1e-12,
                "{name}{args:?}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn test_domain_and_range_errors() {
        for (name, args) in [
            ("sqrt", vec![val(-1)]),
            ("log", vec![val(0)]),
            ("log", vec![val(-2.5)]),
            ("log", vec![val(10), val(1)]),
            ("log2", vec![val(0)]),
            ("log1p", vec![val(-1)]),
            ("asin", vec![val(2)]),
            ("acosh", vec![val(0.5)]),
            ("atanh", vec![val(1)]),
            ("sin", vec![val(f64::INFINITY)]),
            ("pow", vec![val(0), val(-1)]),
            ("pow", vec![val(-8), val(1.0 / 3.0)]),
            ("fmod", vec![val(1), val(0)]),
            ("exp", vec![val(1000)]),
            ("gamma", vec![val(0)]),
            ("gamma", vec![val(-2)]),
            ("gamma", vec![val(200)]),
            ("lgamma", vec![val(0)]),
            ("remainder", vec![val(1), val(0)]),
            ("ldexp", vec![val(1), val(5000)]),
            ("fsum", vec![val([f64::INFINITY, f64::NEG_INFINITY])]),
            ("fsum", vec![val([1e308, 1e308])]),
            ("dist", vec![val([1, 2]), val([1])]),
            ("isclose", vec![val(1), val(1), val(-1)]),
            ("isqrt", vec![val(-1)]),
            ("comb", vec![val(-1), val(2)]),
            ("perm", vec![val(3), val(-1)]),
        ] {
            let result = call(name, &args);
            assert!(
                matches!(result, Err(Error::EvalError(_))),
                "{name}{args:?}: expected evaluation error, got {result:?}"
            );
        }

        // NaN in, NaN out
        assert!(float("sqrt", &[val(f64::NAN)]).is_nan());
        assert!(float("log", &[val(f64::NAN)]).is_nan());
        // Infinity in, infinity out
        assert_eq!(float("exp", &[val(f64::INFINITY)]), f64::INFINITY);
    }

    #[test]
    fn test_integer_results() {
        let cases: Vec<(&str, Vec<Value>, Option<i64>)> = vec![
            ("floor", vec![val(2.7)], Some(2)),
            ("floor", vec![val(-2.5)], Some(-3)),
            ("ceil", vec![val(2.1)], Some(3)),
            ("trunc", vec![val(-2.7)], Some(-2)),
            ("floor", vec![val(5)], Some(5)),
            ("floor", vec![val(f64::INFINITY)], None),
            ("ceil", vec![val(1e300)], None),
            ("factorial", vec![val(0)], Some(1)),
            ("factorial", vec![val(5)], Some(120)),
            ("factorial", vec![val(20)], Some(2_432_902_008_176_640_000)),
            ("factorial", vec![val(21)], None),
            ("factorial", vec![val(-1)], None),
            ("factorial", vec![val(5.0)], None),
            ("gcd", vec![val(12), val(18)], Some(6)),
            ("gcd", vec![val(-4), val(6), val(10)], Some(2)),
            ("gcd", vec![], Some(0)),
            ("gcd", vec![val(i64::MIN)], None),
            ("gcd", vec![val(1.5), val(3)], None),
            ("lcm", vec![val(4), val(6)], Some(12)),
            ("lcm", vec![val(-4), val(6), val(10)], Some(60)),
            ("lcm", vec![val(0), val(5)], Some(0)),
            ("lcm", vec![], Some(1)),
            ("lcm", vec![val(i64::MAX), val(i64::MAX - 1)], None),
            ("isqrt", vec![val(0)], Some(0)),
            ("isqrt", vec![val(17)], Some(4)),
            ("isqrt", vec![val(i64::MAX)], Some(3_037_000_499)),
            ("isqrt", vec![val(16.0)], None),
            ("comb", vec![val(5), val(2)], Some(10)),
            ("comb", vec![val(2), val(5)], Some(0)),
            ("comb", vec![val(60), val(30)], Some(118_264_581_564_861_424)),
            ("comb", vec![val(100), val(50)], None),
            ("perm", vec![val(5), val(2)], Some(20)),
            ("perm", vec![val(4)], Some(24)),
            ("perm", vec![val(2), val(3)], Some(0)),
            ("perm", vec![val(30)], None),
            ("prod", vec![val([2, 3, 4])], Some(24)),
            ("prod", vec![val(Vec::<i64>::new())], Some(1)),
            ("prod", vec![val([i64::MAX, 2])], None),
            ("prod", vec![val(5)], None),
        ];

        for (name, args, expected) in cases {
            match (call(name, &args), expected) {
                (Ok(Value::Number(Number::Int(n))), Some(expected)) => {
                    assert_eq!(n, expected, "{name}{args:?}");
                }
                (Err(_), None) => {}
                (other, _) => panic!("{name}{args:?}: expected {expected:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_exact_sum() {
        let tenths = vec![val(0.1); 10];
        assert_eq!(call("fsum", &[Value::List(tenths)]).unwrap(), val(1.0));
        assert_eq!(exact_sum(&[1e100, 1.0, -1e100]), 1.0);
        assert_eq!(exact_sum(&[]), 0.0);
    }

    #[test]
    fn test_list_results() {
        assert_eq!(call("frexp", &[val(8)]).unwrap(), Value::List(vec![val(0.5), val(4)]));
        assert_eq!(call("frexp", &[val(0)]).unwrap(), Value::List(vec![val(0.0), val(0)]));
        assert_eq!(
            call("modf", &[val(-3.5)]).unwrap(),
            Value::List(vec![val(-0.5), val(-3.0)])
        );
        assert_eq!(
            call("modf", &[val(f64::INFINITY)]).unwrap(),
            Value::List(vec![val(0.0), val(f64::INFINITY)])
        );
        assert_eq!(call("prod", &[val([2.0, 1.5])]).unwrap(), val(3.0));
    }

    #[test]
    fn test_isclose() {
        let cases: Vec<(Vec<Value>, bool)> = vec![
            (vec![val(1.0), val(1.0 + 1e-10)], true),
            (vec![val(1), val(1.1)], false),
            (vec![val(1), val(1.1), val(0.2)], true),
            (vec![val(0), val(1e-12)], false),
            (vec![val(0), val(1e-12), val(1e-9), val(1e-10)], true),
            (vec![val(f64::INFINITY), val(f64::INFINITY)], true),
            (vec![val(f64::INFINITY), val(1e308)], false),
            (vec![val(f64::NAN), val(f64::NAN)], false),
        ];
        for (args, expected) in cases {
            assert_eq!(call("isclose", &args).unwrap(), val(expected), "isclose{args:?}");
        }
        assert!(call("isclose", &[val(1)]).is_err());
    }

    #[test]
    fn test_full_math_library_is_registered() {
        for name in [
            "sqrt", "exp", "expm1", "exp2", "log", "log2", "log10", "log1p", "sin", "cos", "tan",
            "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh", "asinh", "acosh", "atanh",
            "floor", "ceil", "trunc", "fabs", "pow", "hypot", "degrees", "radians", "copysign",
            "fmod", "remainder", "factorial", "gcd", "lcm", "isqrt", "comb", "perm", "cbrt",
            "isclose", "ldexp", "frexp", "modf", "fsum", "prod", "dist", "erf", "erfc", "gamma",
            "lgamma", "isnan", "isinf", "isfinite",
        ] {
            assert!(find_builtin_op(name).is_some(), "missing math function {name}");
        }
    }

    #[test]
    fn test_predicates_and_constants() {
        assert_eq!(call("isnan", &[val(f64::NAN)]).unwrap(), val(true));
        assert_eq!(call("isnan", &[val(1)]).unwrap(), val(false));
        assert_eq!(call("isinf", &[val(f64::NEG_INFINITY)]).unwrap(), val(true));
        assert_eq!(call("isfinite", &[val(1e308)]).unwrap(), val(true));
        assert!(call("isnan", &[val(true)]).is_err());

        let names: Vec<_> = CONSTANTS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["pi", "e", "tau", "inf", "nan"]);
        assert!(find_builtin_op("pi").is_none(), "constants are not procedures");
    }
}

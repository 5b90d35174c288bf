use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::Error;
use crate::ast::{Atom, Expr, Number, Value};
use crate::builtinops::{OperationFn, get_builtin_ops, math};

/// Environment for variable bindings
///
/// A single flat table: there are no nested scopes, so a `define` anywhere
/// replaces the one binding for that name.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// An environment with no bindings at all, not even the builtins.
    /// Use [`standard_env`] for the usual starting point.
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register a host function as a procedure.
    ///
    /// The function receives the evaluated arguments; arity checking is up to it.
    ///
    /// # Example
    /// ```
    /// use lispy::{Error, Value, run, standard_env};
    ///
    /// let mut env = standard_env();
    /// env.register_builtin_function("twice", |args: &[Value]| match args {
    ///     [v] => Ok(Value::List(vec![v.clone(), v.clone()])),
    ///     _ => Err(Error::TypeError("twice takes one argument".into())),
    /// });
    /// assert_eq!(run("(length (twice 7))", &mut env).unwrap(), Value::from(2));
    /// ```
    pub fn register_builtin_function<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| func(&args));
        self.define(
            name,
            Value::Procedure {
                name: name.to_owned(),
                func: wrapped,
            },
        );
    }
}

/// Evaluation limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum nesting of evaluation steps. `None` means unbounded, in which case
    /// deeply nested input can exhaust the native stack.
    pub max_depth: Option<usize>,
}

impl EvalConfig {
    /// Bounded at [`crate::DEFAULT_MAX_DEPTH`]
    pub fn bounded() -> Self {
        EvalConfig {
            max_depth: Some(crate::DEFAULT_MAX_DEPTH),
        }
    }
}

/// Evaluate an expression with no depth limit
pub fn eval(expr: &Expr, env: &mut Environment) -> Result<Value, Error> {
    eval_with_config(expr, env, &EvalConfig::default())
}

/// Evaluate an expression under the given limits
#[tracing::instrument(level = "trace", skip_all, fields(expr = %expr))]
pub fn eval_with_config(
    expr: &Expr,
    env: &mut Environment,
    config: &EvalConfig,
) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, env, config, 0)
}

fn eval_with_depth_tracking(
    expr: &Expr,
    env: &mut Environment,
    config: &EvalConfig,
    depth: usize,
) -> Result<Value, Error> {
    if let Some(max) = config.max_depth
        && depth >= max
    {
        debug!(max, "evaluation depth limit exceeded");
        return Err(Error::DepthLimitExceeded(max));
    }

    match expr {
        Expr::Atom(Atom::Symbol(name)) => env
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundSymbol(name.clone())),
        Expr::Atom(Atom::Number(n)) => Ok(Value::Number(*n)),
        Expr::List(elements) => eval_list(elements, env, config, depth),
    }
}

fn eval_args(
    args: &[Expr],
    env: &mut Environment,
    config: &EvalConfig,
    depth: usize,
) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, config, depth + 1))
        .collect()
}

/// Special forms are recognized by their literal head symbol, so binding `if` or
/// `define` in the environment does not shadow them.
fn eval_list(
    elements: &[Expr],
    env: &mut Environment,
    config: &EvalConfig,
    depth: usize,
) -> Result<Value, Error> {
    match elements {
        [] => Ok(Value::List(vec![])),
        [head, args @ ..] => match head.as_symbol() {
            Some("if") => eval_if(args, env, config, depth),
            Some("define") => eval_define(args, env, config, depth),
            _ => {
                let func = eval_with_depth_tracking(head, env, config, depth + 1)?;
                let args = eval_args(args, env, config, depth)?;
                apply_procedure(&func, args)
            }
        },
    }
}

fn eval_if(
    args: &[Expr],
    env: &mut Environment,
    config: &EvalConfig,
    depth: usize,
) -> Result<Value, Error> {
    match args {
        [condition_expr, then_expr, else_expr] => {
            let condition = eval_with_depth_tracking(condition_expr, env, config, depth + 1)?;
            let branch = if condition.is_truthy() {
                then_expr
            } else {
                else_expr
            };
            eval_with_depth_tracking(branch, env, config, depth + 1)
        }
        _ => Err(Error::arity("if", 3, args.len())),
    }
}

fn eval_define(
    args: &[Expr],
    env: &mut Environment,
    config: &EvalConfig,
    depth: usize,
) -> Result<Value, Error> {
    match args {
        [Expr::Atom(Atom::Symbol(name)), expr] => {
            let value = eval_with_depth_tracking(expr, env, config, depth + 1)?;
            trace!(name = %name, value = %value, "define");
            env.define(name.clone(), value);
            Ok(Value::Unspecified)
        }
        [target, _] => Err(Error::TypeError(format!(
            "define requires a symbol, got {target}"
        ))),
        _ => Err(Error::arity("define", 2, args.len())),
    }
}

/// Invoke a procedure value on already-evaluated arguments
pub fn apply_procedure(procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match procedure {
        Value::Procedure { name, func } => {
            trace!(procedure = %name, argc = args.len(), "apply");
            func(args)
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

/// Create an environment seeded with every builtin procedure and math constant
pub fn standard_env() -> Environment {
    let mut env = Environment::new();

    for builtin_op in get_builtin_ops() {
        env.define(builtin_op.name, builtin_op.to_procedure());
    }
    for &(name, value) in math::CONSTANTS {
        env.define(name, Value::Number(Number::Float(value)));
    }

    env
}

//! Builtin functions callable from rule bodies.
//!
//! Arity is checked at compile time against [`BUILTINS`]. Argument types are
//! checked at evaluation time; a mismatch is an [`EvalError::Builtin`].
//! Builtins are only called with defined arguments; an undefined argument
//! makes the whole call undefined.

use confgate_core::Value;

use crate::error::EvalError;

/// Every builtin name with its arity.
pub const BUILTINS: &[(&str, usize)] = &[
    ("count", 1),
    ("sum", 1),
    ("max", 1),
    ("min", 1),
    ("contains", 2),
    ("startswith", 2),
    ("endswith", 2),
    ("lower", 1),
    ("upper", 1),
    ("trim", 1),
    ("split", 2),
    ("concat", 2),
    ("keys", 1),
    ("type_name", 1),
    ("is_string", 1),
    ("is_number", 1),
    ("is_boolean", 1),
    ("is_array", 1),
    ("is_object", 1),
    ("is_null", 1),
    ("to_number", 1),
];

/// Look up a builtin, returning its canonical static name and arity.
pub(crate) fn lookup(name: &str) -> Option<(&'static str, usize)> {
    BUILTINS.iter().copied().find(|(n, _)| *n == name)
}

fn arg_error(function: &str, message: impl Into<String>) -> EvalError {
    EvalError::Builtin {
        function: function.to_string(),
        message: message.into(),
    }
}

fn string_arg<'v>(function: &str, value: &'v Value, position: usize) -> Result<&'v str, EvalError> {
    value.as_str().ok_or_else(|| {
        arg_error(
            function,
            format!("argument {position} must be a string, got {}", value.type_name()),
        )
    })
}

fn numbers(function: &str, value: &Value) -> Result<Vec<f64>, EvalError> {
    let items = value.as_sequence().ok_or_else(|| {
        arg_error(function, format!("expected an array, got {}", value.type_name()))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                arg_error(function, format!("array element must be a number, got {}", item.type_name()))
            })
        })
        .collect()
}

static NULL: Value = Value::Null;

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&NULL)
}

/// Call builtin `name` with defined arguments. `Ok(None)` means undefined.
pub(crate) fn call(name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let value = match name {
        "count" => match arg(args, 0) {
            Value::Sequence(items) => Value::from(items.len() as f64),
            Value::Mapping(map) => Value::from(map.len() as f64),
            Value::String(s) => Value::from(s.chars().count() as f64),
            other => {
                return Err(arg_error(name, format!("cannot count {}", other.type_name())))
            }
        },
        "sum" => Value::from(numbers(name, arg(args, 0))?.iter().sum::<f64>()),
        "max" => match numbers(name, arg(args, 0))?.into_iter().reduce(f64::max) {
            Some(n) => Value::from(n),
            None => return Ok(None),
        },
        "min" => match numbers(name, arg(args, 0))?.into_iter().reduce(f64::min) {
            Some(n) => Value::from(n),
            None => return Ok(None),
        },
        "contains" => match arg(args, 0) {
            Value::Sequence(items) => Value::Bool(items.contains(arg(args, 1))),
            Value::String(haystack) => {
                Value::Bool(haystack.contains(string_arg(name, arg(args, 1), 2)?))
            }
            other => {
                return Err(arg_error(
                    name,
                    format!("argument 1 must be a string or array, got {}", other.type_name()),
                ))
            }
        },
        "startswith" => {
            Value::Bool(string_arg(name, arg(args, 0), 1)?.starts_with(string_arg(name, arg(args, 1), 2)?))
        }
        "endswith" => {
            Value::Bool(string_arg(name, arg(args, 0), 1)?.ends_with(string_arg(name, arg(args, 1), 2)?))
        }
        "lower" => Value::from(string_arg(name, arg(args, 0), 1)?.to_lowercase()),
        "upper" => Value::from(string_arg(name, arg(args, 0), 1)?.to_uppercase()),
        "trim" => Value::from(string_arg(name, arg(args, 0), 1)?.trim()),
        "split" => {
            let text = string_arg(name, arg(args, 0), 1)?;
            let sep = string_arg(name, arg(args, 1), 2)?;
            if sep.is_empty() {
                return Err(arg_error(name, "separator must not be empty"));
            }
            Value::Sequence(text.split(sep).map(Value::from).collect())
        }
        "concat" => {
            let sep = string_arg(name, arg(args, 0), 1)?;
            let items = arg(args, 1).as_sequence().ok_or_else(|| {
                arg_error(name, format!("argument 2 must be an array, got {}", arg(args, 1).type_name()))
            })?;
            let parts = items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        arg_error(name, format!("array element must be a string, got {}", item.type_name()))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Value::from(parts.join(sep))
        }
        "keys" => match arg(args, 0) {
            Value::Mapping(map) => Value::Sequence(map.keys().map(|k| Value::from(k.as_str())).collect()),
            other => {
                return Err(arg_error(name, format!("expected an object, got {}", other.type_name())))
            }
        },
        "type_name" => Value::from(arg(args, 0).type_name()),
        "is_string" => Value::Bool(matches!(arg(args, 0), Value::String(_))),
        "is_number" => Value::Bool(matches!(arg(args, 0), Value::Number(_))),
        "is_boolean" => Value::Bool(matches!(arg(args, 0), Value::Bool(_))),
        "is_array" => Value::Bool(matches!(arg(args, 0), Value::Sequence(_))),
        "is_object" => Value::Bool(matches!(arg(args, 0), Value::Mapping(_))),
        "is_null" => Value::Bool(arg(args, 0).is_null()),
        "to_number" => match arg(args, 0) {
            Value::Number(n) => Value::Number(*n),
            Value::Null => Value::Number(0.0),
            Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Value::Number(n),
                _ => return Err(arg_error(name, format!("cannot convert {s:?} to a number"))),
            },
            other => {
                return Err(arg_error(
                    name,
                    format!("cannot convert {} to a number", other.type_name()),
                ))
            }
        },
        other => return Err(arg_error(other, "unknown builtin")),
    };
    Ok(Some(value))
}

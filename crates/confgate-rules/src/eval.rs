//! Backtracking interpreter.
//!
//! A rule body is a conjunction. `some` introduces a choice point: every
//! binding that satisfies the remaining statements produces one message.
//! Expressions evaluate to `Option<Value>`; `None` is *undefined* and makes
//! the enclosing statement fail without raising an error.

use std::borrow::Cow;
use std::collections::BTreeSet;

use confgate_core::Value;

use crate::ast::{BinOp, Definition, Expr, Stmt, TemplatePart};
use crate::builtins;
use crate::error::EvalError;

/// Placeholder text for an undefined template expression.
const UNDEFINED: &str = "<undefined>";

/// The documents visible to a rule: `input` and `data`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub input: &'a Value,
    pub data: &'a Value,
}

enum Flow {
    Continue,
    Stop,
}

type Eval<'a> = Result<Option<Cow<'a, Value>>, EvalError>;
type OnMatch<'f> = dyn FnMut(&[Value]) -> Result<Flow, EvalError> + 'f;

/// Every distinct message a definition produces against `ctx`.
pub(crate) fn messages(
    def: &Definition,
    rule_name: &str,
    ctx: &Context<'_>,
    out: &mut BTreeSet<String>,
) -> Result<(), EvalError> {
    let mut env = Vec::new();
    solve(&def.body, &mut env, ctx, &mut |env| {
        out.insert(render(def.template.as_deref(), rule_name, env, ctx)?);
        Ok(Flow::Continue)
    })?;
    Ok(())
}

fn truthy(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Bool(false)))
}

/// `(key, element)` pairs of a collection; `None` for scalars.
fn entries(value: &Value) -> Option<Vec<(Value, &Value)>> {
    match value {
        Value::Sequence(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (Value::Number(i as f64), item))
                .collect(),
        ),
        Value::Mapping(map) => Some(
            map.iter()
                .map(|(k, v)| (Value::String(k.clone()), v))
                .collect(),
        ),
        _ => None,
    }
}

fn solve(
    stmts: &[Stmt],
    env: &mut Vec<Value>,
    ctx: &Context<'_>,
    on_match: &mut OnMatch<'_>,
) -> Result<Flow, EvalError> {
    let Some((first, rest)) = stmts.split_first() else {
        return on_match(env);
    };
    match first {
        Stmt::Expr(expr) => {
            if truthy(eval(expr, env, ctx)?.as_deref()) {
                return solve(rest, env, ctx, on_match);
            }
        }
        Stmt::Not(expr) => {
            if !truthy(eval(expr, env, ctx)?.as_deref()) {
                return solve(rest, env, ctx, on_match);
            }
        }
        Stmt::Assign(expr) => {
            if let Some(value) = eval(expr, env, ctx)?.map(Cow::into_owned) {
                env.push(value);
                let flow = solve(rest, env, ctx, on_match);
                env.pop();
                return flow;
            }
        }
        Stmt::Some { with_key, domain } => {
            let Some(domain) = eval(domain, env, ctx)?.map(Cow::into_owned) else {
                return Ok(Flow::Continue);
            };
            let mark = env.len();
            for (key, item) in entries(&domain).unwrap_or_default() {
                if *with_key {
                    env.push(key);
                }
                env.push(item.clone());
                let flow = solve(rest, env, ctx, on_match);
                env.truncate(mark);
                if let Flow::Stop = flow? {
                    return Ok(Flow::Stop);
                }
            }
        }
        Stmt::Every {
            with_key,
            domain,
            body,
        } => {
            let Some(domain) = eval(domain, env, ctx)?.map(Cow::into_owned) else {
                return Ok(Flow::Continue);
            };
            let Some(pairs) = entries(&domain) else {
                return Ok(Flow::Continue);
            };
            let mark = env.len();
            for (key, item) in pairs {
                if *with_key {
                    env.push(key);
                }
                env.push(item.clone());
                let holds = satisfiable(body, env, ctx);
                env.truncate(mark);
                if !holds? {
                    return Ok(Flow::Continue);
                }
            }
            return solve(rest, env, ctx, on_match);
        }
    }
    Ok(Flow::Continue)
}

fn satisfiable(body: &[Stmt], env: &mut Vec<Value>, ctx: &Context<'_>) -> Result<bool, EvalError> {
    let mut found = false;
    solve(body, env, ctx, &mut |_| {
        found = true;
        Ok(Flow::Stop)
    })?;
    Ok(found)
}

fn child<'a>(
    base: Cow<'a, Value>,
    select: impl FnOnce(&Value) -> Option<&Value>,
) -> Option<Cow<'a, Value>> {
    match base {
        Cow::Borrowed(value) => select(value).map(Cow::Borrowed),
        Cow::Owned(value) => select(&value).cloned().map(Cow::Owned),
    }
}

fn index_into<'v>(base: &'v Value, index: &Value) -> Option<&'v Value> {
    match (base, index) {
        (Value::Sequence(items), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
            items.get(*n as usize)
        }
        (Value::Mapping(map), Value::String(key)) => map.get(key),
        _ => None,
    }
}

fn eval<'a>(expr: &'a Expr, env: &'a [Value], ctx: &Context<'a>) -> Eval<'a> {
    let value = match expr {
        Expr::Literal(value) => Some(Cow::Borrowed(value)),
        Expr::Input => Some(Cow::Borrowed(ctx.input)),
        Expr::Data => Some(Cow::Borrowed(ctx.data)),
        Expr::Local(slot) => env.get(*slot).map(Cow::Borrowed),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match eval(item, env, ctx)? {
                    Some(value) => out.push(value.into_owned()),
                    None => return Ok(None),
                }
            }
            Some(Cow::Owned(Value::Sequence(out)))
        }
        Expr::Field(base, name) => match eval(base, env, ctx)? {
            Some(base) => child(base, |v| v.get(name)),
            None => None,
        },
        Expr::Index(base, index) => {
            let (Some(base), Some(index)) = (eval(base, env, ctx)?, eval(index, env, ctx)?) else {
                return Ok(None);
            };
            child(base, |v| index_into(v, &index))
        }
        Expr::Neg(inner) => match eval(inner, env, ctx)?.as_deref() {
            Some(Value::Number(n)) => Some(Cow::Owned(Value::Number(-n))),
            Some(other) => return Err(EvalError::Negate(other.type_name())),
            None => None,
        },
        Expr::Binary(op, left, right) => {
            let (Some(left), Some(right)) = (eval(left, env, ctx)?, eval(right, env, ctx)?) else {
                return Ok(None);
            };
            Some(Cow::Owned(binary(*op, &left, &right)?))
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                match eval(arg, env, ctx)? {
                    Some(value) => values.push(value.into_owned()),
                    None => return Ok(None),
                }
            }
            builtins::call(name, &values)?.map(Cow::Owned)
        }
    };
    Ok(value)
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let mismatch = || EvalError::Operands {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };
    let value = match op {
        BinOp::Eq => Value::Bool(left == right),
        BinOp::Neq => Value::Bool(left != right),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(mismatch()),
            };
            let holds = ordering.is_some_and(|ord| match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            });
            Value::Bool(holds)
        }
        BinOp::In => match right {
            Value::Sequence(items) => Value::Bool(items.contains(left)),
            Value::Mapping(map) => Value::Bool(map.values().any(|v| v == left)),
            _ => return Err(mismatch()),
        },
        BinOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            _ => return Err(mismatch()),
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else {
                return Err(mismatch());
            };
            match op {
                BinOp::Sub => Value::Number(a - b),
                BinOp::Mul => Value::Number(a * b),
                _ if *b == 0.0 => return Err(EvalError::DivisionByZero),
                BinOp::Div => Value::Number(a / b),
                _ => Value::Number(a % b),
            }
        }
    };
    Ok(value)
}

fn render(
    template: Option<&[TemplatePart]>,
    rule_name: &str,
    env: &[Value],
    ctx: &Context<'_>,
) -> Result<String, EvalError> {
    let Some(parts) = template else {
        return Ok(rule_name.to_string());
    };
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Text(text) => out.push_str(text),
            TemplatePart::Expr(expr) => match eval(expr, env, ctx)?.as_deref() {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => out.push_str(UNDEFINED),
            },
        }
    }
    Ok(out)
}

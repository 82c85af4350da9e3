//! Tree-walking evaluator for parsed expressions.
//!
//! Values follow the usual dynamic-language conventions: `+` concatenates as
//! soon as one side is a string, every other arithmetic operator coerces its
//! operands to numbers, and `&&` / `||` return one of their operands.

use serde_json::{Number, Value};

use super::parser::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};

/// A scalar produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Numeric coercion. Non-numeric strings become NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Scalar::Number(n) => *n,
            Scalar::Bool(b) => f64::from(u8::from(*b)),
            Scalar::Null => 0.0,
            Scalar::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Str(s) => !s.is_empty(),
            Scalar::Bool(b) => *b,
            Scalar::Null => false,
        }
    }

    /// String form used by concatenation.
    pub fn to_display(&self) -> String {
        match self {
            Scalar::Number(n) => format_number(*n),
            Scalar::Str(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => "null".to_string(),
        }
    }

    /// Convert to a JSON cell value.
    ///
    /// Integral numbers become JSON integers; NaN and infinities become null.
    pub fn into_json(self) -> Value {
        match self {
            Scalar::Number(n) if !n.is_finite() => Value::Null,
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                Value::from(n as i64)
            }
            Scalar::Number(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Str(s) => Value::String(s),
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Null => Value::Null,
        }
    }
}

/// Number to text the way dynamic languages print it: shortest round-trip
/// digits, exponent form outside `[1e-6, 1e21)`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    // `{:e}` yields `1e21` / `1.5e-7`; positive exponents carry an explicit sign.
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// Evaluate an expression tree.
pub fn evaluate(expr: &Expr) -> ExpressionResult<Scalar> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Unary { op, expr } => {
            let value = evaluate(expr)?;
            Ok(match op {
                UnaryOp::Neg => Scalar::Number(-value.to_number()),
                UnaryOp::Plus => Scalar::Number(value.to_number()),
                UnaryOp::Not => Scalar::Bool(!value.is_truthy()),
            })
        }
        Expr::Binary { left, op, right } => {
            let left = evaluate(left)?;
            let right = evaluate(right)?;
            Ok(binary(&left, *op, &right))
        }
        Expr::Logical { left, op, right } => {
            let left = evaluate(left)?;
            match (op, left.is_truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => evaluate(right),
            }
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if evaluate(cond)?.is_truthy() {
                evaluate(then)
            } else {
                evaluate(otherwise)
            }
        }
        Expr::Call { name, args } => {
            let args = args.iter().map(evaluate).collect::<ExpressionResult<Vec<_>>>()?;
            call(name, &args)
        }
    }
}

fn binary(left: &Scalar, op: BinaryOp, right: &Scalar) -> Scalar {
    match op {
        BinaryOp::Add => match (left, right) {
            (Scalar::Str(_), _) | (_, Scalar::Str(_)) => {
                Scalar::Str(format!("{}{}", left.to_display(), right.to_display()))
            }
            _ => Scalar::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => Scalar::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Scalar::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Scalar::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Scalar::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Scalar::Bool(compare(left, right, |o| o.is_lt())),
        BinaryOp::Le => Scalar::Bool(compare(left, right, |o| o.is_le())),
        BinaryOp::Gt => Scalar::Bool(compare(left, right, |o| o.is_gt())),
        BinaryOp::Ge => Scalar::Bool(compare(left, right, |o| o.is_ge())),
        BinaryOp::Eq => Scalar::Bool(loose_eq(left, right)),
        BinaryOp::Ne => Scalar::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Scalar::Bool(left == right),
        BinaryOp::StrictNe => Scalar::Bool(left != right),
    }
}

/// Relational comparison: strings compare lexically, everything else
/// numerically. Any comparison involving NaN is false.
fn compare(left: &Scalar, right: &Scalar, test: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    let ordering = match (left, right) {
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    ordering.is_some_and(test)
}

fn loose_eq(left: &Scalar, right: &Scalar) -> bool {
    match (left, right) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Null, _) | (_, Scalar::Null) => false,
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

fn call(name: &str, args: &[Scalar]) -> ExpressionResult<Scalar> {
    let short = name.strip_prefix("Math.").unwrap_or(name);
    let nums: Vec<f64> = args.iter().map(Scalar::to_number).collect();

    let unary = |f: fn(f64) -> f64| -> ExpressionResult<Scalar> {
        match nums.as_slice() {
            [x] => Ok(Scalar::Number(f(*x))),
            _ => Err(arity(short, "1", nums.len())),
        }
    };

    match short {
        "abs" => unary(f64::abs),
        "ceil" => unary(f64::ceil),
        "floor" => unary(f64::floor),
        // Halves round towards positive infinity.
        "round" => unary(|x| (x + 0.5).floor()),
        "sqrt" => unary(f64::sqrt),
        "pow" => match nums.as_slice() {
            [base, exp] => Ok(Scalar::Number(base.powf(*exp))),
            _ => Err(arity(short, "2", nums.len())),
        },
        "min" => Ok(Scalar::Number(fold_nan(&nums, f64::INFINITY, f64::min))),
        "max" => Ok(Scalar::Number(fold_nan(&nums, f64::NEG_INFINITY, f64::max))),
        _ => Err(ExpressionError::UnknownFunction(name.to_string())),
    }
}

/// Fold that yields NaN as soon as any input is NaN.
fn fold_nan(nums: &[f64], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    if nums.iter().any(|n| n.is_nan()) {
        return f64::NAN;
    }
    nums.iter().copied().fold(init, f)
}

fn arity(name: &str, expected: &str, got: usize) -> ExpressionError {
    ExpressionError::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
        got,
    }
}

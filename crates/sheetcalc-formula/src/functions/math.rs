//! Aggregate and numeric functions

use super::first_error;
use crate::evaluator::{EmptyAggregate, EvaluationContext};
use sheetcalc_core::{CellError, Value};

/// Numbers among the arguments; empty, text and boolean values are skipped
fn numbers(args: &[Value]) -> impl Iterator<Item = f64> + '_ {
    args.iter().filter_map(Value::as_number)
}

/// Coerce one argument like an arithmetic operand
fn numeric_arg(arg: Option<&Value>) -> Result<f64, CellError> {
    match arg {
        Some(Value::Error(e)) => Err(*e),
        Some(v) => v.coerce_number().ok_or(CellError::Value),
        None => Err(CellError::Value),
    }
}

fn finite(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::Error(CellError::Value)
    }
}

/// SUM(value1, ...)
pub fn fn_sum(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }
    finite(numbers(args).sum())
}

/// AVERAGE(value1, ...)
///
/// With no numbers at all the result follows [`EmptyAggregate`].
pub fn fn_average(args: &[Value], ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }

    let (sum, count) = numbers(args).fold((0.0, 0usize), |(s, c), n| (s + n, c + 1));
    if count == 0 {
        return match ctx.options().empty_average {
            EmptyAggregate::Zero => Value::Number(0.0),
            EmptyAggregate::DivZero => Value::Error(CellError::Div0),
        };
    }

    finite(sum / count as f64)
}

/// COUNT(value1, ...) - counts numbers only
pub fn fn_count(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }
    Value::Number(numbers(args).count() as f64)
}

/// MIN(value1, ...)
pub fn fn_min(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }
    Value::Number(numbers(args).reduce(f64::min).unwrap_or(0.0))
}

/// MAX(value1, ...)
pub fn fn_max(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }
    Value::Number(numbers(args).reduce(f64::max).unwrap_or(0.0))
}

/// ABS(number)
pub fn fn_abs(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    match numeric_arg(args.first()) {
        Ok(n) => Value::Number(n.abs()),
        Err(e) => Value::Error(e),
    }
}

/// ROUND(number, [num_digits])
///
/// Rounds half away from zero. Negative digits round to the left of the
/// decimal point; fractional digits are truncated toward zero.
pub fn fn_round(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    let number = match numeric_arg(args.first()) {
        Ok(n) => n,
        Err(e) => return Value::Error(e),
    };
    let digits = match args.get(1) {
        None => 0.0,
        arg => match numeric_arg(arg) {
            Ok(d) => d.trunc(),
            Err(e) => return Value::Error(e),
        },
    };

    // Beyond f64 precision rounding is a no-op (or rounds everything away)
    let digits = digits.clamp(-308.0, 308.0) as i32;
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        let scaled = number * factor;
        if !scaled.is_finite() {
            return Value::Number(number);
        }
        finite(scaled.round() / factor)
    } else {
        let factor = 10f64.powi(-digits);
        finite((number / factor).round() * factor)
    }
}

/// SQRT(number)
pub fn fn_sqrt(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    match numeric_arg(args.first()) {
        Ok(n) if n < 0.0 => Value::Error(CellError::Value),
        Ok(n) => Value::Number(n.sqrt()),
        Err(e) => Value::Error(e),
    }
}

/// POW(base, exponent)
pub fn fn_pow(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    let base = match numeric_arg(args.first()) {
        Ok(n) => n,
        Err(e) => return Value::Error(e),
    };
    let exponent = match numeric_arg(args.get(1)) {
        Ok(n) => n,
        Err(e) => return Value::Error(e),
    };

    if base == 0.0 && exponent < 0.0 {
        return Value::Error(CellError::Div0);
    }
    finite(base.powf(exponent))
}

//! Logical functions

use crate::evaluator::EvaluationContext;
use sheetcalc_core::{CellError, Value};

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    let Some(condition) = args.first() else {
        return Value::Error(CellError::Value);
    };

    match condition.coerce_bool() {
        Ok(true) => args.get(1).cloned().unwrap_or(Value::Error(CellError::Value)),
        Ok(false) => args.get(2).cloned().unwrap_or(Value::Boolean(false)),
        Err(e) => Value::Error(e),
    }
}

/// Fold the truth values of all arguments, stopping at the first error
fn fold_bools(args: &[Value], init: bool, f: impl Fn(bool, bool) -> bool) -> Value {
    if args.is_empty() {
        return Value::Error(CellError::Value);
    }

    let mut acc = init;
    for arg in args {
        match arg.coerce_bool() {
            Ok(b) => acc = f(acc, b),
            Err(e) => return Value::Error(e),
        }
    }
    Value::Boolean(acc)
}

/// AND(logical1, ...)
pub fn fn_and(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    fold_bools(args, true, |acc, b| acc && b)
}

/// OR(logical1, ...)
pub fn fn_or(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    fold_bools(args, false, |acc, b| acc || b)
}

/// NOT(logical)
pub fn fn_not(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    match args.first().map(Value::coerce_bool) {
        Some(Ok(b)) => Value::Boolean(!b),
        Some(Err(e)) => Value::Error(e),
        None => Value::Error(CellError::Value),
    }
}

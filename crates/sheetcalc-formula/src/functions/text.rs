//! Text functions

use super::first_error;
use crate::evaluator::EvaluationContext;
use sheetcalc_core::{CellError, Value};

/// CONCAT(text1, ...)
pub fn fn_concat(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    if let Some(e) = first_error(args) {
        return e;
    }
    Value::Text(args.iter().map(Value::display_text).collect())
}

fn map_text(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    match args.first() {
        Some(Value::Error(e)) => Value::Error(*e),
        Some(v) => Value::Text(f(&v.display_text())),
        None => Value::Error(CellError::Value),
    }
}

/// UPPER(text)
pub fn fn_upper(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    map_text(args, str::to_uppercase)
}

/// LOWER(text)
pub fn fn_lower(args: &[Value], _ctx: &EvaluationContext<'_>) -> Value {
    map_text(args, str::to_lowercase)
}

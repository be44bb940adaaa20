//! Formula evaluator
//!
//! Walks an [`Expr`] against an [`EvaluationContext`]. Evaluation never fails
//! in the Rust sense: every problem becomes a [`CellError`] value that flows
//! onward through operators and functions.

use crate::ast::{BinaryOperator, Expr};
use crate::functions::FunctionRegistry;
use sheetcalc_core::{CellAddress, CellError, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Result of evaluating an expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    /// A single value
    Scalar(Value),
    /// The non-empty cells of a range, row-major
    List(Vec<Value>),
}

impl Evaluated {
    /// Collapse to a scalar; a list in scalar position is `#VALUE!`
    pub fn into_scalar(self) -> Value {
        match self {
            Evaluated::Scalar(v) => v,
            Evaluated::List(_) => Value::Error(CellError::Value),
        }
    }
}

/// How AVERAGE treats an argument list with no numbers in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyAggregate {
    /// Return 0
    #[default]
    Zero,
    /// Return `#DIV/0!`
    DivZero,
}

/// Options that change evaluation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Result of AVERAGE over nothing
    pub empty_average: EmptyAggregate,
}

/// Source of cell values for evaluation
///
/// The cell store implements this; resolving a dirty formula cell evaluates
/// it with the same context, which is how the evaluation stack follows
/// nested references.
pub trait CellResolver {
    /// Current value of the cell at `address`
    fn resolve(&self, address: CellAddress, ctx: &EvaluationContext<'_>) -> Value;
}

/// A sheet with no cells; every reference reads as empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCells;

impl CellResolver for NoCells {
    fn resolve(&self, _address: CellAddress, _ctx: &EvaluationContext<'_>) -> Value {
        Value::Empty
    }
}

impl<S: std::hash::BuildHasher> CellResolver for HashMap<CellAddress, Value, S> {
    fn resolve(&self, address: CellAddress, _ctx: &EvaluationContext<'_>) -> Value {
        self.get(&address).cloned().unwrap_or_default()
    }
}

static NO_CELLS: NoCells = NoCells;

/// Context for formula evaluation
///
/// Built fresh for each top-level read. The only state it carries is the
/// stack of formula cells currently being evaluated.
pub struct EvaluationContext<'a> {
    cells: &'a dyn CellResolver,
    functions: &'a FunctionRegistry,
    options: EvalOptions,
    stack: RefCell<Vec<CellAddress>>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(
        cells: &'a dyn CellResolver,
        functions: &'a FunctionRegistry,
        options: EvalOptions,
    ) -> Self {
        Self {
            cells,
            functions,
            options,
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Create a context over a resolver with the built-in functions
    pub fn with_cells(cells: &'a dyn CellResolver) -> Self {
        Self::new(cells, FunctionRegistry::builtin(), EvalOptions::default())
    }

    /// Create a simple context without cells (for testing)
    pub fn simple() -> EvaluationContext<'static> {
        EvaluationContext::with_cells(&NO_CELLS)
    }

    /// The function registry
    pub fn functions(&self) -> &FunctionRegistry {
        self.functions
    }

    /// The evaluation options
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Value of a referenced cell
    ///
    /// A cell that is already being evaluated further up the stack reads as
    /// `#CIRC!` instead of recursing.
    pub fn cell_value(&self, address: CellAddress) -> Value {
        if self.is_evaluating(address) {
            return Value::Error(CellError::Circular);
        }
        self.cells.resolve(address, self)
    }

    /// Check if `address` is on the evaluation stack
    pub fn is_evaluating(&self, address: CellAddress) -> bool {
        self.stack.borrow().contains(&address)
    }

    /// Push `address` on the evaluation stack for the lifetime of the guard
    ///
    /// Returns `None` if the address is already on the stack.
    pub fn enter(&self, address: CellAddress) -> Option<EvaluationGuard<'_>> {
        let mut stack = self.stack.borrow_mut();
        if stack.contains(&address) {
            return None;
        }
        stack.push(address);
        Some(EvaluationGuard {
            stack: &self.stack,
        })
    }

    /// Current nesting depth of formula evaluation
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Pops its address off the evaluation stack when dropped
pub struct EvaluationGuard<'c> {
    stack: &'c RefCell<Vec<CellAddress>>,
}

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl Expr {
    /// Evaluate this expression
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Evaluated {
        evaluate(self, ctx)
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &Expr, ctx: &EvaluationContext<'_>) -> Evaluated {
    match expr {
        Expr::Literal(v) => Evaluated::Scalar(v.clone()),

        Expr::CellRef(addr) => Evaluated::Scalar(ctx.cell_value(*addr)),

        Expr::Range(range) => Evaluated::List(
            range
                .cells()
                .map(|addr| ctx.cell_value(addr))
                .filter(|v| !v.is_empty())
                .collect(),
        ),

        Expr::BinaryOp { op, left, right } => {
            Evaluated::Scalar(evaluate_binary_op(*op, left, right, ctx))
        }

        Expr::FunctionCall { name, args } => Evaluated::Scalar(evaluate_function(name, args, ctx)),
    }
}

/// Evaluate an expression to a single value
pub fn evaluate_scalar(expr: &Expr, ctx: &EvaluationContext<'_>) -> Value {
    evaluate(expr, ctx).into_scalar()
}

fn evaluate_binary_op(
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext<'_>,
) -> Value {
    let left_val = evaluate_scalar(left, ctx);
    let right_val = evaluate_scalar(right, ctx);

    // Errors pass through untouched, left operand first
    if let Some(e) = left_val.as_error() {
        return Value::Error(e);
    }
    if let Some(e) = right_val.as_error() {
        return Value::Error(e);
    }

    match op {
        BinaryOperator::Equal => compare(&left_val, &right_val, |o| o == Ordering::Equal),
        BinaryOperator::NotEqual => compare(&left_val, &right_val, |o| o != Ordering::Equal),
        BinaryOperator::LessThan => compare(&left_val, &right_val, |o| o == Ordering::Less),
        BinaryOperator::LessEqual => compare(&left_val, &right_val, |o| o != Ordering::Greater),
        BinaryOperator::GreaterThan => {
            compare(&left_val, &right_val, |o| o == Ordering::Greater)
        }
        BinaryOperator::GreaterEqual => compare(&left_val, &right_val, |o| o != Ordering::Less),

        BinaryOperator::Add => arithmetic(&left_val, &right_val, |l, r| Ok(l + r)),
        BinaryOperator::Subtract => arithmetic(&left_val, &right_val, |l, r| Ok(l - r)),
        BinaryOperator::Multiply => arithmetic(&left_val, &right_val, |l, r| Ok(l * r)),
        BinaryOperator::Divide => arithmetic(&left_val, &right_val, |l, r| {
            if r == 0.0 {
                Err(CellError::Div0)
            } else {
                Ok(l / r)
            }
        }),
        BinaryOperator::Modulo => arithmetic(&left_val, &right_val, |l, r| {
            if r == 0.0 {
                Err(CellError::Div0)
            } else {
                Ok(l - r * (l / r).floor())
            }
        }),
    }
}

fn compare(left: &Value, right: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    Value::Boolean(test(compare_values(left, right)))
}

/// Coerce both operands to numbers and apply `f`; non-finite results are `#VALUE!`
fn arithmetic(
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> Result<f64, CellError>,
) -> Value {
    let (Some(l), Some(r)) = (left.coerce_number(), right.coerce_number()) else {
        return Value::Error(CellError::Value);
    };

    match f(l, r) {
        Ok(result) if result.is_finite() => Value::Number(result),
        Ok(_) => Value::Error(CellError::Value),
        Err(e) => Value::Error(e),
    }
}

/// Order two non-error values
///
/// Numerically coercible pairs compare as numbers and text pairs compare
/// case-insensitively. Remaining mixed pairs order number < text < boolean.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn lower(v: &Value) -> Option<String> {
        match v {
            Value::Text(s) => Some(s.to_lowercase()),
            Value::Empty => Some(String::new()),
            _ => None,
        }
    }

    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) | Value::Empty => 0,
            Value::Text(_) => 1,
            Value::Boolean(_) => 2,
            Value::Error(_) => 3,
        }
    }

    if matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)) {
        if let (Some(l), Some(r)) = (lower(left), lower(right)) {
            if !(left.is_empty() && right.is_empty()) {
                return l.cmp(&r);
            }
        }
    }

    match (left.coerce_number(), right.coerce_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn evaluate_function(name: &str, args: &[Expr], ctx: &EvaluationContext<'_>) -> Value {
    let Some(func) = ctx.functions().get(name) else {
        return Value::Error(CellError::Name);
    };

    if !func.accepts(args.len()) {
        return Value::Error(CellError::Value);
    }

    // Range arguments are flattened into the scalar list
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        match evaluate(arg, ctx) {
            Evaluated::Scalar(v) => evaluated_args.push(v),
            Evaluated::List(values) => evaluated_args.extend(values),
        }
    }

    (func.implementation)(&evaluated_args, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> Value {
        let ast = parse_formula(formula).unwrap();
        evaluate_scalar(&ast, &EvaluationContext::simple())
    }

    fn eval_with(cells: &HashMap<CellAddress, Value>, formula: &str) -> Value {
        let ast = parse_formula(formula).unwrap();
        evaluate_scalar(&ast, &EvaluationContext::with_cells(cells))
    }

    fn sheet(values: &[(&str, Value)]) -> HashMap<CellAddress, Value> {
        values
            .iter()
            .map(|(a, v)| (CellAddress::parse(a).unwrap(), v.clone()))
            .collect()
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2"), Value::Number(3.0));
        assert_eq!(eval("=10-3"), Value::Number(7.0));
        assert_eq!(eval("=4*5"), Value::Number(20.0));
        assert_eq!(eval("=20/4"), Value::Number(5.0));
        assert_eq!(eval("=7%3"), Value::Number(1.0));
        assert_eq!(eval("=-7%3"), Value::Number(2.0));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("=1+2*3"), Value::Number(7.0));
        assert_eq!(eval("=(1+2)*3"), Value::Number(9.0));
        assert_eq!(eval("=2+3*4-5"), Value::Number(9.0));
        assert_eq!(eval("=-2*3"), Value::Number(-6.0));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("=1<2"), Value::Boolean(true));
        assert_eq!(eval("=5=5"), Value::Boolean(true));
        assert_eq!(eval("=5<>5"), Value::Boolean(false));
        assert_eq!(eval("=5>=6"), Value::Boolean(false));
        assert_eq!(eval("=6>=6"), Value::Boolean(true));
        assert_eq!(eval("=3<=2"), Value::Boolean(false));
        assert_eq!(eval("=2<=2"), Value::Boolean(true));
        assert_eq!(eval("=3>2"), Value::Boolean(true));
        assert_eq!(eval("=2>2"), Value::Boolean(false));
        assert_eq!(eval("=\"abc\"=\"ABC\""), Value::Boolean(true));
        assert_eq!(eval("=\"a\"<\"b\""), Value::Boolean(true));
        assert_eq!(eval("=1<\"a\""), Value::Boolean(true));
        assert_eq!(eval("=TRUE=1"), Value::Boolean(true));
    }

    #[test]
    fn test_comparison_with_empty_cells() {
        let cells = sheet(&[]);
        assert_eq!(eval_with(&cells, "=A1=0"), Value::Boolean(true));
        assert_eq!(eval_with(&cells, "=A1=\"\""), Value::Boolean(true));
        assert_eq!(eval_with(&cells, "=A1=B1"), Value::Boolean(true));
    }

    #[test]
    fn test_division_by_zero_propagates() {
        assert_eq!(eval("=1/0"), Value::Error(CellError::Div0));
        assert_eq!(eval("=5%0"), Value::Error(CellError::Div0));
        assert_eq!(eval("=(1/0)+1"), Value::Error(CellError::Div0));
        assert_eq!(eval("=2*(3-1/0)"), Value::Error(CellError::Div0));
        assert_eq!(eval("=1/0>3"), Value::Error(CellError::Div0));
    }

    #[test]
    fn test_left_error_wins() {
        let cells = sheet(&[
            ("A1", Value::Error(CellError::Name)),
            ("A2", Value::Error(CellError::Div0)),
        ]);
        assert_eq!(eval_with(&cells, "=A1+A2"), Value::Error(CellError::Name));
        assert_eq!(eval_with(&cells, "=A2+A1"), Value::Error(CellError::Div0));
    }

    #[test]
    fn test_coercion() {
        let cells = sheet(&[
            ("A1", Value::text("12")),
            ("A2", Value::Boolean(true)),
            ("A3", Value::text("twelve")),
        ]);
        assert_eq!(eval_with(&cells, "=A1+1"), Value::Number(13.0));
        assert_eq!(eval_with(&cells, "=A2*5"), Value::Number(5.0));
        assert_eq!(eval_with(&cells, "=B9+1"), Value::Number(1.0));
        assert_eq!(eval_with(&cells, "=A3+1"), Value::Error(CellError::Value));
        assert_eq!(eval("=\"x\"*2"), Value::Error(CellError::Value));
    }

    #[test]
    fn test_range_is_not_a_scalar() {
        let cells = sheet(&[("A1", Value::Number(1.0))]);
        assert_eq!(eval_with(&cells, "=A1:A2"), Value::Error(CellError::Value));
        assert_eq!(eval_with(&cells, "=A1:A2+1"), Value::Error(CellError::Value));
    }

    #[test]
    fn test_range_skips_empty_cells() {
        let cells = sheet(&[("B1", Value::Number(1.0)), ("B3", Value::Number(3.0))]);
        let ast = parse_formula("=B1:B3").unwrap();
        assert_eq!(
            evaluate(&ast, &EvaluationContext::with_cells(&cells)),
            Evaluated::List(vec![Value::Number(1.0), Value::Number(3.0)])
        );
    }

    #[test]
    fn test_range_arguments_flatten_positionally() {
        let cells = sheet(&[("B2", Value::Number(-4.0))]);
        // Blank cells vanish, so later arguments shift into their place
        assert_eq!(eval_with(&cells, "=IF(TRUE,C1:C2,9)"), Value::Number(9.0));
        assert_eq!(eval_with(&cells, "=ABS(B1:B3)"), Value::Number(4.0));
        assert_eq!(eval_with(&cells, "=ABS(C1:C3)"), Value::Error(CellError::Value));
    }

    #[test]
    fn test_function_dispatch() {
        let cells = sheet(&[("B1", Value::Number(1.0)), ("B3", Value::Number(3.0))]);
        assert_eq!(eval_with(&cells, "=SUM(B1:B3)"), Value::Number(4.0));
        assert_eq!(eval_with(&cells, "=SUM(B1:B3, 10)"), Value::Number(14.0));
        assert_eq!(eval("=NOPE(1)"), Value::Error(CellError::Name));
        assert_eq!(eval("=ABS(1,2)"), Value::Error(CellError::Value));
        assert_eq!(eval("=SUM(1,IF(TRUE,10,20),3)"), Value::Number(14.0));
    }

    #[test]
    fn test_deepest_accepted_formula_evaluates() {
        let depth = crate::parser::MAX_NESTING_DEPTH - 1;
        assert_eq!(eval(&format!("=0{}", "+1".repeat(depth))), Value::Number(depth as f64));

        let nested = format!("={}-2{}", "ABS(".repeat(depth - 2), ")".repeat(depth - 2));
        assert_eq!(eval(&nested), Value::Number(2.0));
    }

    #[test]
    fn test_overflow_is_value_error() {
        assert_eq!(eval("=1e308*10"), Value::Error(CellError::Value));
    }

    #[test]
    fn test_cell_on_stack_reads_as_circular() {
        let ctx = EvaluationContext::simple();
        let a1 = CellAddress::new(0, 0);

        let guard = ctx.enter(a1).unwrap();
        assert!(ctx.enter(a1).is_none());
        assert_eq!(ctx.cell_value(a1), Value::Error(CellError::Circular));
        assert_eq!(ctx.depth(), 1);
        drop(guard);

        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.cell_value(a1), Value::Empty);
    }
}

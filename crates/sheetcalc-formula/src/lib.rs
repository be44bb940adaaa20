//! # sheetcalc-formula
//!
//! Formula parser and evaluator for sheetcalc.
//!
//! This crate provides:
//! - Formula tokenizing and parsing (text → AST)
//! - Formula evaluation (AST → value)
//! - The built-in function table
//! - Dependency tracking with cycle detection and recalculation order
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_formula::{evaluate_scalar, parse_formula, EvaluationContext};
//! use sheetcalc_core::Value;
//!
//! let ast = parse_formula("=ROUND(SQRT(2)*10, 1)").unwrap();
//! let result = evaluate_scalar(&ast, &EvaluationContext::simple());
//! assert_eq!(result, Value::Number(14.1));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod tokenizer;

pub use ast::{BinaryOperator, Expr};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    compare_values, evaluate, evaluate_scalar, CellResolver, EmptyAggregate, EvalOptions,
    Evaluated, EvaluationContext, EvaluationGuard, NoCells,
};
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry};
pub use parser::{parse_formula, MAX_NESTING_DEPTH};
pub use tokenizer::{tokenize, Token};

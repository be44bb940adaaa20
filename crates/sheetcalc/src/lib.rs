//! # sheetcalc
//!
//! An incremental spreadsheet formula engine.
//!
//! Cells hold plain values or formulas. Writing a cell re-parses its formula,
//! replaces its dependency edges, rejects circular references, and marks every
//! cell that reads it dirty. Reading a dirty formula evaluates it on demand
//! and caches the result.
//!
//! ## Features
//!
//! - Formula language with arithmetic, comparisons, ranges, and built-in
//!   aggregate, logical, numeric and text functions
//! - Dependency graph with cycle rejection at write time
//! - Lazy, incremental recalculation
//! - Shared-read / exclusive-write concurrency (`Spreadsheet` is `Send + Sync`)
//! - Cell snapshots for undo/redo and an advisory lock table for
//!   collaborative editing
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let sheet = Spreadsheet::new();
//! sheet.set_cell_a1("B1", 1).unwrap();
//! sheet.set_cell_a1("B2", "").unwrap();
//! sheet.set_cell_a1("B3", 3).unwrap();
//! sheet.set_cell_a1("A1", "=SUM(B1:B3)").unwrap();
//! assert_eq!(sheet.get_cell_value_a1("A1").unwrap(), Value::Number(4.0));
//!
//! // Closing a cycle is rejected
//! sheet.set_cell_a1("B1", "=A1+1").unwrap();
//! assert_eq!(
//!     sheet.get_cell_value_a1("B1").unwrap(),
//!     Value::Error(CellError::Circular)
//! );
//! ```

pub mod cell;
pub mod error;
pub mod locks;
pub mod options;
pub mod prelude;
pub mod sheet;
pub mod snapshot;

pub use cell::{Cell, CellInput, FormulaCell};
pub use error::{Error, Result};
pub use locks::{AdvisoryLocks, CellLockQuery};
pub use options::{EngineOptions, DEFAULT_MAX_FORMULA_LEN, DEFAULT_MAX_REFERENCED_CELLS};
pub use sheet::Spreadsheet;
pub use snapshot::{CellSnapshot, SnapshotContent};

// Re-export core types
pub use sheetcalc_core::{CellAddress, CellError, CellRange, Value, MAX_COLS, MAX_ROWS};

// Re-export formula types
pub use sheetcalc_formula::{
    parse_formula, DependencyGraph, EmptyAggregate, Expr, FormulaError, FunctionRegistry,
};

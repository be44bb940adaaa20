//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the fundamental types used throughout sheetcalc:
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges in A1 notation
//! - [`Value`] - Scalar values held by cells and produced by formulas
//! - [`CellError`] - The closed set of error sentinels
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellAddress, CellRange, Value};
//!
//! let addr: CellAddress = "B12".parse().unwrap();
//! assert_eq!((addr.row, addr.col), (11, 1));
//!
//! let range = CellRange::parse("A1:B2").unwrap();
//! assert_eq!(range.cells().count(), 4);
//!
//! assert_eq!(Value::text("7").coerce_number(), Some(7.0));
//! ```

pub mod cell;
pub mod error;

pub use cell::{CellAddress, CellError, CellRange, CellRangeIterator, Value};
pub use error::{Error, Result};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;

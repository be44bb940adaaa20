//! Cell-related types and utilities
//!
//! This module contains:
//! - [`Value`] - The scalar value held by a cell
//! - [`CellError`] - Error sentinels that travel as values
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangle of cells (e.g., "A1:B10")

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use value::{CellError, Value};

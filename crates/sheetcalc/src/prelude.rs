//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Collaboration hooks
    AdvisoryLocks,
    // Cell types
    CellAddress,
    CellError,
    CellInput,
    CellLockQuery,
    CellRange,
    // Undo/redo hooks
    CellSnapshot,
    // Configuration
    EmptyAggregate,
    EngineOptions,
    // Error types
    Error,
    Result,
    SnapshotContent,
    // Main type
    Spreadsheet,
    Value,
};

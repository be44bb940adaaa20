//! Engine configuration

use sheetcalc_formula::{EmptyAggregate, EvalOptions};

/// Default cap on formula source length, in bytes
pub const DEFAULT_MAX_FORMULA_LEN: usize = 8192;

/// Default cap on the number of cells one formula may reference
pub const DEFAULT_MAX_REFERENCED_CELLS: u64 = 1 << 20;

/// Options for a [`Spreadsheet`](crate::Spreadsheet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Result of AVERAGE over an argument list with no numbers
    pub empty_average: EmptyAggregate,
    /// Formulas longer than this are stored as `#ERROR!` without parsing
    pub max_formula_len: usize,
    /// Formulas whose references cover more cells than this are stored as
    /// `#REF!` without installing any dependency edges
    pub max_referenced_cells: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            empty_average: EmptyAggregate::Zero,
            max_formula_len: DEFAULT_MAX_FORMULA_LEN,
            max_referenced_cells: DEFAULT_MAX_REFERENCED_CELLS,
        }
    }
}

impl EngineOptions {
    /// The subset of options the evaluator sees
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            empty_average: self.empty_average,
        }
    }
}

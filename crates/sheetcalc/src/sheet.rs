//! The recalculation engine
//!
//! [`Spreadsheet`] owns the cell store and the dependency graph behind one
//! read-write lock. A write takes the exclusive lock for the whole update
//! (parse, edge replacement, cycle check, dirty marking); reads share the lock
//! and evaluate dirty formulas lazily.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let sheet = Spreadsheet::new();
//! sheet.set_cell_a1("A1", 10).unwrap();
//! sheet.set_cell_a1("A2", "=A1+5").unwrap();
//! sheet.set_cell_a1("A3", "=A2*2").unwrap();
//! assert_eq!(sheet.get_cell_value_a1("A3").unwrap(), Value::Number(30.0));
//!
//! sheet.set_cell_a1("A1", 20).unwrap();
//! assert_eq!(sheet.get_cell_value_a1("A3").unwrap(), Value::Number(50.0));
//! ```

use crate::cell::{Cell, CellInput, FormulaCell};
use crate::error::Result;
use crate::options::EngineOptions;
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use sheetcalc_core::{CellAddress, CellError, Value};
use sheetcalc_formula::{
    parse_formula, CellResolver, DependencyGraph, EvaluationContext, FunctionRegistry,
};
use tracing::{debug, trace, warn};

/// A single sheet of cells with incremental recalculation
#[derive(Debug, Default)]
pub struct Spreadsheet {
    state: RwLock<SheetState>,
    options: EngineOptions,
}

/// Everything guarded by the sheet lock
#[derive(Debug, Default)]
pub(crate) struct SheetState {
    cells: AHashMap<CellAddress, Cell>,
    graph: DependencyGraph,
}

impl Spreadsheet {
    /// Create an empty sheet with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sheet with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            state: RwLock::new(SheetState::default()),
            options,
        }
    }

    /// The options this sheet was created with
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // === Writes ===

    /// Write a value or formula into a cell
    ///
    /// Never fails: a rejected formula is stored as an error value. Unparsable
    /// or over-long text reads `#ERROR!`, too many referenced cells `#REF!`,
    /// and a formula that would close a cycle `#CIRC!`. Every cell
    /// that reads `address` is marked dirty; nothing is recomputed eagerly.
    pub fn set_cell(&self, address: CellAddress, input: impl Into<CellInput>) {
        let input = input.into();
        let mut state = self.state.write();

        match input {
            CellInput::Empty => {
                debug!(cell = %address, "clearing cell");
                state.graph.clear_dependencies(address);
                state.cells.remove(&address);
            }
            CellInput::Value(value) => {
                debug!(cell = %address, kind = value.type_name(), "writing value");
                state.graph.clear_dependencies(address);
                state.cells.insert(address, Cell::Value(value));
            }
            CellInput::Formula(source) => {
                debug!(cell = %address, formula = %source, "writing formula");
                state.install_formula(address, source, &self.options);
            }
        }

        state.mark_dependents_dirty(address);
    }

    /// Write into a cell given in A1 notation
    pub fn set_cell_a1(&self, address: &str, input: impl Into<CellInput>) -> Result<()> {
        let address = CellAddress::parse(address)?;
        self.set_cell(address, input);
        Ok(())
    }

    /// Clear a cell (same as writing an empty input)
    pub fn clear_cell(&self, address: CellAddress) {
        self.set_cell(address, CellInput::Empty);
    }

    /// Mark every formula dirty so the next reads re-evaluate from scratch
    pub fn recalculate_all(&self) {
        let state = self.state.write();
        let mut count = 0;
        for cell in state.cells.values() {
            if let Cell::Formula(formula) = cell {
                formula.mark_dirty();
                count += 1;
            }
        }
        debug!(formulas = count, "marked all formulas dirty");
    }

    // === Reads ===

    /// Current value of a cell, evaluating stale formulas as needed
    pub fn get_cell_value(&self, address: CellAddress) -> Value {
        let state = self.state.read();
        state.refresh_precedents(address, &self.options);

        let ctx = state.context(&self.options);
        ctx.cell_value(address)
    }

    /// Current value of a cell given in A1 notation
    pub fn get_cell_value_a1(&self, address: &str) -> Result<Value> {
        let address = CellAddress::parse(address)?;
        Ok(self.get_cell_value(address))
    }

    /// Formula source of a cell, including rejected formulas
    pub fn formula_text(&self, address: CellAddress) -> Option<String> {
        let state = self.state.read();
        state
            .cells
            .get(&address)
            .and_then(Cell::formula_text)
            .map(str::to_string)
    }

    /// The text a user would see when editing the cell
    pub fn cell_input(&self, address: CellAddress) -> String {
        let state = self.state.read();
        match state.cells.get(&address) {
            None => String::new(),
            Some(Cell::Value(value)) => value.display_text(),
            Some(Cell::Formula(formula)) => formula.source().to_string(),
            Some(Cell::Rejected { source, .. }) => source.clone(),
        }
    }

    /// Cells the formula at `address` reads directly, sorted
    pub fn dependencies_of(&self, address: CellAddress) -> Vec<CellAddress> {
        let state = self.state.read();
        let mut deps: Vec<_> = state.graph.dependencies(address).collect();
        deps.sort_unstable();
        deps
    }

    /// Formula cells that read `address` directly, sorted
    pub fn dependents_of(&self, address: CellAddress) -> Vec<CellAddress> {
        let state = self.state.read();
        let mut deps: Vec<_> = state.graph.dependents(address).collect();
        deps.sort_unstable();
        deps
    }

    /// Addresses of accepted formula cells, sorted
    pub fn formula_cells(&self) -> Vec<CellAddress> {
        let state = self.state.read();
        let mut cells: Vec<_> = state
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(&addr, _)| addr)
            .collect();
        cells.sort_unstable();
        cells
    }

    /// Addresses of all non-empty cells, sorted
    pub fn used_addresses(&self) -> Vec<CellAddress> {
        let state = self.state.read();
        let mut cells: Vec<_> = state.cells.keys().copied().collect();
        cells.sort_unstable();
        cells
    }

    /// Check if a formula cell's cached value is stale
    ///
    /// Always false for non-formula cells.
    pub fn is_dirty(&self, address: CellAddress) -> bool {
        let state = self.state.read();
        matches!(state.cells.get(&address), Some(Cell::Formula(f)) if f.is_dirty())
    }

    /// Check that the dependency graph matches the stored formulas
    pub fn is_graph_consistent(&self) -> bool {
        let state = self.state.read();
        if !state.graph.is_consistent() {
            return false;
        }

        let formulas_match = state.cells.iter().all(|(&addr, cell)| {
            let mut edges: Vec<_> = state.graph.dependencies(addr).collect();
            edges.sort_unstable();
            match cell {
                Cell::Formula(f) => edges == f.dependencies(),
                _ => edges.is_empty(),
            }
        });
        let no_orphan_edges = state.graph.len()
            == state
                .cells
                .values()
                .filter(|c| matches!(c, Cell::Formula(f) if !f.dependencies().is_empty()))
                .count();

        formulas_match && no_orphan_edges
    }

    /// Number of non-empty cells
    pub fn len(&self) -> usize {
        self.state.read().cells.len()
    }

    /// Check if the sheet has no cells
    pub fn is_empty(&self) -> bool {
        self.state.read().cells.is_empty()
    }

    pub(crate) fn read_state(&self) -> parking_lot::RwLockReadGuard<'_, SheetState> {
        self.state.read()
    }
}

impl SheetState {
    pub(crate) fn cell(&self, address: CellAddress) -> Option<&Cell> {
        self.cells.get(&address)
    }

    fn context<'a>(&'a self, options: &EngineOptions) -> EvaluationContext<'a> {
        EvaluationContext::new(self, FunctionRegistry::builtin(), options.eval_options())
    }

    /// Parse, cycle-check and store a formula
    fn install_formula(&mut self, address: CellAddress, source: String, options: &EngineOptions) {
        if source.len() > options.max_formula_len {
            warn!(
                cell = %address,
                len = source.len(),
                max = options.max_formula_len,
                "formula too long"
            );
            self.reject(address, source, CellError::Formula);
            return;
        }

        let expr = match parse_formula(&source) {
            Ok(expr) => expr,
            Err(e) => {
                warn!(cell = %address, formula = %source, error = %e, "formula failed to parse");
                self.reject(address, source, CellError::Formula);
                return;
            }
        };

        let referenced = expr.referenced_cell_count();
        if referenced > options.max_referenced_cells {
            warn!(
                cell = %address,
                referenced,
                max = options.max_referenced_cells,
                "formula references too many cells"
            );
            self.reject(address, source, CellError::Ref);
            return;
        }

        self.graph
            .set_dependencies(address, expr.dependencies().into_iter());

        if let Some(path) = self.graph.find_cycle(address) {
            let path: Vec<String> = path.iter().map(CellAddress::to_a1_string).collect();
            warn!(cell = %address, cycle = %path.join(" -> "), "circular reference rejected");
            self.reject(address, source, CellError::Circular);
            return;
        }

        self.cells
            .insert(address, Cell::Formula(FormulaCell::new(source, expr)));
    }

    /// Store rejected formula text as an error value with no edges
    fn reject(&mut self, address: CellAddress, source: String, error: CellError) {
        self.graph.clear_dependencies(address);
        self.cells
            .insert(address, Cell::Rejected { source, error });
    }

    /// Mark every formula that (transitively) reads `address` dirty,
    /// in evaluation order
    fn mark_dependents_dirty(&self, address: CellAddress) {
        let order = self.graph.recalc_order(address);
        for cell in &order {
            if let Some(Cell::Formula(formula)) = self.cells.get(cell) {
                formula.mark_dirty();
            }
        }
        trace!(cell = %address, dirty = order.len(), "marked dependents dirty");
    }

    /// Evaluate the stale formulas `address` depends on, leaves first
    ///
    /// Each formula then finds its inputs already cached, which keeps
    /// evaluation shallow on long reference chains. A clean formula only ever
    /// reads clean formulas, so the search stops at the first clean cell.
    fn refresh_precedents(&self, address: CellAddress, options: &EngineOptions) {
        if !self.is_dirty_formula(address) {
            return;
        }

        let mut stale = AHashSet::new();
        let mut stack = vec![address];
        while let Some(current) = stack.pop() {
            for dep in self.graph.dependencies(current) {
                if self.is_dirty_formula(dep) && stale.insert(dep) {
                    stack.push(dep);
                }
            }
        }
        if stale.is_empty() {
            return;
        }

        trace!(cell = %address, stale = stale.len(), "refreshing precedents");
        for cell in self.graph.topological_order(&stale) {
            let ctx = self.context(options);
            ctx.cell_value(cell);
        }
    }

    fn is_dirty_formula(&self, address: CellAddress) -> bool {
        matches!(self.cells.get(&address), Some(Cell::Formula(f)) if f.is_dirty())
    }
}

impl CellResolver for SheetState {
    fn resolve(&self, address: CellAddress, ctx: &EvaluationContext<'_>) -> Value {
        match self.cells.get(&address) {
            None => Value::Empty,
            Some(Cell::Value(value)) => value.clone(),
            Some(Cell::Formula(formula)) => formula.value(address, ctx),
            Some(Cell::Rejected { error, .. }) => Value::Error(*error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_values_and_formulas() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), 10.0);
        sheet.set_cell(a("A2"), "=A1*2");

        assert_eq!(sheet.get_cell_value(a("A1")), Value::Number(10.0));
        assert_eq!(sheet.get_cell_value(a("A2")), Value::Number(20.0));
        assert_eq!(sheet.get_cell_value(a("Z99")), Value::Empty);
    }

    #[test]
    fn test_writes_mark_dependents_dirty_without_evaluating() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), 1);
        sheet.set_cell(a("B1"), "=A1+1");
        sheet.set_cell(a("C1"), "=B1+1");

        assert!(sheet.is_dirty(a("C1")));
        assert_eq!(sheet.get_cell_value(a("C1")), Value::Number(3.0));
        assert!(!sheet.is_dirty(a("B1")));
        assert!(!sheet.is_dirty(a("C1")));

        sheet.set_cell(a("A1"), 5);
        assert!(sheet.is_dirty(a("B1")));
        assert!(sheet.is_dirty(a("C1")));
        assert_eq!(sheet.get_cell_value(a("C1")), Value::Number(7.0));
    }

    #[test]
    fn test_parse_failure_stores_error() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("B1"), "=A1+1");
        sheet.set_cell(a("A1"), "=1+");

        assert_eq!(sheet.get_cell_value(a("A1")), Value::Error(CellError::Formula));
        assert_eq!(sheet.get_cell_value(a("B1")), Value::Error(CellError::Formula));
        assert_eq!(sheet.formula_text(a("A1")), Some("=1+".to_string()));
        assert!(sheet.formula_cells().iter().all(|&c| c != a("A1")));
        assert!(sheet.is_graph_consistent());
    }

    #[test]
    fn test_parse_failure_drops_old_edges() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("B1"), "=A1+1");
        assert_eq!(sheet.dependents_of(a("A1")), vec![a("B1")]);

        sheet.set_cell(a("B1"), "=A1+");
        assert!(sheet.dependents_of(a("A1")).is_empty());
        assert!(sheet.is_graph_consistent());
    }

    #[test]
    fn test_formula_too_long() {
        let options = EngineOptions {
            max_formula_len: 8,
            ..Default::default()
        };
        let sheet = Spreadsheet::with_options(options);
        sheet.set_cell(a("A1"), "=1+2");
        sheet.set_cell(a("A2"), "=1+2+3+4+5");

        assert_eq!(sheet.get_cell_value(a("A1")), Value::Number(3.0));
        assert_eq!(sheet.get_cell_value(a("A2")), Value::Error(CellError::Formula));
    }

    #[test]
    fn test_oversized_range_rejected() {
        let options = EngineOptions {
            max_referenced_cells: 100,
            ..Default::default()
        };
        let sheet = Spreadsheet::with_options(options);
        sheet.set_cell(a("A1"), "=SUM(B1:B100)");
        sheet.set_cell(a("A2"), "=SUM(B1:C100)");

        assert_eq!(sheet.get_cell_value(a("A1")), Value::Number(0.0));
        assert_eq!(sheet.get_cell_value(a("A2")), Value::Error(CellError::Ref));
        assert!(sheet.dependencies_of(a("A2")).is_empty());
        assert!(sheet.is_graph_consistent());
    }

    #[test]
    fn test_self_reference_rejected() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), "=A1+1");

        assert_eq!(sheet.get_cell_value(a("A1")), Value::Error(CellError::Circular));
        assert!(sheet.dependencies_of(a("A1")).is_empty());
        assert!(sheet.is_graph_consistent());
    }

    #[test]
    fn test_clear_cell() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), 3);
        sheet.set_cell(a("B1"), "=A1*2");
        assert_eq!(sheet.get_cell_value(a("B1")), Value::Number(6.0));

        sheet.clear_cell(a("A1"));
        assert_eq!(sheet.get_cell_value(a("A1")), Value::Empty);
        assert_eq!(sheet.get_cell_value(a("B1")), Value::Number(0.0));
        assert_eq!(sheet.used_addresses(), vec![a("B1")]);
        // B1 still reads A1
        assert_eq!(sheet.dependents_of(a("A1")), vec![a("B1")]);
    }

    #[test]
    fn test_replacing_formula_with_value_drops_edges() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("B1"), "=A1");
        sheet.set_cell(a("B1"), 4);

        assert!(sheet.dependencies_of(a("B1")).is_empty());
        assert!(sheet.dependents_of(a("A1")).is_empty());
        assert!(sheet.formula_cells().is_empty());
        assert!(sheet.is_graph_consistent());
    }

    #[test]
    fn test_cell_input() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), 2.5);
        sheet.set_cell(a("A2"), "=A1 * 2");
        sheet.set_cell(a("A3"), "=(");

        assert_eq!(sheet.cell_input(a("A1")), "2.5");
        assert_eq!(sheet.cell_input(a("A2")), "=A1 * 2");
        assert_eq!(sheet.cell_input(a("A3")), "=(");
        assert_eq!(sheet.cell_input(a("A4")), "");
        assert_eq!(sheet.formula_text(a("A1")), None);
    }

    #[test]
    fn test_recalculate_all() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), "=1+1");
        sheet.set_cell(a("A2"), "=A1*3");
        assert_eq!(sheet.get_cell_value(a("A2")), Value::Number(6.0));

        sheet.recalculate_all();
        assert!(sheet.is_dirty(a("A1")));
        assert!(sheet.is_dirty(a("A2")));
        assert_eq!(sheet.get_cell_value(a("A2")), Value::Number(6.0));
    }

    #[test]
    fn test_reading_refreshes_stale_precedents() {
        let sheet = Spreadsheet::new();
        sheet.set_cell(a("A1"), 1);
        for row in 1..200u32 {
            let formula = format!("=A{}+1", row);
            sheet.set_cell(CellAddress::new(row, 0), formula.as_str());
        }

        assert_eq!(sheet.get_cell_value(a("A200")), Value::Number(200.0));
        assert!(!sheet.is_dirty(a("A100")));
    }

    #[test]
    fn test_a1_api() {
        let sheet = Spreadsheet::new();
        sheet.set_cell_a1("B12", 1).unwrap();
        assert_eq!(sheet.get_cell_value_a1("b12").unwrap(), Value::Number(1.0));
        assert!(sheet.set_cell_a1("12B", 1).is_err());
        assert!(sheet.get_cell_value_a1("").is_err());
        assert_eq!(sheet.len(), 1);
        assert!(!sheet.is_empty());
    }
}

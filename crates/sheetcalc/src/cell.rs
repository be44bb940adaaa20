//! Cell input and stored cell variants

use parking_lot::Mutex;
use sheetcalc_core::{CellAddress, CellError, Value};
use sheetcalc_formula::{evaluate_scalar, EvaluationContext, Expr};

/// What a user writes into a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    /// Clear the cell
    Empty,
    /// A plain value
    Value(Value),
    /// Formula source text, starting with `=`
    Formula(String),
}

impl CellInput {
    /// Interpret typed text the way a grid editor does
    ///
    /// Blank text clears the cell, text starting with `=` is a formula,
    /// numeric text is a number and `TRUE`/`FALSE` (any case) is a boolean.
    /// Anything else is stored as text.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellInput::Empty;
        }
        if trimmed.starts_with('=') {
            return CellInput::Formula(trimmed.to_string());
        }
        if let Some(n) = trimmed.parse::<f64>().ok().filter(|n| n.is_finite()) {
            return CellInput::Value(Value::Number(n));
        }
        if trimmed.eq_ignore_ascii_case("TRUE") {
            return CellInput::Value(Value::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return CellInput::Value(Value::Boolean(false));
        }
        CellInput::Value(Value::Text(text.to_string()))
    }

    /// Build a formula input, adding the leading `=` if it is missing
    pub fn formula(source: impl Into<String>) -> Self {
        let source = source.into();
        let trimmed = source.trim();
        if trimmed.starts_with('=') {
            CellInput::Formula(trimmed.to_string())
        } else {
            CellInput::Formula(format!("={}", trimmed))
        }
    }
}

impl From<&str> for CellInput {
    fn from(text: &str) -> Self {
        CellInput::parse(text)
    }
}

impl From<String> for CellInput {
    fn from(text: String) -> Self {
        CellInput::parse(&text)
    }
}

impl From<f64> for CellInput {
    fn from(n: f64) -> Self {
        CellInput::Value(Value::Number(n))
    }
}

impl From<i32> for CellInput {
    fn from(n: i32) -> Self {
        CellInput::Value(Value::Number(n as f64))
    }
}

impl From<bool> for CellInput {
    fn from(b: bool) -> Self {
        CellInput::Value(Value::Boolean(b))
    }
}

impl From<Value> for CellInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Empty => CellInput::Empty,
            value => CellInput::Value(value),
        }
    }
}

/// A stored cell
#[derive(Debug)]
pub enum Cell {
    /// Plain value
    Value(Value),
    /// Formula with its cached result
    Formula(FormulaCell),
    /// Formula text that was rejected: unparsable, oversized, or closing a cycle
    ///
    /// Behaves like a plain error value and has no dependency edges.
    Rejected { source: String, error: CellError },
}

impl Cell {
    /// The formula source, if the cell was written as a formula
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            Cell::Value(_) => None,
            Cell::Formula(f) => Some(f.source()),
            Cell::Rejected { source, .. } => Some(source),
        }
    }

    /// Check if this is an accepted formula cell
    pub fn is_formula(&self) -> bool {
        matches!(self, Cell::Formula(_))
    }
}

/// Cached formula result
#[derive(Debug)]
struct CachedValue {
    value: Value,
    dirty: bool,
}

/// An accepted formula: source, parsed tree, and lazily computed value
#[derive(Debug)]
pub struct FormulaCell {
    source: String,
    expr: Expr,
    dependencies: Vec<CellAddress>,
    cache: Mutex<CachedValue>,
}

impl FormulaCell {
    /// Create a formula cell that has not been evaluated yet
    pub(crate) fn new(source: String, expr: Expr) -> Self {
        let mut dependencies: Vec<_> = expr.dependencies().into_iter().collect();
        dependencies.sort_unstable();

        Self {
            source,
            expr,
            dependencies,
            cache: Mutex::new(CachedValue {
                value: Value::Empty,
                dirty: true,
            }),
        }
    }

    /// Formula source text, including the leading `=`
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Cells the formula reads, sorted
    pub fn dependencies(&self) -> &[CellAddress] {
        &self.dependencies
    }

    /// Check if the cached value is stale
    pub fn is_dirty(&self) -> bool {
        self.cache.lock().dirty
    }

    pub(crate) fn mark_dirty(&self) {
        self.cache.lock().dirty = true;
    }

    /// Current value, evaluating first if the cache is stale
    ///
    /// The cache lock is released while evaluating, so nested reads of other
    /// cells never wait on it.
    pub(crate) fn value(&self, address: CellAddress, ctx: &EvaluationContext<'_>) -> Value {
        let cached = {
            let cache = self.cache.lock();
            (!cache.dirty).then(|| cache.value.clone())
        };
        if let Some(value) = cached {
            return value;
        }

        let Some(_guard) = ctx.enter(address) else {
            return Value::Error(CellError::Circular);
        };

        tracing::trace!(cell = %address, depth = ctx.depth(), "evaluating formula");
        let value = evaluate_scalar(&self.expr, ctx);

        let mut cache = self.cache.lock();
        cache.value = value.clone();
        cache.dirty = false;
        value
    }
}

//! Formula Abstract Syntax Tree types

use ahash::AHashSet;
use sheetcalc_core::{CellAddress, CellRange, Value};
use std::fmt;

/// Formula expression AST
///
/// Built once by the parser and never mutated; a re-parse builds a new tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, text or boolean literal
    Literal(Value),

    /// Single cell reference
    CellRef(CellAddress),

    /// Rectangular range reference
    Range(CellRange),

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call
    FunctionCall { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Build a binary operation node
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Every cell this expression reads, ranges expanded cell by cell
    pub fn dependencies(&self) -> AHashSet<CellAddress> {
        let mut deps = AHashSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    /// Number of cell references, counting every cell of each range
    ///
    /// Cheap to compute without expanding ranges; overlapping references are
    /// counted more than once.
    pub fn referenced_cell_count(&self) -> u64 {
        match self {
            Expr::Literal(_) => 0,
            Expr::CellRef(_) => 1,
            Expr::Range(range) => range.cell_count(),
            Expr::BinaryOp { left, right, .. } => {
                left.referenced_cell_count() + right.referenced_cell_count()
            }
            Expr::FunctionCall { args, .. } => {
                args.iter().map(Expr::referenced_cell_count).sum()
            }
        }
    }

    fn collect_dependencies(&self, deps: &mut AHashSet<CellAddress>) {
        match self {
            Expr::Literal(_) => {}
            Expr::CellRef(addr) => {
                deps.insert(*addr);
            }
            Expr::Range(range) => deps.extend(range.cells()),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_dependencies(deps);
                right.collect_dependencies(deps);
            }
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_dependencies(deps);
                }
            }
        }
    }
}

/// Renders the expression back to formula text (without the leading `=`),
/// fully parenthesizing nested operations.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::CellRef(addr) => write!(f, "{}", addr),
            Expr::Range(range) => write!(f, "{}", range),
            Expr::BinaryOp { op, left, right } => write!(f, "({}{}{})", left, op, right),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }

    /// Operator symbol as written in formulas
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

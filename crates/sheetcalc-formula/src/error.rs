//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while turning formula text into an expression tree
///
/// Evaluation never produces these: evaluation problems are
/// [`CellError`](sheetcalc_core::CellError) values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// A character the tokenizer does not recognize
    #[error("Unexpected character '{found}' at position {position}")]
    Lex { position: usize, found: char },

    /// A string literal without its closing quote
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    /// A malformed number or cell reference
    #[error("Invalid token '{text}' at position {position}")]
    InvalidToken { position: usize, text: String },

    /// Well-formed tokens in an order the grammar does not allow
    #[error("Parse error: {0}")]
    Parse(String),

    /// Brackets, signs, calls or operator chains nested past the limit
    #[error("Formula nested deeper than {0} levels")]
    TooDeep(usize),

    /// Input ended in the middle of an expression
    #[error("Unexpected end of formula")]
    UnexpectedEnd,
}

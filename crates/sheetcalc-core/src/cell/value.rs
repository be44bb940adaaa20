//! Scalar value types

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A scalar value held by a cell or produced by a formula
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Numeric value
    Number(f64),

    /// Text value
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Error sentinel (#DIV/0!, #CIRC!, ...)
    Error(CellError),
}

impl Value {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Get the error if this is one
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// The number held by this value, without any coercion
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Coerce to a number the way arithmetic operators do
    ///
    /// Booleans become 1/0, empty becomes 0 and text is parsed after trimming.
    /// Errors and non-numeric text do not coerce.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            Value::Empty => Some(0.0),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Value::Error(_) => None,
        }
    }

    /// Coerce to a boolean the way logical functions do
    ///
    /// Returns `Err` with the error to report when the value has no truth value.
    pub fn coerce_bool(&self) -> std::result::Result<bool, CellError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Empty => Ok(false),
            Value::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
            Value::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
            Value::Text(_) => Err(CellError::Value),
            Value::Error(e) => Err(*e),
        }
    }

    /// Display text, as CONCAT and the CLI render it
    pub fn display_text(&self) -> String {
        self.to_string()
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Error(_) => "error",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<CellError> for Value {
    fn from(e: CellError) -> Self {
        Value::Error(e)
    }
}

/// Error sentinels produced by evaluation
///
/// These are ordinary values: they are stored in cells and flow through
/// operators and functions instead of aborting a recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellError {
    /// #DIV/0! - Division by zero
    Div0,
    /// #NAME? - Unrecognized function name
    Name,
    /// #REF! - Invalid cell reference
    Ref,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #CIRC! - Circular reference
    Circular,
    /// #ERROR! - Formula could not be parsed
    Formula,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::Name => "#NAME?",
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
            CellError::Circular => "#CIRC!",
            CellError::Formula => "#ERROR!",
        }
    }

    /// Parse an error sentinel such as `#DIV/0!` (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#DIV/0!" => Ok(CellError::Div0),
            "#NAME?" => Ok(CellError::Name),
            "#REF!" => Ok(CellError::Ref),
            "#VALUE!" => Ok(CellError::Value),
            "#CIRC!" => Ok(CellError::Circular),
            "#ERROR!" => Ok(CellError::Formula),
            _ => Err(Error::InvalidErrorValue(s.to_string())),
        }
    }
}

impl FromStr for CellError {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42), Value::Number(42.0));
        assert_eq!(Value::from(3.5), Value::Number(3.5));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from("hello"), Value::Text("hello".into()));
        assert_eq!(Value::from(CellError::Div0), Value::Error(CellError::Div0));
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(Value::Number(2.5).coerce_number(), Some(2.5));
        assert_eq!(Value::Boolean(true).coerce_number(), Some(1.0));
        assert_eq!(Value::Empty.coerce_number(), Some(0.0));
        assert_eq!(Value::text(" 12 ").coerce_number(), Some(12.0));
        assert_eq!(Value::text("abc").coerce_number(), None);
        assert_eq!(Value::text("inf").coerce_number(), None);
        assert_eq!(Value::Error(CellError::Value).coerce_number(), None);
    }

    #[test]
    fn test_as_number_does_not_coerce() {
        assert_eq!(Value::Number(1.0).as_number(), Some(1.0));
        assert_eq!(Value::text("1").as_number(), None);
        assert_eq!(Value::Empty.as_number(), None);
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(Value::Number(0.0).coerce_bool(), Ok(false));
        assert_eq!(Value::Number(-2.0).coerce_bool(), Ok(true));
        assert_eq!(Value::text("true").coerce_bool(), Ok(true));
        assert_eq!(Value::Empty.coerce_bool(), Ok(false));
        assert_eq!(Value::text("maybe").coerce_bool(), Err(CellError::Value));
        assert_eq!(
            Value::Error(CellError::Div0).coerce_bool(),
            Err(CellError::Div0)
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Boolean(false).to_string(), "FALSE");
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::Error(CellError::Circular).to_string(), "#CIRC!");
    }

    #[test]
    fn test_cell_error_parse() {
        assert_eq!(CellError::parse("#DIV/0!"), Ok(CellError::Div0));
        assert_eq!(CellError::parse("#name?"), Ok(CellError::Name));
        assert_eq!("#CIRC!".parse::<CellError>(), Ok(CellError::Circular));
        assert_eq!(
            CellError::parse("invalid"),
            Err(Error::InvalidErrorValue("invalid".into()))
        );

        for error in [CellError::Div0, CellError::Ref, CellError::Formula] {
            assert_eq!(error.to_string().parse::<CellError>(), Ok(error));
        }
    }
}

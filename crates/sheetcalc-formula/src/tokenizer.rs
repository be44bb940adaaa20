//! Formula tokenizer
//!
//! Scans formula text left to right into a flat token stream. Range references
//! (`A1:B3`) are recognized here by looking ahead for a `:` after a cell
//! reference, so the parser never sees a bare colon.

use crate::error::{FormulaError, FormulaResult};
use sheetcalc_core::{CellAddress, CellRange};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Text(String),
    Boolean(bool),

    // References and names
    CellRef(CellAddress),
    Range(CellRange),
    /// Bare identifier, upper-cased (a function name when followed by `(`)
    Function(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,

    // End of input
    Eof,
}

/// Tokenize a formula body (without the leading `=`)
///
/// The returned stream always ends with [`Token::Eof`]. The first
/// unrecognized character aborts tokenization.
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();

    loop {
        let token = tokenizer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Equal),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match c {
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::LessEqual)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::NotEqual)
                    }
                    _ => Ok(Token::LessThan),
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Ok(Token::GreaterEqual)
                } else {
                    Ok(Token::GreaterThan)
                }
            }
            '"' => self.scan_text(),
            c if c.is_ascii_digit() => self.scan_number(),
            '.' if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '$' || c == '_' => self.scan_word(),
            found => Err(FormulaError::Lex {
                position: self.pos,
                found,
            }),
        }
    }

    fn scan_text(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance();

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::Text(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(FormulaError::UnterminatedString(start)),
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Only treat 'e' as an exponent when digits follow it
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self
                .peek_char_at(digits_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Token::Number)
            .ok_or_else(|| FormulaError::InvalidToken {
                position: start,
                text: text.to_string(),
            })
    }

    fn scan_word(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        let word = self.take_word();

        if self.peek_char() == Some('(') || !Self::is_cell_reference(word) {
            if word.contains('$') {
                return Err(FormulaError::InvalidToken {
                    position: start,
                    text: word.to_string(),
                });
            }

            let upper = word.to_ascii_uppercase();
            if self.peek_char() != Some('(') {
                match upper.as_str() {
                    "TRUE" => return Ok(Token::Boolean(true)),
                    "FALSE" => return Ok(Token::Boolean(false)),
                    _ => {}
                }
            }
            return Ok(Token::Function(upper));
        }

        let first = Self::address(word, start)?;

        // Range look-ahead
        if self.peek_char() != Some(':') {
            return Ok(Token::CellRef(first));
        }
        self.advance();

        let second_start = self.pos;
        let second = self.take_word();
        if !Self::is_cell_reference(second) {
            return Err(FormulaError::InvalidToken {
                position: start,
                text: self.input[start..self.pos].to_string(),
            });
        }
        let second = Self::address(second, second_start)?;

        Ok(Token::Range(CellRange::new(first, second)))
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
        {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn address(text: &str, position: usize) -> FormulaResult<CellAddress> {
        CellAddress::parse(text).map_err(|_| FormulaError::InvalidToken {
            position,
            text: text.to_string(),
        })
    }

    /// `[$]LETTERS[$]DIGITS`, nothing else
    fn is_cell_reference(text: &str) -> bool {
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let letters = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letters {
            return false;
        }

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let digits = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        i > digits && i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            tokenize("A1 + 2.5*B2").unwrap(),
            vec![
                Token::CellRef(addr("A1")),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::CellRef(addr("B2")),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_comparison_operators() {
        assert_eq!(
            tokenize("< <= <> > >= =").unwrap(),
            vec![
                Token::LessThan,
                Token::LessEqual,
                Token::NotEqual,
                Token::GreaterThan,
                Token::GreaterEqual,
                Token::Equal,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_range_by_lookahead() {
        assert_eq!(
            tokenize("SUM(B1:B3)").unwrap(),
            vec![
                Token::Function("SUM".into()),
                Token::LeftParen,
                Token::Range(CellRange::new(addr("B1"), addr("B3"))),
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_text_with_escaped_quote() {
        assert_eq!(
            tokenize("\"say \"\"hi\"\"\"").unwrap(),
            vec![Token::Text("say \"hi\"".into()), Token::Eof]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokenize("1e3 .5 7").unwrap(),
            vec![
                Token::Number(1000.0),
                Token::Number(0.5),
                Token::Number(7.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_function_name_that_looks_like_a_reference() {
        assert_eq!(
            tokenize("LOG10(1)").unwrap()[0],
            Token::Function("LOG10".into())
        );
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        assert_eq!(
            tokenize("sum(a1)").unwrap(),
            vec![
                Token::Function("SUM".into()),
                Token::LeftParen,
                Token::CellRef(addr("A1")),
                Token::RightParen,
                Token::Eof,
            ]
        );
        assert_eq!(tokenize("true").unwrap()[0], Token::Boolean(true));
    }

    #[test]
    fn test_absolute_markers_are_dropped() {
        assert_eq!(tokenize("$B$2").unwrap()[0], Token::CellRef(addr("B2")));
    }

    #[test]
    fn test_unrecognized_character_is_lexical_failure() {
        assert_eq!(
            tokenize("1 # 2"),
            Err(FormulaError::Lex {
                position: 2,
                found: '#'
            })
        );
        assert!(matches!(tokenize("A1&B1"), Err(FormulaError::Lex { .. })));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            tokenize("A1:"),
            Err(FormulaError::InvalidToken { .. })
        ));
        assert!(matches!(
            tokenize("A1:SUM"),
            Err(FormulaError::InvalidToken { .. })
        ));
        assert!(matches!(
            tokenize("A0"),
            Err(FormulaError::InvalidToken { .. })
        ));
        assert!(matches!(
            tokenize("1e999"),
            Err(FormulaError::InvalidToken { .. })
        ));
        assert_eq!(
            tokenize("\"open"),
            Err(FormulaError::UnterminatedString(0))
        );
    }
}

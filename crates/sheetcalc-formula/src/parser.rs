//! Formula parser
//!
//! A recursive descent parser over the token stream, weakest-binding rule first:
//!
//! ```text
//! comparison := expression ( (">"|"<"|">="|"<="|"="|"<>") expression )*
//! expression := term ( ("+"|"-") term )*
//! term       := factor ( ("*"|"/"|"%") factor )*
//! factor     := NUMBER | STRING | BOOLEAN | CELL_REF | RANGE
//!             | FUNCTION "(" [ comparison ("," comparison)* ] ")"
//!             | "(" comparison ")"
//!             | ("+"|"-") factor
//! ```

use crate::ast::{BinaryOperator, Expr};
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{tokenize, Token};
use sheetcalc_core::Value;

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use sheetcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Expr> {
    let formula = formula.trim();
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let tokens = tokenize(body)?;
    let mut parser = FormulaParser::new(tokens);
    let node = parser.parse_comparison()?;

    match parser.current_token() {
        Token::Eof => Ok(node.expr),
        token => Err(FormulaError::Parse(format!(
            "Unexpected {:?} after complete expression",
            token
        ))),
    }
}

/// Deepest expression tree and deepest bracket/sign/call nesting accepted
///
/// Both evaluation and dropping a tree recurse once per level, so the cap
/// keeps every formula that parses safe to evaluate.
pub const MAX_NESTING_DEPTH: usize = 256;

/// An expression with the height of its tree
struct Node {
    expr: Expr,
    depth: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }
}

/// Formula parser
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    // === Token cursor ===

    fn current_token(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.current_token() {
            token if token == expected => {
                self.consume();
                Ok(())
            }
            Token::Eof => Err(FormulaError::UnexpectedEnd),
            token => Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected, token
            ))),
        }
    }

    // === Depth limits ===

    fn enter(&mut self) -> FormulaResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING_DEPTH {
            return Err(FormulaError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn binary(op: BinaryOperator, left: Node, right: Node) -> FormulaResult<Node> {
        let depth = left.depth.max(right.depth) + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(Node {
            expr: Expr::binary(op, left.expr, right.expr),
            depth,
        })
    }

    // === Grammar rules ===

    fn parse_comparison(&mut self) -> FormulaResult<Node> {
        let mut left = self.parse_expression()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_expression()?;
            left = Self::binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_expression(&mut self) -> FormulaResult<Node> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_term()?;
            left = Self::binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> FormulaResult<Node> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume();
            let right = self.parse_factor()?;
            left = Self::binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> FormulaResult<Node> {
        match self.consume() {
            Token::Number(n) => Ok(Node::leaf(Expr::Literal(Value::Number(n)))),
            Token::Text(s) => Ok(Node::leaf(Expr::Literal(Value::Text(s)))),
            Token::Boolean(b) => Ok(Node::leaf(Expr::Literal(Value::Boolean(b)))),
            Token::CellRef(addr) => Ok(Node::leaf(Expr::CellRef(addr))),
            Token::Range(range) => Ok(Node::leaf(Expr::Range(range))),
            Token::Function(name) => {
                self.enter()?;
                let node = self.parse_function_call(name)?;
                self.leave();
                Ok(node)
            }

            Token::LeftParen => {
                self.enter()?;
                let node = self.parse_comparison()?;
                self.expect(&Token::RightParen)?;
                self.leave();
                Ok(node)
            }

            // Unary signs desugar to `0 - x` / `0 + x`
            Token::Minus => self.parse_signed(BinaryOperator::Subtract),
            Token::Plus => self.parse_signed(BinaryOperator::Add),

            Token::Eof => Err(FormulaError::UnexpectedEnd),
            token => Err(FormulaError::Parse(format!("Unexpected token: {:?}", token))),
        }
    }

    fn parse_signed(&mut self, op: BinaryOperator) -> FormulaResult<Node> {
        self.enter()?;
        let operand = self.parse_factor()?;
        self.leave();
        Self::binary(op, Node::leaf(Expr::Literal(Value::Number(0.0))), operand)
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Node> {
        if !matches!(self.current_token(), Token::LeftParen) {
            return Err(FormulaError::Parse(format!(
                "Expected '(' after function name {}",
                name
            )));
        }
        self.consume();

        let mut args = Vec::new();
        let mut depth = 0;

        if !matches!(self.current_token(), Token::RightParen) {
            loop {
                let arg = self.parse_comparison()?;
                depth = depth.max(arg.depth);
                args.push(arg.expr);

                if !matches!(self.current_token(), Token::Comma) {
                    break;
                }
                self.consume();
            }
        }

        self.expect(&Token::RightParen)?;

        let depth = depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(Node {
            expr: Expr::FunctionCall { name, args },
            depth,
        })
    }
}

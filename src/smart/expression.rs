//! Arithmetic expressions used by `math` smart stats.
//!
//! Grammar, lowest precedence first:
//! ```text
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/' | '%') unary)*
//! unary    := ('-' | '+') unary | primary
//! primary  := number | ident | ident '(' args ')' | '(' expr ')'
//! ```
//! Identifiers may contain dots (`smart.auto`, `Math.max`). A `Math.`
//! prefix on functions and constants is accepted and ignored.

use crate::utils::error::{ExpressionError, StatError};

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Key reference as written
    Var(String),
    Neg(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        func: MathFn,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Min,
    Max,
    Pow,
    Sqrt,
    Abs,
    Round,
    Floor,
    Ceil,
}

impl MathFn {
    fn from_name(name: &str) -> Option<Self> {
        let func = match name.to_ascii_lowercase().as_str() {
            "min" => MathFn::Min,
            "max" => MathFn::Max,
            "pow" => MathFn::Pow,
            "sqrt" => MathFn::Sqrt,
            "abs" => MathFn::Abs,
            "round" => MathFn::Round,
            "floor" => MathFn::Floor,
            "ceil" => MathFn::Ceil,
            _ => return None,
        };
        Some(func)
    }

    /// Accepted argument counts (min, max)
    fn arity(self) -> (usize, usize) {
        match self {
            MathFn::Min | MathFn::Max => (1, usize::MAX),
            MathFn::Pow => (2, 2),
            _ => (1, 1),
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            MathFn::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            MathFn::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            MathFn::Pow => args[0].powf(args[1]),
            MathFn::Sqrt => args[0].sqrt(),
            MathFn::Abs => args[0].abs(),
            MathFn::Round => args[0].round(),
            MathFn::Floor => args[0].floor(),
            MathFn::Ceil => args[0].ceil(),
        }
    }
}

impl Expr {
    /// Every key reference, in first-appearance order, without duplicates
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(name) => {
                if !refs.contains(&name.as_str()) {
                    refs.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_references(refs),
            Expr::Binary { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_references(refs)),
        }
    }

    /// Evaluate with a resolver for key references
    ///
    /// Evaluation stops at the first operand the resolver cannot supply.
    /// Division by zero and non-finite results are reported as
    /// `StatError::MissingOperand`.
    pub fn eval<F>(&self, resolve: &mut F) -> Result<f64, StatError>
    where
        F: FnMut(&str) -> Result<f64, StatError>,
    {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Var(name) => resolve(name)?,
            Expr::Neg(inner) => -inner.eval(resolve)?,
            Expr::Binary { left, op, right } => {
                let l = left.eval(resolve)?;
                let r = right.eval(resolve)?;
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Subtract => l - r,
                    BinaryOp::Multiply => l * r,
                    BinaryOp::Divide | BinaryOp::Remainder if r == 0.0 => {
                        return Err(StatError::MissingOperand("division by zero".to_string()))
                    }
                    BinaryOp::Divide => l / r,
                    BinaryOp::Remainder => l % r,
                }
            }
            Expr::Call { func, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(resolve))
                    .collect::<Result<Vec<_>, _>>()?;
                func.apply(&values)
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(StatError::MissingOperand("non-finite result".to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LeftParen,
    RightParen,
    Comma,
    Eof,
}

/// Split an expression into tokens, each with its byte position
fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ExpressionError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((token, pos));
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            let end = chars.get(i).map_or(src.len(), |(p, _)| *p);
            let text = &src[pos..end];
            let number = text
                .parse::<f64>()
                .map_err(|_| ExpressionError::new(chars[start].0, format!("invalid number '{}'", text)))?;
            tokens.push((Token::Number(number), pos));
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len()
                && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_' || chars[i].1 == '.')
            {
                i += 1;
            }
            let end = chars.get(i).map_or(src.len(), |(p, _)| *p);
            tokens.push((Token::Ident(src[pos..end].to_string()), pos));
        } else {
            return Err(ExpressionError::new(pos, format!("unexpected character '{}'", c)));
        }
    }

    tokens.push((Token::Eof, src.len()));
    Ok(tokens)
}

/// Deepest nesting of parentheses, calls and signs a formula may use
const MAX_DEPTH: usize = 256;

/// Recursive-descent parser over a token list
struct Parser {
    tokens: Vec<(Token, usize)>,
    current: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.current].0
    }

    fn position(&self) -> usize {
        self.tokens[self.current].1
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].0.clone();
        if self.current + 1 < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExpressionError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(ExpressionError::new(self.position(), format!("expected {}", what)))
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::Percent => BinaryOp::Remainder,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::new(
                self.position(),
                format!("expression nested deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        let expr = self.parse_signed();
        self.depth -= 1;
        expr
    }

    fn parse_signed(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let position = self.position();
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LeftParen => {
                let inner = self.parse_additive()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                let bare = name.strip_prefix("Math.").unwrap_or(&name);
                if *self.peek() == Token::LeftParen {
                    let func = MathFn::from_name(bare).ok_or_else(|| {
                        ExpressionError::new(position, format!("unknown function '{}'", bare))
                    })?;
                    self.advance();
                    let args = self.parse_arguments()?;
                    let (min, max) = func.arity();
                    if args.len() < min || args.len() > max {
                        return Err(ExpressionError::new(
                            position,
                            format!("wrong number of arguments to '{}'", bare),
                        ));
                    }
                    return Ok(Expr::Call { func, args });
                }
                if bare.eq_ignore_ascii_case("pi") {
                    return Ok(Expr::Number(std::f64::consts::PI));
                }
                Ok(Expr::Var(name))
            }
            Token::Eof => Err(ExpressionError::new(position, "unexpected end of expression")),
            token => Err(ExpressionError::new(position, format!("unexpected token {:?}", token))),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        if *self.peek() == Token::RightParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_additive()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RightParen => return Ok(args),
                _ => {
                    return Err(ExpressionError::new(self.position(), "expected ',' or ')'"));
                }
            }
        }
    }
}

/// Parse a math expression
///
/// **Public** - used at load time so evaluation never re-parses
pub fn parse_expression(src: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        current: 0,
        depth: 0,
    };
    let expr = parser.parse_additive()?;
    if *parser.peek() != Token::Eof {
        return Err(ExpressionError::new(parser.position(), "unexpected trailing input"));
    }
    Ok(expr)
}

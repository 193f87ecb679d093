//! Safe arithmetic evaluation.
//!
//! Once every reference in a formula has been replaced by a literal, what is
//! left must be plain arithmetic: numeric literals and `+ - * / ( ) ^`. This
//! module is a small recursive-descent parser for exactly that language. It
//! never executes anything else; any other character is rejected up front.
//!
//! Precedence, loosest first: `+ -`, `* /`, `^` (right-associative), unary
//! `-`/`+`. Unary minus binds tighter than `^`, so `-2^2` is `4` as in a
//! spreadsheet.

use thiserror::Error;

/// Why an arithmetic expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithError {
    #[error("empty expression")]
    Empty,

    #[error("disallowed character '{0}'")]
    UnsafeCharacter(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {found} at offset {pos}")]
    Unexpected { found: String, pos: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// True if `c` may appear in a sanitized arithmetic expression.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_whitespace() || "+-*/().^".contains(c)
}

/// Evaluate a sanitized arithmetic expression.
pub fn evaluate_arithmetic(expr: &str) -> Result<f64, ArithError> {
    if let Some(c) = expr.chars().find(|c| !is_allowed_char(*c)) {
        return Err(ArithError::UnsafeCharacter(c));
    }
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ArithError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_additive()?;
    if let Some((tok, pos)) = parser.tokens.get(parser.pos) {
        return Err(ArithError::Unexpected {
            found: tok.describe(),
            pos: *pos,
        });
    }
    if !value.is_finite() {
        return Err(ArithError::NonFinite);
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LeftParen,
    RightParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
        }
    }
}

fn tokenize(expr: &str) -> Result<Vec<(Token, usize)>, ArithError> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        let single = match b {
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Star),
            b'/' => Some(Token::Slash),
            b'^' => Some(Token::Caret),
            b'(' => Some(Token::LeftParen),
            b')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push((tok, i));
            i += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Numeric literal: digits with at most one decimal point.
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        let text = &expr[start..i];
        if text.is_empty() {
            return Err(ArithError::UnsafeCharacter(b as char));
        }
        let n = text
            .parse::<f64>()
            .map_err(|_| ArithError::InvalidNumber(text.to_string()))?;
        tokens.push((Token::Number(n), start));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn consume(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self) -> ArithError {
        match self.tokens.get(self.pos) {
            Some((tok, pos)) => ArithError::Unexpected {
                found: tok.describe(),
                pos: *pos,
            },
            None => ArithError::Unexpected {
                found: "end of expression".to_string(),
                pos: self.tokens.last().map(|(_, p)| p + 1).unwrap_or(0),
            },
        }
    }

    fn parse_additive(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.consume();
                    left += self.parse_multiplicative()?;
                }
                Some(Token::Minus) => {
                    self.consume();
                    left -= self.parse_multiplicative()?;
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_exponent()?;

        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.consume();
                    left *= self.parse_exponent()?;
                }
                Some(Token::Slash) => {
                    self.consume();
                    let right = self.parse_exponent()?;
                    if right == 0.0 {
                        return Err(ArithError::DivisionByZero);
                    }
                    left /= right;
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> Result<f64, ArithError> {
        let base = self.parse_unary()?;

        if matches!(self.peek(), Some(Token::Caret)) {
            self.consume();
            let exp = self.parse_exponent()?; // Right associative
            return Ok(base.powf(exp));
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.consume();
                Ok(n)
            }
            Some(Token::LeftParen) => {
                self.consume();
                let value = self.parse_additive()?;
                if !matches!(self.peek(), Some(Token::RightParen)) {
                    return Err(self.unexpected());
                }
                self.consume();
                Ok(value)
            }
            _ => Err(self.unexpected()),
        }
    }
}

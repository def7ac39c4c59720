//! Recursive-descent parser producing an unresolved syntax tree
//!
//! Precedence, lowest first: comparisons, `+ -`, `* / %`, unary sign, `**`.
//! Exponentiation is right-associative and binds tighter than a leading
//! sign, so `-2**2` is `-(2**2)`.

use crate::error::FormulaError;

use super::token::{Token, TokenKind, syntax_error, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Syntax {
    Number(f64),
    Ident { name: String, start: usize },
    Neg(Box<Syntax>),
    Binary(BinOp, Box<Syntax>, Box<Syntax>),
    Call {
        name: String,
        start: usize,
        args: Vec<Syntax>,
    },
    /// Parenthesized list, only meaningful as a `Piecewise` argument
    Tuple { items: Vec<Syntax>, start: usize },
}

pub(crate) fn parse(input: &str) -> Result<Syntax, FormulaError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(syntax_error(input, 0, "empty expression"));
    }
    let mut parser = Parser {
        input,
        tokens: &tokens,
        pos: 0,
    };
    let tree = parser.parse_comparison()?;
    if let Some(token) = parser.peek() {
        return Err(syntax_error(
            input,
            token.start,
            format!("unexpected token {:?} after expression", token.kind),
        ));
    }
    Ok(tree)
}

/// Collect every identifier that is not a function name, in order of first use
pub(crate) fn identifiers(tree: &Syntax, out: &mut Vec<String>) {
    match tree {
        Syntax::Number(_) => {}
        Syntax::Ident { name, .. } => {
            if !out.iter().any(|n| n == name) {
                out.push(name.clone());
            }
        }
        Syntax::Neg(inner) => identifiers(inner, out),
        Syntax::Binary(_, lhs, rhs) => {
            identifiers(lhs, out);
            identifiers(rhs, out);
        }
        Syntax::Call { args, .. } => args.iter().for_each(|a| identifiers(a, out)),
        Syntax::Tuple { items, .. } => items.iter().for_each(|a| identifiers(a, out)),
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn end_offset(&self) -> usize {
        self.input.len()
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), FormulaError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(syntax_error(
                self.input,
                token.start,
                format!("expected {what}, found {:?}", token.kind),
            )),
            None => Err(syntax_error(
                self.input,
                self.end_offset(),
                format!("expected {what}, found end of input"),
            )),
        }
    }

    fn parse_comparison(&mut self) -> Result<Syntax, FormulaError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinOp::Lt,
                Some(TokenKind::Le) => BinOp::Le,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Ge) => BinOp::Ge,
                Some(TokenKind::EqEq) => BinOp::Eq,
                Some(TokenKind::Ne) => BinOp::Ne,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Syntax::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_additive(&mut self) -> Result<Syntax, FormulaError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Syntax::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Syntax, FormulaError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Syntax::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Syntax, FormulaError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                Ok(Syntax::Neg(Box::new(self.parse_unary()?)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Syntax, FormulaError> {
        let base = self.parse_atom()?;
        if let Some(TokenKind::Pow) = self.peek_kind() {
            self.pos += 1;
            // Right-associative; the exponent may carry its own sign
            let exponent = self.parse_unary()?;
            return Ok(Syntax::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Syntax, FormulaError> {
        let Some(token) = self.peek().cloned() else {
            return Err(syntax_error(
                self.input,
                self.end_offset(),
                "unexpected end of input",
            ));
        };
        self.pos += 1;

        match token.kind {
            TokenKind::Number(value) => Ok(Syntax::Number(value)),
            TokenKind::Ident(name) => {
                if let Some(TokenKind::LParen) = self.peek_kind() {
                    self.pos += 1;
                    let args = self.parse_list(TokenKind::RParen)?;
                    Ok(Syntax::Call {
                        name,
                        start: token.start,
                        args,
                    })
                } else {
                    Ok(Syntax::Ident {
                        name,
                        start: token.start,
                    })
                }
            }
            TokenKind::LParen => {
                let mut items = self.parse_list(TokenKind::RParen)?;
                match items.len() {
                    0 => Err(syntax_error(self.input, token.start, "empty parentheses")),
                    1 => Ok(items.remove(0)),
                    _ => Ok(Syntax::Tuple {
                        items,
                        start: token.start,
                    }),
                }
            }
            other => Err(syntax_error(
                self.input,
                token.start,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    /// Parse a comma separated list up to and including `close`
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Syntax>, FormulaError> {
        let mut items = Vec::new();
        if self.peek_kind() == Some(&close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_comparison()?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        self.expect(close, "')'")?;
        Ok(items)
    }
}

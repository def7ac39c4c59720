//! Tokenizer for formula strings

use crate::error::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `**` or `^`
    Pow,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: usize,
}

pub(crate) fn syntax_error(
    input: &str,
    position: usize,
    message: impl Into<String>,
) -> FormulaError {
    FormulaError::Syntax {
        expression: input.to_string(),
        position,
        message: message.into(),
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        if i + 1 < bytes.len() {
            let kind = match &bytes[i..i + 2] {
                b"**" => Some(TokenKind::Pow),
                b"<=" => Some(TokenKind::Le),
                b">=" => Some(TokenKind::Ge),
                b"==" => Some(TokenKind::EqEq),
                b"!=" => Some(TokenKind::Ne),
                _ => None,
            };
            if let Some(kind) = kind {
                tokens.push(Token { kind, start });
                i += 2;
                continue;
            }
        }

        let kind = match b {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Pow,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            _ if b.is_ascii_digit() || b == b'.' => {
                let (value, end) = lex_number(input, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    start,
                });
                i = end;
                continue;
            }
            _ if b.is_ascii_alphabetic() || b == b'_' => {
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(input[i..end].to_string()),
                    start,
                });
                i = end;
                continue;
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(syntax_error(input, i, format!("unexpected character {ch:?}")));
            }
        };
        tokens.push(Token { kind, start });
        i += 1;
    }

    Ok(tokens)
}

/// Lex a decimal literal with an optional exponent, returning the value and end offset
fn lex_number(input: &str, start: usize) -> Result<(f64, usize), FormulaError> {
    let bytes = input.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }

    // Exponent only when followed by digits, so `2e` stays a syntax error downstream
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        if exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            end = exp_end;
        }
    }

    let text = &input[start..end];
    text.parse::<f64>()
        .map(|v| (v, end))
        .map_err(|_| syntax_error(input, start, format!("invalid number literal {text:?}")))
}

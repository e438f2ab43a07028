//! Tokenizer for JSON text.

use crate::{Span, Token, TokenKind};
use tracing::trace;

/// A tokenizer that produces tokens from JSON source text.
///
/// Lexical faults (unterminated strings, malformed numbers, stray
/// characters) are reported as [`TokenKind::Error`] tokens spanning the
/// offending text; classifying them is the parser's job.
#[derive(Clone)]
pub struct Tokenizer<'src> {
    /// The source text being tokenized.
    source: &'src str,
    /// The remaining source text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
}

impl<'src> Tokenizer<'src> {
    /// Create a new tokenizer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            pos: 0,
        }
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Check if we're at the end of input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Advance by one character and return it.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        self.remaining = &self.remaining[c.len_utf8()..];
        Some(c)
    }

    /// Create a token from the given start position to current position.
    fn token(&self, kind: TokenKind, start: u32) -> Token<'src> {
        let span = Span::new(start, self.pos);
        let text = &self.source[start as usize..self.pos as usize];
        trace!("Token {:?} at {:?}: {:?}", kind, span, text);
        Token::new(kind, span, text)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        if self.is_eof() {
            return self.token(TokenKind::Eof, self.pos);
        }

        let start = self.pos;
        let c = self.peek().unwrap();

        match c {
            // Structural tokens
            '{' => {
                self.advance();
                self.token(TokenKind::LBrace, start)
            }
            '}' => {
                self.advance();
                self.token(TokenKind::RBrace, start)
            }
            '[' => {
                self.advance();
                self.token(TokenKind::LBracket, start)
            }
            ']' => {
                self.advance();
                self.token(TokenKind::RBracket, start)
            }
            ':' => {
                self.advance();
                self.token(TokenKind::Colon, start)
            }
            ',' => {
                self.advance();
                self.token(TokenKind::Comma, start)
            }

            // String literal
            '"' => self.tokenize_string(),

            // Number literal
            '-' => self.tokenize_number(),
            _ if c.is_ascii_digit() => self.tokenize_number(),

            // Keyword: true, false, null
            _ if c.is_ascii_lowercase() => self.tokenize_keyword(),

            // Whitespace
            ' ' | '\t' | '\n' | '\r' => self.tokenize_whitespace(),

            // Error: unrecognized character
            _ => {
                self.advance();
                self.token(TokenKind::Error, start)
            }
        }
    }

    /// Tokenize whitespace (spaces, tabs, newlines).
    fn tokenize_whitespace(&mut self) -> Token<'src> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
        self.token(TokenKind::Whitespace, start)
    }

    /// Tokenize a string literal: `"..."`.
    ///
    /// Escape pairs are consumed blindly; decoding and escape validation
    /// happen in the parser.
    fn tokenize_string(&mut self) -> Token<'src> {
        let start = self.pos;

        // Consume opening quote
        self.advance();

        loop {
            match self.peek() {
                None => {
                    // Unterminated string
                    return self.token(TokenKind::Error, start);
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    // Escape sequence - consume backslash and next char
                    self.advance();
                    if self.peek().is_some() {
                        self.advance();
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        self.token(TokenKind::Str, start)
    }

    /// Tokenize a number literal per the JSON grammar:
    /// optional sign, integer part without leading zeros, optional
    /// fraction, optional exponent.
    fn tokenize_number(&mut self) -> Token<'src> {
        let start = self.pos;

        if self.peek() == Some('-') {
            self.advance();
        }

        // Integer part: `0` or [1-9][0-9]*
        match self.peek() {
            Some('0') => {
                self.advance();
                // A digit after a leading zero is not valid JSON
                if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    return self.error_number(start);
                }
            }
            Some(c) if c.is_ascii_digit() => {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
            _ => {
                // Bare `-` with no digits
                return self.error_number(start);
            }
        }

        // Fraction: `.` [0-9]+
        if self.peek() == Some('.') {
            self.advance();
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return self.error_number(start);
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent: [eE] [+-]? [0-9]+
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return self.error_number(start);
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.token(TokenKind::Number, start)
    }

    /// Consume any remaining number-like characters so the error span
    /// covers the whole malformed literal, then return an error token.
    fn error_number(&mut self, start: u32) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-') {
                self.advance();
            } else {
                break;
            }
        }
        self.token(TokenKind::Error, start)
    }

    /// Tokenize a keyword: `true`, `false`, or `null`.
    fn tokenize_keyword(&mut self) -> Token<'src> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_lowercase()) {
            self.advance();
        }
        let text = &self.source[start as usize..self.pos as usize];
        let kind = match text {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Error,
        };
        self.token(kind, start)
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

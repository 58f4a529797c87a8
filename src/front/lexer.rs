/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Hand-rolled scanner producing a flat token vector. One-character and
//! two-character punctuation, `//`/`/* */` comments, words, and numeric
//! constants — the same shape as the retrieved `lexer.py`'s unigram/digram
//! tables, minus the line-by-line buffering (we scan the whole source as
//! one `&str` up front and track line/col as we go).

use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::front::kw::{self, Intrinsic, Keyword, Word};
use crate::ir::types::BasicKind;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    TypeName(BasicKind),
    Intrinsic(Intrinsic),
    IntConst(i64),
    FloatConst(f64),

    Assign,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    Not,
    Amp,
    Pipe,
    Tilde,
    Caret,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Comma,
    Question,
    Colon,
    Semi,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    _source: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Scanner { chars: source.chars().collect(), pos: 0, line: 1, col: 1, _source: source }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> CodegenError {
        CodegenError::Parse { line: self.line, col: self.col, message: message.into() }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (None, _) => return Err(self.error("file ended inside a comment")),
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                text.push(self.advance().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    text.push(self.advance().unwrap());
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    text.push(self.advance().unwrap());
                }
            }
        }

        let kind = if is_float {
            TokenKind::FloatConst(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::IntConst(text.parse().unwrap_or(0))
        };
        Token { kind, line, col }
    }

    fn scan_word(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }

        let kind = match kw::lookup(&text) {
            Some(Word::Keyword(k)) => TokenKind::Keyword(k),
            Some(Word::TypeName(b)) => TokenKind::TypeName(b),
            Some(Word::Intrinsic(i)) => TokenKind::Intrinsic(i),
            None => TokenKind::Ident(text),
        };
        Token { kind, line, col }
    }

    fn scan_punct(&mut self) -> Result<Token> {
        let line = self.line;
        let col = self.col;
        let c = self.advance().unwrap();
        let two = |s: &mut Self, expect: char| -> bool {
            if s.peek() == Some(expect) {
                s.advance();
                true
            } else {
                false
            }
        };

        let kind = match c {
            '=' if two(self, '=') => TokenKind::Eq,
            '=' => TokenKind::Assign,
            '!' if two(self, '=') => TokenKind::Ne,
            '!' => TokenKind::Not,
            '>' if two(self, '=') => TokenKind::Ge,
            '>' if two(self, '>') => TokenKind::Shr,
            '>' => TokenKind::Gt,
            '<' if two(self, '=') => TokenKind::Le,
            '<' if two(self, '<') => TokenKind::Shl,
            '<' => TokenKind::Lt,
            '&' if two(self, '&') => TokenKind::AndAnd,
            '&' => TokenKind::Amp,
            '|' if two(self, '|') => TokenKind::OrOr,
            '|' => TokenKind::Pipe,
            '~' => TokenKind::Tilde,
            '^' => TokenKind::Caret,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            other => return Err(self.error(format!("bad character '{}' found", other))),
        };
        Ok(Token { kind, line, col })
    }
}

/// Lexes a whole source string into a token vector terminated by `Eof`.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut sc = Scanner::new(source);
    let mut tokens = Vec::new();

    loop {
        sc.skip_trivia()?;
        let tok = match sc.peek() {
            None => Token { kind: TokenKind::Eof, line: sc.line, col: sc.col },
            Some(c) if c.is_ascii_digit() => sc.scan_number(),
            Some(c) if c.is_alphabetic() || c == '_' => sc.scan_word(),
            Some(_) => sc.scan_punct()?,
        };
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }

    trace!(tokens = tokens.len(), "lexing complete");
    Ok(tokens)
}

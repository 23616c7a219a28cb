//! Single-pass lexer, shared by the tree-walking and bytecode paths.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{Diagnostics, Location, ScanError};
use crate::token::{Literal, Token, TokenKind};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    let mut m = HashMap::new();
    m.insert("and", And);
    m.insert("class", Class);
    m.insert("else", Else);
    m.insert("false", False);
    m.insert("for", For);
    m.insert("fun", Fun);
    m.insert("if", If);
    m.insert("nil", Nil);
    m.insert("or", Or);
    m.insert("print", Print);
    m.insert("return", Return);
    m.insert("super", Super);
    m.insert("this", This);
    m.insert("true", True);
    m.insert("var", Var);
    m.insert("while", While);
    m
});

pub struct Scanner<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
    tokens: Vec<Token>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole source into a token stream, reporting any lexical
    /// errors to `diagnostics` and continuing past them (one bad character
    /// does not stop the rest of the file from being scanned).
    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            if let Err(err) = self.scan_token() {
                diagnostics.report_static(self.line, Location::Pure, err.to_string());
            }
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", Literal::None, self.line));
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn advance(&mut self) -> char {
        let c = self.bytes[self.current] as char;
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.bytes[self.current] as char
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.bytes.len() {
            '\0'
        } else {
            self.bytes[self.current + 1] as char
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.bytes[self.current] as char != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn lexeme(&self) -> &'src str {
        &self.source[self.start..self.current]
    }

    fn add_token(&mut self, kind: TokenKind, literal: Literal) {
        self.tokens
            .push(Token::new(kind, self.lexeme(), literal, self.line));
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        use TokenKind::*;
        match c {
            '(' => self.add_token(LeftParen, Literal::None),
            ')' => self.add_token(RightParen, Literal::None),
            '{' => self.add_token(LeftBrace, Literal::None),
            '}' => self.add_token(RightBrace, Literal::None),
            ',' => self.add_token(Comma, Literal::None),
            '.' => self.add_token(Dot, Literal::None),
            '-' => self.add_token(Minus, Literal::None),
            '+' => self.add_token(Plus, Literal::None),
            ';' => self.add_token(Semicolon, Literal::None),
            '*' => self.add_token(Star, Literal::None),
            '!' => {
                let kind = if self.matches('=') { BangEqual } else { Bang };
                self.add_token(kind, Literal::None);
            }
            '=' => {
                let kind = if self.matches('=') { EqualEqual } else { Equal };
                self.add_token(kind, Literal::None);
            }
            '<' => {
                let kind = if self.matches('=') { LessEqual } else { Less };
                self.add_token(kind, Literal::None);
            }
            '>' => {
                let kind = if self.matches('=') {
                    GreaterEqual
                } else {
                    Greater
                };
                self.add_token(kind, Literal::None);
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(Slash, Literal::None);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string()?,
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            c => return Err(ScanError::UnexpectedCharacter(c)),
        }
        Ok(())
    }

    fn string(&mut self) -> Result<(), ScanError> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return Err(ScanError::UnterminatedString);
        }
        self.advance(); // closing quote
        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_token(TokenKind::String, Literal::String(value));
        Ok(())
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let value: f64 = self.lexeme().parse().expect("scanned digits form a number");
        self.add_token(TokenKind::Number, Literal::Number(value));
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let kind = KEYWORDS
            .get(self.lexeme())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.add_token(kind, Literal::None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<TokenKind> {
        let mut diagnostics = Diagnostics::new();
        Scanner::new(src)
            .scan_tokens(&mut diagnostics)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_arithmetic_expression() {
        use TokenKind::*;
        assert_eq!(
            scan("1 + 2 * 3"),
            vec![Number, Plus, Number, Star, Number, Eof]
        );
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            scan("var x = true and false"),
            vec![Var, Identifier, Equal, True, And, False, Eof]
        );
    }

    #[test]
    fn scans_string_literal() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("\"hi\"").scan_tokens(&mut diagnostics);
        assert_eq!(tokens[0].literal, Literal::String("hi".to_string()));
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn reports_unterminated_string() {
        let mut diagnostics = Diagnostics::new();
        Scanner::new("\"unterminated").scan_tokens(&mut diagnostics);
        assert!(diagnostics.had_error());
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("1\n2\n3").scan_tokens(&mut diagnostics);
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 3]);
    }

    #[test]
    fn skips_line_comments() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("1 // comment\n2").scan_tokens(&mut diagnostics);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
    }
}

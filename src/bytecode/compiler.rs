//! Single-pass Pratt parser/compiler: parses and emits in the same walk,
//! with no separate AST stage.

use crate::bytecode::chunk::Chunk;
use crate::bytecode::opcode::OpCode;
use crate::bytecode::value::Value;
use crate::error::{CompileError, Diagnostics, Location};
use crate::token::{Literal, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

pub struct Compiler {
    tokens: Vec<Token>,
    current: usize,
    chunk: Chunk,
}

type CompileResult = Result<(), CompileError>;

impl Compiler {
    pub fn new(tokens: Vec<Token>) -> Self {
        Compiler {
            tokens,
            current: 0,
            chunk: Chunk::new(),
        }
    }

    /// Compile a single expression (the bytecode path's whole program,
    /// given its scope) into a finished chunk.
    pub fn compile(mut self, diagnostics: &mut Diagnostics) -> Option<Chunk> {
        let result = self.expression().and_then(|()| {
            let line = self.previous().line;
            self.emit(OpCode::Return as u8, line);
            if !self.check(TokenKind::Eof) {
                return Err(CompileError::ExpectedToken {
                    expected: "end of expression".to_string(),
                });
            }
            Ok(())
        });

        match result {
            Ok(()) => Some(self.chunk),
            Err(err) => {
                let token = &self.tokens[self.current.min(self.tokens.len() - 1)];
                let location = if token.kind == TokenKind::Eof {
                    Location::AtEof
                } else {
                    Location::AtToken(token.lexeme.clone())
                };
                diagnostics.report_static(token.line, location, err.to_string());
                None
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<(), CompileError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::ExpectedToken {
                expected: expected.to_string(),
            })
        }
    }

    fn emit(&mut self, byte: u8, line: u32) {
        self.chunk.write(byte, line);
    }

    fn emit_constant(&mut self, value: Value, line: u32) -> CompileResult {
        let index = self.chunk.add_constant(value)?;
        self.emit(OpCode::Constant as u8, line);
        self.emit(index, line);
        Ok(())
    }

    fn expression(&mut self) -> CompileResult {
        self.parse_precedence(Precedence::Equality)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> CompileResult {
        self.advance();
        self.prefix(self.previous().kind)?;

        while precedence <= infix_precedence(self.peek().kind) {
            self.advance();
            self.infix(self.previous().kind)?;
        }
        Ok(())
    }

    fn prefix(&mut self, kind: TokenKind) -> CompileResult {
        match kind {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus | TokenKind::Bang => self.unary(),
            TokenKind::Number | TokenKind::False | TokenKind::True | TokenKind::Nil => {
                self.literal()
            }
            _ => Err(CompileError::ExpectedExpression),
        }
    }

    fn infix(&mut self, kind: TokenKind) -> CompileResult {
        let operator = self.previous().clone();
        let rule_precedence = infix_precedence(kind);
        self.parse_precedence(rule_precedence.next())?;
        match kind {
            TokenKind::Plus => self.emit(OpCode::Add as u8, operator.line),
            TokenKind::Minus => self.emit(OpCode::Subtract as u8, operator.line),
            TokenKind::Star => self.emit(OpCode::Multiply as u8, operator.line),
            TokenKind::Slash => self.emit(OpCode::Divide as u8, operator.line),
            TokenKind::EqualEqual => self.emit(OpCode::Equal as u8, operator.line),
            TokenKind::BangEqual => {
                self.emit(OpCode::Equal as u8, operator.line);
                self.emit(OpCode::Not as u8, operator.line);
            }
            TokenKind::Greater => self.emit(OpCode::Greater as u8, operator.line),
            TokenKind::GreaterEqual => {
                self.emit(OpCode::Less as u8, operator.line);
                self.emit(OpCode::Not as u8, operator.line);
            }
            TokenKind::Less => self.emit(OpCode::Less as u8, operator.line),
            TokenKind::LessEqual => {
                self.emit(OpCode::Greater as u8, operator.line);
                self.emit(OpCode::Not as u8, operator.line);
            }
            _ => unreachable!("infix_precedence only admits binary operator tokens"),
        }
        Ok(())
    }

    fn grouping(&mut self) -> CompileResult {
        self.expression()?;
        self.consume(TokenKind::RightParen, "')' after expression")
    }

    fn unary(&mut self) -> CompileResult {
        let operator = self.previous().clone();
        self.parse_precedence(Precedence::Unary)?;
        match operator.kind {
            TokenKind::Minus => self.emit(OpCode::Negate as u8, operator.line),
            TokenKind::Bang => self.emit(OpCode::Not as u8, operator.line),
            _ => unreachable!("prefix() only dispatches here for Minus/Bang"),
        }
        Ok(())
    }

    fn literal(&mut self) -> CompileResult {
        let token = self.previous().clone();
        match token.kind {
            TokenKind::Number => match token.literal {
                Literal::Number(n) => self.emit_constant(Value::Number(n), token.line),
                _ => unreachable!("scanner always attaches Literal::Number to Number tokens"),
            },
            TokenKind::True => {
                self.emit(OpCode::True as u8, token.line);
                Ok(())
            }
            TokenKind::False => {
                self.emit(OpCode::False as u8, token.line);
                Ok(())
            }
            TokenKind::Nil => {
                self.emit(OpCode::Nil as u8, token.line);
                Ok(())
            }
            _ => unreachable!("prefix() only dispatches here for literal tokens"),
        }
    }
}

fn infix_precedence(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        EqualEqual | BangEqual => Precedence::Equality,
        Greater | GreaterEqual | Less | LessEqual => Precedence::Comparison,
        Plus | Minus => Precedence::Term,
        Star | Slash => Precedence::Factor,
        _ => Precedence::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn compile(src: &str) -> Option<Chunk> {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        Compiler::new(tokens).compile(&mut diagnostics)
    }

    #[test]
    fn compiles_arithmetic_with_precedence() {
        let chunk = compile("1 + 2 * 3").unwrap();
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Constant as u8,
                0,
                OpCode::Constant as u8,
                1,
                OpCode::Constant as u8,
                2,
                OpCode::Multiply as u8,
                OpCode::Add as u8,
                OpCode::Return as u8,
            ]
        );
    }

    #[test]
    fn compiles_grouping() {
        let chunk = compile("(1 + 2) * 3").unwrap();
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Constant as u8,
                0,
                OpCode::Constant as u8,
                1,
                OpCode::Add as u8,
                OpCode::Constant as u8,
                2,
                OpCode::Multiply as u8,
                OpCode::Return as u8,
            ]
        );
    }

    #[test]
    fn compiles_comparison_operators_via_negated_pairs() {
        let chunk = compile("1 >= 2").unwrap();
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Constant as u8,
                0,
                OpCode::Constant as u8,
                1,
                OpCode::Less as u8,
                OpCode::Not as u8,
                OpCode::Return as u8,
            ]
        );
    }

    #[test]
    fn rejects_trailing_garbage_after_expression() {
        assert!(compile("1 + 2 3").is_none());
    }

    #[test]
    fn rejects_unterminated_grouping() {
        assert!(compile("(1 + 2").is_none());
    }
}

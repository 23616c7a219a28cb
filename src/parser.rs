//! Recursive-descent parser for the tree-walking path.

use crate::ast::{Expr, FunctionDecl, NodeId, Stmt};
use crate::error::{Diagnostics, Location, ParseError};
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
}

type ExprResult = Result<Expr, ParseError>;
type StmtResult = Result<Stmt, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Parse a full program, synchronizing past each declaration-level
    /// error so later, independent errors are still reported.
    pub fn parse(mut self, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.report(&err, diagnostics);
                    self.synchronize();
                }
            }
        }
        statements
    }

    fn report(&self, err: &ParseError, diagnostics: &mut Diagnostics) {
        let token = &self.tokens[self.current.min(self.tokens.len() - 1)];
        let location = if token.kind == TokenKind::Eof {
            Location::AtEof
        } else {
            Location::AtToken(token.lexeme.to_string())
        };
        diagnostics.report_static(token.line, location, err.to_string());
    }

    // --- token stream helpers ---

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::ExpectedToken {
                expected: expected.to_string(),
            })
        }
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            use TokenKind::*;
            match self.peek().kind {
                Class | Fun | Var | For | If | While | Print | Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // --- declarations ---

    fn declaration(&mut self) -> StmtResult {
        if self.matches(&[TokenKind::Class]) {
            return self.class_declaration();
        }
        if self.matches(&[TokenKind::Fun]) {
            return self.function("function");
        }
        if self.matches(&[TokenKind::Var]) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "class name")?;
        let superclass = if self.matches(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "superclass name")?;
            Some(Expr::Variable {
                id: self.fresh_id(),
                name: super_name,
            })
        } else {
            None
        };
        self.consume(TokenKind::LeftBrace, "'{' before class body")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.method_decl()?);
        }
        self.consume(TokenKind::RightBrace, "'}' after class body")?;
        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn method_decl(&mut self) -> Result<Rc<FunctionDecl>, ParseError> {
        let name = self.consume(TokenKind::Identifier, "method name")?;
        let (params, body) = self.function_tail()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn function(&mut self, kind: &str) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, &format!("{kind} name"))?;
        let (params, body) = self.function_tail()?;
        Ok(Stmt::Function {
            declaration: Rc::new(FunctionDecl { name, params, body }),
        })
    }

    fn function_tail(&mut self) -> Result<(Vec<Token>, Vec<Stmt>), ParseError> {
        self.consume(TokenKind::LeftParen, "'(' after name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(ParseError::TooManyParameters);
                }
                params.push(self.consume(TokenKind::Identifier, "parameter name")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after parameters")?;
        self.consume(TokenKind::LeftBrace, "'{' before body")?;
        let body = self.block()?;
        Ok((params, body))
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "variable name")?;
        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::Var { name, initializer })
    }

    // --- statements ---

    fn statement(&mut self) -> StmtResult {
        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block {
                statements: self.block()?,
            });
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> StmtResult {
        let expression = self.expression()?;
        self.consume(TokenKind::Semicolon, "';' after value")?;
        Ok(Stmt::Print { expression })
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration_in_block()?);
        }
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        Ok(statements)
    }

    /// Like `declaration`, but errors propagate instead of being caught and
    /// synchronized locally. The top-level `parse` loop owns recovery.
    fn declaration_in_block(&mut self) -> StmtResult {
        self.declaration()
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// Desugars into a `while` loop wrapped in a block, the way jlox does.
    fn for_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after loop condition")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression { expression: increment }],
            };
        }

        let condition = condition.unwrap_or(Expr::Literal {
            id: self.fresh_id(),
            value: Literal::None,
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expression = self.expression()?;
        self.consume(TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expression { expression })
    }

    // --- expressions, lowest to highest precedence ---

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or()?;

        if self.matches(&[TokenKind::Equal]) {
            let value = self.assignment()?;
            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: self.fresh_id(),
                    name,
                    value: Box::new(value),
                }),
                Expr::Get { object, name, .. } => Ok(Expr::Set {
                    id: self.fresh_id(),
                    object,
                    name,
                    value: Box::new(value),
                }),
                _ => Err(ParseError::InvalidAssignmentTarget),
            };
        }
        Ok(expr)
    }

    fn or(&mut self) -> ExprResult {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                id: self.fresh_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                id: self.fresh_id(),
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "property name after '.'")?;
                expr = Expr::Get {
                    id: self.fresh_id(),
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(ParseError::TooManyArguments);
                }
                arguments.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "')' after arguments")?;
        Ok(Expr::Call {
            id: self.fresh_id(),
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ExprResult {
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::Literal {
                id: self.fresh_id(),
                value: Literal::Bool(false),
            });
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::Literal {
                id: self.fresh_id(),
                value: Literal::Bool(true),
            });
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(Expr::Literal {
                id: self.fresh_id(),
                value: Literal::None,
            });
        }
        if self.matches(&[TokenKind::Number, TokenKind::String]) {
            return Ok(Expr::Literal {
                id: self.fresh_id(),
                value: self.previous().literal.clone(),
            });
        }
        if self.matches(&[TokenKind::This]) {
            return Ok(Expr::This {
                id: self.fresh_id(),
                keyword: self.previous().clone(),
            });
        }
        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "'.' after 'super'")?;
            let method = self.consume(TokenKind::Identifier, "superclass method name")?;
            return Ok(Expr::Super {
                id: self.fresh_id(),
                keyword,
                method,
            });
        }
        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name: self.previous().clone(),
            });
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expression = self.expression()?;
            self.consume(TokenKind::RightParen, "')' after expression")?;
            return Ok(Expr::Grouping {
                id: self.fresh_id(),
                expression: Box::new(expression),
            });
        }
        Err(ParseError::ExpectedExpression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(src: &str) -> (Vec<Stmt>, bool) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        (statements, diagnostics.had_error())
    }

    #[test]
    fn parses_var_declaration() {
        let (stmts, had_error) = parse("var x = 1 + 2;");
        assert!(!had_error);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Var { .. }));
    }

    #[test]
    fn parses_class_with_superclass() {
        let (stmts, had_error) = parse("class A {} class B < A { init() {} }");
        assert!(!had_error);
        assert_eq!(stmts.len(), 2);
        match &stmts[1] {
            Stmt::Class {
                superclass, methods, ..
            } => {
                assert!(superclass.is_some());
                assert_eq!(methods.len(), 1);
            }
            _ => panic!("expected class declaration"),
        }
    }

    #[test]
    fn reports_invalid_assignment_target() {
        let (_, had_error) = parse("1 = 2;");
        assert!(had_error);
    }

    #[test]
    fn desugars_for_into_while() {
        let (stmts, had_error) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(!had_error);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Block { .. }));
    }

    #[test]
    fn synchronizes_after_error_to_report_later_ones() {
        let (_, had_error) = parse("var = ; var y = 1;");
        assert!(had_error);
    }
}

//! Static scope resolution: annotates every variable/this/super reference
//! with the number of enclosing scopes to skip to find its binding.

use std::collections::HashMap;

use crate::ast::{Expr, FunctionDecl, NodeId, Stmt};
use crate::error::{Diagnostics, Location, ResolveError};
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionKind,
    current_class: ClassKind,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
        }
    }

    /// Resolve a whole program, returning the node-id -> scope-distance
    /// map the evaluator consults for every variable/this/super lookup.
    pub fn resolve(mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) -> HashMap<NodeId, usize> {
        self.resolve_statements(statements, diagnostics);
        self.locals
    }

    fn resolve_statements(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for stmt in statements {
            self.resolve_stmt(stmt, diagnostics);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token, diagnostics: &mut Diagnostics) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                diagnostics.report_static(
                    name.line,
                    Location::AtToken(name.lexeme.clone()),
                    ResolveError::AlreadyDeclared(name.lexeme.clone()).to_string(),
                );
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, distance);
                return;
            }
        }
        // Not found in any local scope: treated as global, resolved
        // dynamically at runtime against the global environment.
    }

    fn resolve_function(
        &mut self,
        declaration: &FunctionDecl,
        kind: FunctionKind,
        diagnostics: &mut Diagnostics,
    ) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param, diagnostics);
            self.define(param);
        }
        self.resolve_statements(&declaration.body, diagnostics);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt, diagnostics: &mut Diagnostics) {
        match stmt {
            Stmt::Expression { expression } => self.resolve_expr(expression, diagnostics),
            Stmt::Print { expression } => self.resolve_expr(expression, diagnostics),
            Stmt::Var { name, initializer } => {
                self.declare(name, diagnostics);
                if let Some(init) = initializer {
                    self.resolve_expr(init, diagnostics);
                }
                self.define(name);
            }
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_statements(statements, diagnostics);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, diagnostics);
                self.resolve_stmt(then_branch, diagnostics);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch, diagnostics);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition, diagnostics);
                self.resolve_stmt(body, diagnostics);
            }
            Stmt::Function { declaration } => {
                self.declare(&declaration.name, diagnostics);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionKind::Function, diagnostics);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    diagnostics.report_static(
                        keyword.line,
                        Location::AtToken(keyword.lexeme.clone()),
                        ResolveError::ReturnFromTopLevel.to_string(),
                    );
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        diagnostics.report_static(
                            keyword.line,
                            Location::AtToken(keyword.lexeme.clone()),
                            ResolveError::ReturnFromInitializer.to_string(),
                        );
                    }
                    self.resolve_expr(value, diagnostics);
                }
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods, diagnostics),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
        diagnostics: &mut Diagnostics,
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(name, diagnostics);
        self.define(name);

        if let Some(Expr::Variable { name: super_name, .. }) = superclass {
            if super_name.lexeme == name.lexeme {
                diagnostics.report_static(
                    super_name.line,
                    Location::AtToken(super_name.lexeme.clone()),
                    ResolveError::SelfInheritance(name.lexeme.clone()).to_string(),
                );
            } else {
                self.current_class = ClassKind::Subclass;
                self.resolve_expr(superclass.unwrap(), diagnostics);
                self.begin_scope();
                self.scopes
                    .last_mut()
                    .unwrap()
                    .insert("super".to_string(), true);
            }
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .unwrap()
            .insert("this".to_string(), true);

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind, diagnostics);
        }

        self.end_scope();

        if superclass.is_some() && self.current_class == ClassKind::Subclass {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr, diagnostics: &mut Diagnostics) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Grouping { expression, .. } => self.resolve_expr(expression, diagnostics),
            Expr::Unary { right, .. } => self.resolve_expr(right, diagnostics),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left, diagnostics);
                self.resolve_expr(right, diagnostics);
            }
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        diagnostics.report_static(
                            name.line,
                            Location::AtToken(name.lexeme.clone()),
                            ResolveError::ReadOwnInitializer(name.lexeme.clone()).to_string(),
                        );
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value, diagnostics);
                self.resolve_local(*id, &name.lexeme);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee, diagnostics);
                for arg in arguments {
                    self.resolve_expr(arg, diagnostics);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object, diagnostics),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value, diagnostics);
                self.resolve_expr(object, diagnostics);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    diagnostics.report_static(
                        keyword.line,
                        Location::AtToken(keyword.lexeme.clone()),
                        ResolveError::ThisOutsideClass.to_string(),
                    );
                    return;
                }
                self.resolve_local(*id, "this");
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        diagnostics.report_static(
                            keyword.line,
                            Location::AtToken(keyword.lexeme.clone()),
                            ResolveError::SuperOutsideClass.to_string(),
                        );
                    }
                    ClassKind::Class => {
                        diagnostics.report_static(
                            keyword.line,
                            Location::AtToken(keyword.lexeme.clone()),
                            ResolveError::SuperWithoutSuperclass.to_string(),
                        );
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, "super");
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(src: &str) -> (HashMap<NodeId, usize>, bool) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        let locals = Resolver::new().resolve(&statements, &mut diagnostics);
        (locals, diagnostics.had_error())
    }

    #[test]
    fn resolves_closure_capture_distance() {
        let src = "var a = 1; fun f() { fun g() { return a; } return g; }";
        let (_, had_error) = resolve(src);
        assert!(!had_error);
    }

    #[test]
    fn rejects_return_from_top_level() {
        let (_, had_error) = resolve("return 1;");
        assert!(had_error);
    }

    #[test]
    fn rejects_return_value_from_initializer() {
        let src = "class A { init() { return 1; } }";
        let (_, had_error) = resolve(src);
        assert!(had_error);
    }

    #[test]
    fn rejects_this_outside_class() {
        let (_, had_error) = resolve("print this;");
        assert!(had_error);
    }

    #[test]
    fn rejects_self_inheritance() {
        let (_, had_error) = resolve("class A < A {}");
        assert!(had_error);
    }

    #[test]
    fn rejects_reading_own_initializer() {
        let (_, had_error) = resolve("var a = 1; { var a = a; }");
        assert!(had_error);
    }

    #[test]
    fn rejects_redeclaration_in_same_scope() {
        let (_, had_error) = resolve("{ var a = 1; var a = 2; }");
        assert!(had_error);
    }
}

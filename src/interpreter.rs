//! Tree-walking evaluator: executes the AST directly against a chain of
//! [`EnvHandle`] scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, FunctionDecl, NodeId, Stmt};
use crate::environment::EnvHandle;
use crate::error::{Diagnostics, RuntimeError};
use crate::token::{Literal, Token, TokenKind};
use crate::value::{Callable, Instance, Object, Type};

/// Non-local control transfer during tree evaluation: either a genuine
/// runtime fault (carrying the source line and, where one is available,
/// the offending token's lexeme for diagnostics) or a `return` unwinding
/// to its enclosing call frame.
pub enum Signal {
    Error(RuntimeError, u32, Option<String>),
    Return(Object),
}

fn fault(err: RuntimeError, token: &Token) -> Signal {
    Signal::Error(err, token.line, Some(token.lexeme.clone()))
}

type EvalResult = Result<Object, Signal>;
type ExecResult = Result<(), Signal>;

pub struct Interpreter {
    pub globals: EnvHandle,
    environment: EnvHandle,
    locals: HashMap<NodeId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = EnvHandle::new();
        define_native(&globals, "clock", 0, |_, _| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            Ok(Object::Number(now.as_secs_f64()))
        });
        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
        }
    }

    pub fn set_locals(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals = locals;
    }

    /// Execute a resolved program, reporting the first runtime error (if
    /// any) to `diagnostics` and stopping there. Lox aborts a program on
    /// its first runtime fault rather than continuing past it.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for stmt in statements {
            if let Err(signal) = self.execute(stmt) {
                match signal {
                    Signal::Error(err, line, Some(lexeme)) => {
                        diagnostics.report_runtime_at(line, lexeme, err.to_string());
                    }
                    Signal::Error(err, line, None) => {
                        diagnostics.report_runtime(line, err.to_string());
                    }
                    Signal::Return(_) => {
                        // `return` outside any function is rejected by the
                        // resolver; reaching here would be a bug, not a
                        // user-facing error, so it is silently absorbed.
                    }
                }
                return;
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(())
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(expression)?;
                println!("{value}");
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Object::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(())
            }
            Stmt::Block { statements } => {
                let enclosing = EnvHandle::with_enclosing(self.environment.clone());
                self.execute_block(statements, enclosing)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function { declaration } => {
                let callable = Callable::Interpreted {
                    declaration: declaration.clone(),
                    closure: self.environment.clone(),
                    is_initializer: false,
                };
                self.environment
                    .define(&declaration.name.lexeme, Object::Callable(callable));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Object::Nil,
                };
                Err(Signal::Return(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> ExecResult {
        let super_type = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Object::Type(t) => Some(t),
                _ => {
                    return Err(match expr {
                        Expr::Variable { name, .. } => {
                            fault(RuntimeError::SuperclassMustBeClass, name)
                        }
                        _ => Signal::Error(RuntimeError::SuperclassMustBeClass, 0, None),
                    });
                }
            },
            None => None,
        };

        self.environment.define(&name.lexeme, Object::Nil);

        let method_env = if let Some(super_type) = &super_type {
            let env = EnvHandle::with_enclosing(self.environment.clone());
            env.define("super", Object::Type(super_type.clone()));
            env
        } else {
            self.environment.clone()
        };

        let class = Type::new(Rc::from(name.lexeme.as_str()), super_type);
        for method in methods {
            let callable = Callable::Interpreted {
                declaration: method.clone(),
                closure: method_env.clone(),
                is_initializer: method.name.lexeme == "init",
            };
            class
                .methods
                .borrow_mut()
                .insert(method.name.lexeme.clone(), callable);
        }

        self.environment
            .assign(&name.lexeme, Object::Type(class))
            .map_err(|e| fault(e, name))?;
        Ok(())
    }

    fn execute_block(&mut self, statements: &[Stmt], enclosing: EnvHandle) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, enclosing);
        let result = (|| {
            for stmt in statements {
                self.execute(stmt)?;
            }
            Ok(())
        })();
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_to_object(value)),
            Expr::Grouping { expression, .. } => self.evaluate(expression),
            Expr::Unary {
                operator, right, ..
            } => self.evaluate_unary(operator, right),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => self.evaluate_binary(left, operator, right),
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => self.evaluate_logical(left, operator, right),
            Expr::Variable { id, name } => self.lookup_variable(name, *id),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&distance) => self
                        .environment
                        .assign_at(distance, &name.lexeme, value.clone())
                        .map_err(|e| fault(e, name))?,
                    None => self
                        .globals
                        .assign(&name.lexeme, value.clone())
                        .map_err(|e| fault(e, name))?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
                ..
            } => self.evaluate_call(callee, paren, arguments),
            Expr::Get { object, name, .. } => {
                let object = self.evaluate(object)?;
                match object {
                    Object::Instance(instance) => Instance::get(&instance, &name.lexeme)
                        .ok_or_else(|| {
                            fault(RuntimeError::UndefinedProperty(name.lexeme.clone()), name)
                        }),
                    _ => Err(fault(RuntimeError::OnlyInstancesHaveProperties, name)),
                }
            }
            Expr::Set {
                object,
                name,
                value,
                ..
            } => {
                let object = self.evaluate(object)?;
                match object {
                    Object::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance.borrow_mut().set(&name.lexeme, value.clone());
                        Ok(value)
                    }
                    _ => Err(fault(RuntimeError::OnlyInstancesHaveFields, name)),
                }
            }
            Expr::This { id, keyword } => self.lookup_variable(keyword, *id),
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn lookup_variable(&self, name: &Token, id: NodeId) -> EvalResult {
        let result = match self.locals.get(&id) {
            Some(&distance) => self.environment.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        result.map_err(|e| fault(e, name))
    }

    fn evaluate_super(&mut self, id: NodeId, keyword: &Token, method: &Token) -> EvalResult {
        let distance = *self
            .locals
            .get(&id)
            .expect("resolver always annotates 'super' references");
        let superclass = self
            .environment
            .get_at(distance, "super")
            .map_err(|e| fault(e, keyword))?;
        let instance = self
            .environment
            .get_at(distance - 1, "this")
            .map_err(|e| fault(e, keyword))?;

        let (Object::Type(superclass), Object::Instance(instance)) = (superclass, instance) else {
            unreachable!("resolver guarantees 'super'/'this' bindings are class/instance values")
        };

        let bound = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| fault(RuntimeError::UndefinedProperty(method.lexeme.clone()), method))?
            .bind(instance);
        Ok(Object::Callable(bound))
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> EvalResult {
        let callee = self.evaluate(callee)?;
        let mut evaluated = Vec::with_capacity(arguments.len());
        for arg in arguments {
            evaluated.push(self.evaluate(arg)?);
        }

        let callable = match callee {
            Object::Callable(c) => c,
            Object::Type(class) => class.constructor(),
            _ => return Err(fault(RuntimeError::NotCallable, paren)),
        };

        if evaluated.len() != callable.arity() {
            return Err(fault(
                RuntimeError::WrongArity {
                    expected: callable.arity(),
                    got: evaluated.len(),
                },
                paren,
            ));
        }

        self.call(&callable, evaluated, paren.line)
    }

    fn call(&mut self, callable: &Callable, arguments: Vec<Object>, line: u32) -> EvalResult {
        match callable {
            Callable::Native { function, .. } => {
                function(self, &arguments).map_err(|e| Signal::Error(e, line, None))
            }
            Callable::Interpreted {
                declaration,
                closure,
                is_initializer,
            } => {
                let call_env = EnvHandle::with_enclosing(closure.clone());
                for (param, arg) in declaration.params.iter().zip(arguments) {
                    call_env.define(&param.lexeme, arg);
                }
                let previous = std::mem::replace(&mut self.environment, call_env.clone());
                let result = (|| -> ExecResult {
                    for stmt in &declaration.body {
                        self.execute(stmt)?;
                    }
                    Ok(())
                })();
                self.environment = previous;

                match result {
                    Ok(()) => {
                        if *is_initializer {
                            call_env
                                .get_at(0, "this")
                                .map_err(|e| Signal::Error(e, line, None))
                        } else {
                            Ok(Object::Nil)
                        }
                    }
                    Err(Signal::Return(value)) => {
                        if *is_initializer {
                            call_env
                                .get_at(0, "this")
                                .map_err(|e| Signal::Error(e, line, None))
                        } else {
                            Ok(value)
                        }
                    }
                    Err(err) => Err(err),
                }
            }
            Callable::Constructor { class } => {
                let instance = Rc::new(RefCell::new(Instance::new(class.clone())));
                if let Some(init) = class.find_method("init") {
                    let bound = init.bind(instance.clone());
                    self.call(&bound, arguments, line)?;
                }
                Ok(Object::Instance(instance))
            }
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left = self.evaluate(left)?;
        match operator.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::And if !left.is_truthy() => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let right = self.evaluate(right)?;
        match operator.kind {
            TokenKind::Minus => match right {
                Object::Number(n) => Ok(Object::Number(-n)),
                _ => Err(fault(RuntimeError::NotANumber, operator)),
            },
            TokenKind::Bang => Ok(Object::Bool(!right.is_truthy())),
            _ => unreachable!("parser only emits Minus/Bang as unary operators"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        use TokenKind::*;
        match operator.kind {
            Plus => match (left, right) {
                (Object::Number(a), Object::Number(b)) => Ok(Object::Number(a + b)),
                (Object::String(a), Object::String(b)) => {
                    Ok(Object::String(Rc::from(format!("{a}{b}"))))
                }
                _ => Err(fault(RuntimeError::NotTwoNumbersOrStrings, operator)),
            },
            Minus => numeric_binop(left, right, operator, |a, b| a - b),
            Star => numeric_binop(left, right, operator, |a, b| a * b),
            Slash => numeric_binop(left, right, operator, |a, b| a / b),
            Greater => comparison_binop(left, right, operator, |a, b| a > b),
            GreaterEqual => comparison_binop(left, right, operator, |a, b| a >= b),
            Less => comparison_binop(left, right, operator, |a, b| a < b),
            LessEqual => comparison_binop(left, right, operator, |a, b| a <= b),
            EqualEqual => Ok(Object::Bool(left.is_equal(&right))),
            BangEqual => Ok(Object::Bool(!left.is_equal(&right))),
            _ => unreachable!("parser only emits arithmetic/comparison operators as binary"),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric_binop(left: Object, right: Object, operator: &Token, f: impl Fn(f64, f64) -> f64) -> EvalResult {
    match (left, right) {
        (Object::Number(a), Object::Number(b)) => Ok(Object::Number(f(a, b))),
        _ => Err(fault(RuntimeError::NotNumbers, operator)),
    }
}

fn comparison_binop(
    left: Object,
    right: Object,
    operator: &Token,
    f: impl Fn(f64, f64) -> bool,
) -> EvalResult {
    match (left, right) {
        (Object::Number(a), Object::Number(b)) => Ok(Object::Bool(f(a, b))),
        _ => Err(fault(RuntimeError::NotNumbers, operator)),
    }
}

fn literal_to_object(literal: &Literal) -> Object {
    match literal {
        Literal::None => Object::Nil,
        Literal::Bool(b) => Object::Bool(*b),
        Literal::Number(n) => Object::Number(*n),
        Literal::String(s) => Object::String(Rc::from(s.as_str())),
    }
}

fn define_native(
    env: &EnvHandle,
    name: &str,
    arity: usize,
    function: impl Fn(&mut Interpreter, &[Object]) -> Result<Object, RuntimeError> + 'static,
) {
    env.define(
        name,
        Object::Callable(Callable::Native {
            name: Rc::from(name),
            arity,
            function: Rc::new(function),
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn run(src: &str) -> bool {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        if diagnostics.had_error() {
            return false;
        }
        let locals = Resolver::new().resolve(&statements, &mut diagnostics);
        if diagnostics.had_error() {
            return false;
        }
        let mut interpreter = Interpreter::new();
        interpreter.set_locals(locals);
        interpreter.interpret(&statements, &mut diagnostics);
        !diagnostics.had_runtime_error()
    }

    #[test]
    fn arithmetic_and_print_do_not_error() {
        assert!(run("print 1 + 2 * 3;"));
    }

    #[test]
    fn string_concatenation() {
        assert!(run(r#"print "a" + "b";"#));
    }

    #[test]
    fn closures_capture_enclosing_variable_by_reference() {
        let src = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        "#;
        assert!(run(src));
    }

    #[test]
    fn classes_support_single_inheritance_and_super() {
        let src = r#"
            class Animal {
                speak() { return "..."; }
            }
            class Dog < Animal {
                speak() { return "woof " + super.speak(); }
            }
            print Dog().speak();
        "#;
        assert!(run(src));
    }

    #[test]
    fn runtime_error_on_calling_non_callable() {
        assert!(!run("var x = 1; x();"));
    }

    #[test]
    fn runtime_error_on_wrong_arity() {
        assert!(!run("fun f(a) { return a; } f(1, 2);"));
    }

    #[test]
    fn init_always_returns_this_even_with_bare_return() {
        let src = r#"
            class Box {
                init(v) { this.v = v; return; }
            }
            print Box(3).v;
        "#;
        assert!(run(src));
    }
}

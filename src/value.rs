//! Dynamically-typed value used by the tree-walking evaluator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::ast::FunctionDecl;
use crate::environment::EnvHandle;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;

#[derive(Clone)]
pub enum Object {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Callable),
    Type(Rc<Type>),
    Instance(Rc<RefCell<Instance>>),
}

impl Object {
    /// Lox truthiness: everything is truthy except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Nil | Object::Bool(false))
    }

    /// Structural equality within the same kind; different kinds are never
    /// equal (mirrors jlox's `isEqual`).
    pub fn is_equal(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Nil, Object::Nil) => true,
            (Object::Bool(a), Object::Bool(b)) => a == b,
            (Object::Number(a), Object::Number(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Instance(a), Object::Instance(b)) => {
                Rc::ptr_eq(&a.borrow().class, &b.borrow().class)
            }
            (Object::Type(a), Object::Type(b)) => Rc::ptr_eq(a, b),
            (Object::Callable(a), Object::Callable(b)) => a.is_equal(b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Nil => "nil",
            Object::Bool(_) => "boolean",
            Object::Number(_) => "number",
            Object::String(_) => "string",
            Object::Callable(_) => "function",
            Object::Type(_) => "class",
            Object::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Nil => write!(f, "nil"),
            Object::Bool(b) => write!(f, "{b}"),
            Object::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Object::String(s) => write!(f, "{s}"),
            Object::Callable(c) => write!(f, "{c}"),
            Object::Type(t) => write!(f, "{}", t.name),
            Object::Instance(i) => write!(f, "{} instance", i.borrow().class.name),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &[Object]) -> Result<Object, RuntimeError>>;

/// The three ways a value can be callable, per the evaluator's call
/// protocol.
#[derive(Clone)]
pub enum Callable {
    Native {
        name: Rc<str>,
        arity: usize,
        function: NativeFn,
    },
    Interpreted {
        declaration: Rc<FunctionDecl>,
        closure: EnvHandle,
        is_initializer: bool,
    },
    Constructor {
        class: Rc<Type>,
    },
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native { arity, .. } => *arity,
            Callable::Interpreted { declaration, .. } => declaration.params.len(),
            Callable::Constructor { class } => class
                .find_method("init")
                .map(|init| init.arity())
                .unwrap_or(0),
        }
    }

    /// Re-bind an interpreted method's closure so `this` resolves to the
    /// given instance, matching jlox's `bind`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Callable {
        match self {
            Callable::Interpreted {
                declaration,
                closure,
                is_initializer,
            } => {
                let env = EnvHandle::with_enclosing(closure.clone());
                env.define("this", Object::Instance(instance));
                Callable::Interpreted {
                    declaration: declaration.clone(),
                    closure: env,
                    is_initializer: *is_initializer,
                }
            }
            other => other.clone(),
        }
    }

    /// Same variant and same identity fields: a native fn compares by its
    /// function pointer, an interpreted closure by declaration + closure +
    /// init-flag, a constructor by its class.
    pub fn is_equal(&self, other: &Callable) -> bool {
        match (self, other) {
            (
                Callable::Native { function: a, .. },
                Callable::Native { function: b, .. },
            ) => Rc::ptr_eq(a, b),
            (
                Callable::Interpreted {
                    declaration: d1,
                    closure: c1,
                    is_initializer: i1,
                },
                Callable::Interpreted {
                    declaration: d2,
                    closure: c2,
                    is_initializer: i2,
                },
            ) => Rc::ptr_eq(d1, d2) && c1.ptr_eq(c2) && i1 == i2,
            (Callable::Constructor { class: a }, Callable::Constructor { class: b }) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "<native fn {name}>"),
            Callable::Interpreted { declaration, .. } => {
                write!(f, "<fn {}>", declaration.name.lexeme)
            }
            Callable::Constructor { class } => write!(f, "<class {}>", class.name),
        }
    }
}

/// A class. Holds a weak self-reference so its `Constructor` callable can
/// point back without creating an `Rc` cycle (see the design notes on
/// reference-counted cycles).
pub struct Type {
    pub name: Rc<str>,
    pub superclass: Option<Rc<Type>>,
    pub methods: RefCell<HashMap<String, Callable>>,
    self_ref: RefCell<Weak<Type>>,
}

impl Type {
    pub fn new(name: Rc<str>, superclass: Option<Rc<Type>>) -> Rc<Type> {
        let this = Rc::new(Type {
            name,
            superclass,
            methods: RefCell::new(HashMap::new()),
            self_ref: RefCell::new(Weak::new()),
        });
        *this.self_ref.borrow_mut() = Rc::downgrade(&this);
        this
    }

    pub fn find_method(&self, name: &str) -> Option<Callable> {
        if let Some(method) = self.methods.borrow().get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref()?.find_method(name)
    }

    pub fn constructor(&self) -> Callable {
        let class = self
            .self_ref
            .borrow()
            .upgrade()
            .expect("type outlives its own constructor");
        Callable::Constructor { class }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub struct Instance {
    pub class: Rc<Type>,
    pub fields: HashMap<String, Object>,
}

impl Instance {
    pub fn new(class: Rc<Type>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn get(self_rc: &Rc<RefCell<Instance>>, name: &str) -> Option<Object> {
        if let Some(value) = self_rc.borrow().fields.get(name) {
            return Some(value.clone());
        }
        let method = self_rc.borrow().class.find_method(name)?;
        Some(Object::Callable(method.bind(self_rc.clone())))
    }

    pub fn set(&mut self, name: &str, value: Object) {
        self.fields.insert(name.to_string(), value);
    }
}

//! Lexical environment: a cactus stack of variable scopes.
//!
//! Shared via `Rc<RefCell<..>>` so that closures capturing an enclosing
//! scope observe later mutations to it, matching jlox's
//! `environment::make(enclosing)` chaining.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::Object;

struct EnvironmentData {
    values: HashMap<String, Object>,
    enclosing: Option<EnvHandle>,
}

/// A handle to a shared, mutable environment. Cheap to clone.
#[derive(Clone)]
pub struct EnvHandle(Rc<RefCell<EnvironmentData>>);

impl EnvHandle {
    pub fn new() -> Self {
        EnvHandle(Rc::new(RefCell::new(EnvironmentData {
            values: HashMap::new(),
            enclosing: None,
        })))
    }

    pub fn with_enclosing(enclosing: EnvHandle) -> Self {
        EnvHandle(Rc::new(RefCell::new(EnvironmentData {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        })))
    }

    /// Bind a new variable in this scope, shadowing any existing binding
    /// of the same name (redeclaration is legal at global/local scope).
    pub fn define(&self, name: &str, value: Object) {
        self.0.borrow_mut().values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Result<Object, RuntimeError> {
        let data = self.0.borrow();
        if let Some(value) = data.values.get(name) {
            return Ok(value.clone());
        }
        if let Some(enclosing) = &data.enclosing {
            return enclosing.get(name);
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    pub fn assign(&self, name: &str, value: Object) -> Result<(), RuntimeError> {
        let mut data = self.0.borrow_mut();
        if data.values.contains_key(name) {
            data.values.insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(enclosing) = data.enclosing.clone() {
            drop(data);
            return enclosing.assign(name, value);
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Walk `distance` enclosing scopes up, as computed by the resolver.
    fn ancestor(&self, distance: usize) -> EnvHandle {
        let mut env = self.clone();
        for _ in 0..distance {
            let next = env
                .0
                .borrow()
                .enclosing
                .clone()
                .expect("resolver distance outruns the environment chain");
            env = next;
        }
        env
    }

    pub fn get_at(&self, distance: usize, name: &str) -> Result<Object, RuntimeError> {
        let env = self.ancestor(distance);
        let data = env.0.borrow();
        data.values
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: Object) -> Result<(), RuntimeError> {
        let env = self.ancestor(distance);
        let mut data = env.0.borrow_mut();
        if data.values.contains_key(name) {
            data.values.insert(name.to_string(), value);
            Ok(())
        } else {
            Err(RuntimeError::UndefinedVariable(name.to_string()))
        }
    }

    /// Whether two handles share the same underlying scope.
    pub fn ptr_eq(&self, other: &EnvHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for EnvHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_and_reads_variables() {
        let env = EnvHandle::new();
        env.define("x", Object::Number(1.0));
        assert!(matches!(env.get("x"), Ok(Object::Number(n)) if n == 1.0));
    }

    #[test]
    fn reads_through_enclosing_scope() {
        let global = EnvHandle::new();
        global.define("x", Object::Number(1.0));
        let local = EnvHandle::with_enclosing(global);
        assert!(matches!(local.get("x"), Ok(Object::Number(n)) if n == 1.0));
    }

    #[test]
    fn assign_fails_on_undefined_variable() {
        let env = EnvHandle::new();
        assert!(env.assign("missing", Object::Nil).is_err());
    }

    #[test]
    fn assign_mutates_enclosing_scope_visibly_to_closures() {
        let global = EnvHandle::new();
        global.define("x", Object::Number(1.0));
        let local = EnvHandle::with_enclosing(global.clone());
        local.assign("x", Object::Number(2.0)).unwrap();
        assert!(matches!(global.get("x"), Ok(Object::Number(n)) if n == 2.0));
    }

    #[test]
    fn get_at_resolves_correct_ancestor() {
        let global = EnvHandle::new();
        global.define("x", Object::Number(1.0));
        let local = EnvHandle::with_enclosing(global);
        local.define("x", Object::Number(2.0));
        assert!(matches!(local.get_at(0, "x"), Ok(Object::Number(n)) if n == 2.0));
        assert!(matches!(local.get_at(1, "x"), Ok(Object::Number(n)) if n == 1.0));
    }
}

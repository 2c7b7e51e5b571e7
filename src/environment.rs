//! Lexical scope chain with access-modified bindings.
//!
//! Scopes are reference-counted (`Rc<RefCell<Environment>>`) rather than a
//! flat stack, the way the type checker's scope frames are, because
//! closures here must capture a specific point in the chain and keep it
//! alive independently of the call frame that created it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Access;
use crate::error::{self, LapisResult};
use crate::source_map::Span;
use crate::value::Value;

pub type EnvRef = Rc<RefCell<Environment>>;

struct Binding {
    value: Value,
    access: Access,
}

#[derive(Default)]
pub struct Environment {
    enclosing: Option<EnvRef>,
    values: HashMap<String, Binding>,
}

impl Environment {
    pub fn new_root() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn new_child(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            enclosing: Some(Rc::clone(enclosing)),
            values: HashMap::new(),
        }))
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value, access: Access) {
        self.values.insert(name.into(), Binding { value, access });
    }

    /// Look up `name`, walking outward through enclosing scopes.
    /// `from_external_file` gates private bindings declared in a different
    /// module's globals (see [`crate::error::access_violation`]).
    pub fn get(&self, name: &str, span: Span, from_external_file: bool) -> LapisResult<Value> {
        if let Some(binding) = self.values.get(name) {
            return if binding.can_access(from_external_file) {
                Ok(binding.value.clone())
            } else {
                Err(error::access_violation(span, name))
            };
        }
        match &self.enclosing {
            Some(parent) => parent.borrow().get(name, span, from_external_file),
            None => Err(error::undefined_variable(span, name)),
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, span: Span, from_external_file: bool) -> LapisResult<()> {
        if let Some(binding) = self.values.get_mut(name) {
            return if binding.can_access(from_external_file) {
                binding.value = value;
                Ok(())
            } else {
                Err(error::access_violation(span, name))
            };
        }
        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value, span, from_external_file),
            None => Err(error::undefined_variable(span, name)),
        }
    }

    /// All bindings marked `public` in this scope only (used when copying a
    /// module's exports into an importer).
    pub fn get_all_public(&self) -> HashMap<String, Value> {
        self.values
            .iter()
            .filter(|(_, b)| b.access == Access::Public)
            .map(|(name, b)| (name.clone(), b.value.clone()))
            .collect()
    }

    pub fn get_public(&self, name: &str) -> Option<Value> {
        self.values.get(name).filter(|b| b.access == Access::Public).map(|b| b.value.clone())
    }
}

impl Binding {
    fn can_access(&self, from_external_file: bool) -> bool {
        self.access == Access::Public || !from_external_file
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

pub type EnvRef = Rc<RefCell<Env>>;

/// A lexically chained binding environment. Module scope is an `Env` with
/// no parent; each function call gets a child of the function's defining
/// environment.
#[derive(Debug)]
pub struct Env {
    vars: HashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Env {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Env {
            vars: HashMap::new(),
            parent: None,
        }))
    }

    pub fn with_parent(parent: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Env {
            vars: HashMap::new(),
            parent: Some(parent),
        }))
    }

    pub fn get(env: &EnvRef, name: &str) -> Option<Value> {
        let borrowed = env.borrow();
        if let Some(value) = borrowed.vars.get(name) {
            return Some(value.clone());
        }
        match &borrowed.parent {
            Some(parent) => Env::get(parent, name),
            None => None,
        }
    }

    /// Bind `name` in this environment (assignment is local-by-default).
    pub fn set(env: &EnvRef, name: &str, value: Value) {
        env.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Flatten every binding visible from `env` into a fresh parentless
    /// environment: outer bindings first, inner bindings overriding. This
    /// is the namespace copy used when re-materializing a transformed
    /// function, standing in for "copy of globals plus populated closure
    /// cells".
    pub fn flattened_copy(env: &EnvRef) -> EnvRef {
        fn collect(env: &EnvRef, into: &mut HashMap<String, Value>) {
            let borrowed = env.borrow();
            if let Some(parent) = &borrowed.parent {
                collect(parent, into);
            }
            for (name, value) in &borrowed.vars {
                into.insert(name.clone(), value.clone());
            }
        }

        let mut vars = HashMap::new();
        collect(env, &mut vars);
        Rc::new(RefCell::new(Env { vars, parent: None }))
    }
}

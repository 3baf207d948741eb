use crate::value::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One frame of the scope chain.
///
/// Frames are shared (`Rc<RefCell<_>>`): a closure keeps its declaring frame
/// alive after the block or call that created it has returned.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A root frame (the globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn enclosing(&self) -> Option<Rc<RefCell<Environment>>> {
        self.enclosing.clone()
    }

    /// Bind `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define '{}' = {}", name, value);
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this frame, then outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Returns `false`
    /// when no frame on the chain declares it.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// Names bound directly in this frame.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The frame exactly `distance` links out from `env`.
pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
    let mut frame: Rc<RefCell<Environment>> = Rc::clone(env);

    for _ in 0..distance {
        let next = frame.borrow().enclosing()?;
        frame = next;
    }

    Some(frame)
}

/// Read `name` from the frame `distance` hops out, without searching further.
pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
    let frame = ancestor(env, distance)?;
    let value = frame.borrow().values.get(name).cloned();
    value
}

/// Write `name` in the frame `distance` hops out.  Returns `false` if that
/// frame does not exist or does not bind `name`.
pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) -> bool {
    let Some(frame) = ancestor(env, distance) else {
        return false;
    };

    let mut frame = frame.borrow_mut();

    match frame.values.get_mut(name) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Rc<RefCell<Environment>>, Rc<RefCell<Environment>>) {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(&globals))));
        inner.borrow_mut().define("a", Value::Number(2.0));

        (globals, inner)
    }

    #[test]
    fn get_prefers_innermost_binding() {
        let (_, inner) = chain();
        assert_eq!(inner.borrow().get("a"), Some(Value::Number(2.0)));
        assert_eq!(inner.borrow().get("missing"), None);
    }

    #[test]
    fn distance_lookup_skips_shadowing_frames() {
        let (globals, inner) = chain();

        assert_eq!(get_at(&inner, 0, "a"), Some(Value::Number(2.0)));
        assert_eq!(get_at(&inner, 1, "a"), Some(Value::Number(1.0)));
        assert_eq!(get_at(&inner, 2, "a"), None);

        assert!(assign_at(&inner, 1, "a", Value::Number(10.0)));
        assert_eq!(globals.borrow().get("a"), Some(Value::Number(10.0)));
        assert_eq!(get_at(&inner, 0, "a"), Some(Value::Number(2.0)));
    }

    #[test]
    fn assign_requires_existing_binding() {
        let (globals, inner) = chain();

        assert!(!inner.borrow_mut().assign("b", Value::Nil));
        assert!(inner.borrow_mut().assign("a", Value::Bool(true)));
        assert_eq!(globals.borrow().get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn frames_outlive_their_creator() {
        let (globals, inner) = chain();
        let captured = Rc::clone(&inner);
        drop(inner);

        assert_eq!(captured.borrow().get("a"), Some(Value::Number(2.0)));
        assert_eq!(Rc::strong_count(&globals), 2);
    }
}

//! Things that can appear to the left of `( … )`.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::class::LoxInstance;
use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Exec, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// A value the interpreter can invoke.  Arity is checked by the caller
/// before `call` runs.
pub trait Callable {
    fn arity(&self) -> usize;

    /// `paren` is the call's closing parenthesis, used to position errors.
    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value>;
}

/// A user‑defined function or method together with the frame it was
/// declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }

    /// Initializers always hand back the receiver.
    fn bound_this(&self) -> Value {
        environment::get_at(&self.closure, 0, "this").unwrap_or(Value::Nil)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        _paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // The new frame hangs off the declaration site, not the caller.
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, argument);
        }

        let flow: Exec =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)))?;

        if self.is_initializer {
            return Ok(self.bound_this());
        }

        match flow {
            Exec::Return(value) => Ok(value),
            Exec::Continue => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for LoxFunction {
    // The closure may (indirectly) contain this function; never print it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call<W: Write>(
        &self,
        _interpreter: &mut Interpreter<W>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// `clock()`: milliseconds since the Unix epoch.
pub fn clock() -> NativeFunction {
    NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args: &[Value]| Ok(Value::Number(Utc::now().timestamp_millis() as f64)),
    }
}

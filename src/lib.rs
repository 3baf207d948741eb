//! A tree‑walking interpreter for Lox.
//!
//! The pipeline is strictly staged: [`scanner::scan`] → [`parser::Parser`] →
//! [`resolver::Resolver`] → [`interpreter::Interpreter`].  Every stage reports
//! problems into one [`Diagnostics`] value owned by the caller.  [`Lox`] wires
//! the stages together for a file run or a REPL session.

pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::io::{self, Stdout, Write};

use log::{debug, info};

pub use diagnostics::Diagnostics;
pub use error::{LoxError, Result};

use expr::ExprId;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;

/// An interpreter session.  Globals, closures and resolved bindings survive
/// from one [`Lox::run`] to the next.
pub struct Lox<W: Write = Stdout> {
    interpreter: Interpreter<W>,
    diagnostics: Diagnostics,
    next_id: ExprId,
}

impl Lox<Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Lox<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Lox<W> {
    pub fn with_output(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            diagnostics: Diagnostics::new(),
            next_id: ExprId(0),
        }
    }

    /// Scan, parse, resolve and execute `source`.
    ///
    /// Resolution only starts if scanning and parsing were clean, and
    /// execution only if resolution was.  Outcomes are left in
    /// [`Lox::diagnostics`].
    pub fn run(&mut self, source: &str) {
        let tokens = scanner::scan(source, &mut self.diagnostics);

        let mut parser = Parser::starting_at(&tokens, self.next_id);
        let statements = parser.parse(&mut self.diagnostics);
        self.next_id = parser.next_id();

        if self.diagnostics.had_error() {
            debug!("Static errors after parsing; not resolving");
            return;
        }

        Resolver::new(&mut self.interpreter, &mut self.diagnostics).resolve(&statements);

        if self.diagnostics.had_error() {
            debug!("Static errors after resolving; not interpreting");
            return;
        }

        self.interpreter.interpret(&statements, &mut self.diagnostics);

        info!("Run finished");
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    /// Everything `print` has written so far (for in‑memory writers).
    pub fn output(&self) -> &W {
        self.interpreter.output()
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use log::{debug, info, trace};

use crate::callable::{self, Callable, LoxFunction};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::diagnostics::Diagnostics;
use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement.
///
/// `Return` unwinds through enclosing blocks, `if`s and loops until the
/// nearest function call consumes it.  It is control flow, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Exec {
    Continue,
    Return(Value),
}

/// Tree‑walking evaluator.  `print` output goes to `W` (stdout by default).
pub struct Interpreter<W: Write = Stdout> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Binding distance per resolved local reference.  Absent ⇒ global.
    locals: HashMap<ExprId, usize>,
    out: W,
}

impl Interpreter<Stdout> {
    /// Creates a new Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");
        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(Rc::new(callable::clock())));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Names currently bound in the global frame.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    /// Called by the resolver: the reference `id` lives `depth` frames out.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        trace!("Reference {} resolved at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Recorded distance for `id`, if the resolver found it in a local scope.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Runs a program.  The first runtime error is reported to
    /// `diagnostics` and stops execution.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error, aborting: {}", e);
                diagnostics.report(e);
                return;
            }
        }

        if let Err(e) = self.out.flush() {
            diagnostics.report(e.into());
            return;
        }

        info!("Interpretation completed successfully");
    }

    // ───────────────────────────── statements ─────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Exec> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, Rc::new(RefCell::new(env)));
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Exec::Return(value) = self.execute(body)? {
                        return Ok(Exec::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                return Ok(Exec::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Exec::Continue)
    }

    /// Runs `statements` in `env`, restoring the current frame afterwards
    /// whether they finish, return or fail.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<Exec> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut outcome: Result<Exec> = Ok(Exec::Continue);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Exec::Continue) => {}
                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;

        outcome
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };

                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra frame holding `super`.
        let enclosing: Option<Rc<RefCell<Environment>>> = superclass.as_ref().map(|parent| {
            let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
            env.define("super", Value::Class(Rc::clone(parent)));

            std::mem::replace(&mut self.environment, Rc::new(RefCell::new(env)))
        });

        let table: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    method.name.lexeme == INITIALIZER,
                );

                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, table);

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ──────────────────────────── expressions ─────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Yields the deciding operand itself, not a coerced boolean.
                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, &name.lexeme, value.clone())
                    }
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(undefined_variable(name));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                trace!("Calling a {} with {} arguments", callee.type_name(), values.len());

                match callee {
                    Value::Function(function) => self.invoke(function.as_ref(), paren, values),
                    Value::NativeFunction(native) => self.invoke(native.as_ref(), paren, values),
                    Value::Class(class) => self.invoke(&class, paren, values),
                    _ => Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    )),
                }
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Arity check, then hand over to the callee.
    fn invoke<C: Callable>(
        &mut self,
        callee: &C,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        if arguments.len() != callee.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callee.arity(),
                    arguments.len()
                ),
            ));
        }

        callee.call(self, paren, arguments)
    }

    /// Resolved references jump straight to their frame; the rest are
    /// looked up in the globals.
    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        let found = match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        found.ok_or_else(|| undefined_variable(name))
    }

    /// `super.method`: look up from the superclass of the class that
    /// lexically encloses the call, bound to the current `this`.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| undefined_variable(keyword))?;

        let Some(Value::Class(superclass)) =
            environment::get_at(&self.environment, distance, "super")
        else {
            return Err(undefined_variable(keyword));
        };

        // `this` lives in the frame just inside the one holding `super`.
        let this = distance
            .checked_sub(1)
            .and_then(|d| environment::get_at(&self.environment, d, "this"));

        let Some(Value::Instance(object)) = this else {
            return Err(LoxError::runtime(keyword, "Undefined variable 'this'."));
        };

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

/// Both operands as numbers, or the shared type error.
fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    trace!(
        "Binary '{}' on {} and {}",
        operator.lexeme,
        left.type_name(),
        right.type_name()
    );

    let value = match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::String(a + &b),
            _ => {
                return Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                ))
            }
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a - b)
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a * b)
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;

            // A zero on either side is rejected rather than producing inf/NaN.
            if a == 0.0 || b == 0.0 {
                return Err(LoxError::runtime(operator, "Division by zero."));
            }

            Value::Number(a / b)
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a > b)
        }

        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a >= b)
        }

        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a < b)
        }

        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a <= b)
        }

        TokenType::EQUAL_EQUAL => Value::Bool(left == right),

        TokenType::BANG_EQUAL => Value::Bool(left != right),

        _ => return Err(LoxError::runtime(operator, "Invalid binary operator.")),
    };

    Ok(value)
}

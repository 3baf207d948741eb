use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};

/// Renders syntax trees in a parenthesized prefix form, e.g.
/// `(* (- 123.0) (group 45.67))`.  Debug output only.
pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.lexeme, &[&**left, &**right]),

            Expr::Unary { operator, right } => self.parenthesize(&operator.lexeme, &[&**right]),

            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(inner) => self.parenthesize("group", &[&**inner]),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut parts: Vec<String> = vec![self.print(callee)];
                parts.extend(arguments.iter().map(|a| self.print(a)));

                format!("(call {})", parts.join(" "))
            }

            Expr::Get { object, name } => format!("(. {} {})", self.print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} = {})", name.lexeme, self.print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => format!("(block{})", self.print_body(statements)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if-else {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            Stmt::Function(declaration) => format!("(fun {})", self.print_function(declaration)),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", self.print(expr)),
                None => "(return)".to_string(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out: String = format!("(class {}", name.lexeme);

                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.print(superclass)));
                }

                for method in methods {
                    out.push_str(&format!(" {}", self.print_function(method)));
                }

                out.push(')');
                out
            }
        }
    }

    fn print_function(&self, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect();

        format!(
            "{}({}){}",
            declaration.name.lexeme,
            params.join(" "),
            self.print_body(&declaration.body)
        )
    }

    fn print_body(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|s| format!(" {}", self.print_stmt(s)))
            .collect()
    }

    fn parenthesize(&self, name: &str, exprs: &[&Expr]) -> String {
        let mut out: String = format!("({}", name);

        for expr in exprs {
            out.push(' ');
            out.push_str(&self.print(expr));
        }

        out.push(')');
        out
    }
}

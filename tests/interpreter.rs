use pretty_assertions::assert_eq;

use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner;
use rox::{Diagnostics, Lox};

/// Evaluate a single expression, rendering the value or the runtime error.
fn evaluate(source: &str) -> Result<String, String> {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(source, &mut diagnostics);

    let expr = Parser::new(&tokens)
        .parse_expression(&mut diagnostics)
        .expect("expression should parse");
    assert!(!diagnostics.had_error());

    let mut interpreter = Interpreter::with_output(Vec::new());

    interpreter
        .evaluate(&expr)
        .map(|value| value.to_string())
        .map_err(|e| e.to_string())
}

/// Run a whole program, returning (stdout, reports).
fn run(source: &str) -> (String, Vec<String>) {
    let mut lox = Lox::with_output(Vec::new());
    lox.run(source);

    let stdout = String::from_utf8_lossy(lox.output()).into_owned();
    let reports = lox
        .diagnostics()
        .reports()
        .iter()
        .map(|e| e.to_string())
        .collect();

    (stdout, reports)
}

fn stdout_of(source: &str) -> String {
    let (stdout, reports) = run(source);
    assert!(reports.is_empty(), "unexpected reports: {:?}", reports);
    stdout
}

// ───────────────────────────── expressions ─────────────────────────────

#[test]
fn arithmetic_and_concatenation() {
    assert_eq!(evaluate("1 + 1"), Ok("2".to_string()));
    assert_eq!(evaluate("(10 + 12) * 1"), Ok("22".to_string()));
    assert_eq!(evaluate("3 * 7"), Ok("21".to_string()));
    assert_eq!(evaluate("7 / 2"), Ok("3.5".to_string()));
    assert_eq!(evaluate("-(2 - 5)"), Ok("3".to_string()));
    assert_eq!(evaluate("\"a\" + \"b\""), Ok("ab".to_string()));
}

#[test]
fn comparison_and_equality() {
    assert_eq!(evaluate("2 >= 2"), Ok("true".to_string()));
    assert_eq!(evaluate("1 < 0"), Ok("false".to_string()));
    assert_eq!(evaluate("nil == nil"), Ok("true".to_string()));
    assert_eq!(evaluate("nil == false"), Ok("false".to_string()));
    assert_eq!(evaluate("1 == \"1\""), Ok("false".to_string()));
    assert_eq!(evaluate("\"x\" != \"x\""), Ok("false".to_string()));
}

#[test]
fn truthiness() {
    assert_eq!(evaluate("!nil"), Ok("true".to_string()));
    assert_eq!(evaluate("!0"), Ok("false".to_string()));
    assert_eq!(evaluate("!\"\""), Ok("false".to_string()));
}

#[test]
fn logical_operators_yield_operands() {
    assert_eq!(evaluate("nil or \"yes\""), Ok("yes".to_string()));
    assert_eq!(evaluate("1 and 2"), Ok("2".to_string()));
    assert_eq!(evaluate("false and undefined"), Ok("false".to_string()));
    assert_eq!(evaluate("1 or undefined"), Ok("1".to_string()));
}

#[test]
fn operand_type_errors() {
    assert_eq!(
        evaluate("\"a\" + 4"),
        Err("Operands must be two numbers or two strings.\n[line 1]".to_string())
    );
    assert_eq!(
        evaluate("4 > true"),
        Err("Operands must be numbers.\n[line 1]".to_string())
    );
    assert_eq!(
        evaluate("1 + 10 * false"),
        Err("Operands must be numbers.\n[line 1]".to_string())
    );
    assert_eq!(
        evaluate("(1 + \"3\") * 2"),
        Err("Operands must be two numbers or two strings.\n[line 1]".to_string())
    );
    assert_eq!(
        evaluate("-\"x\""),
        Err("Operand must be a number.\n[line 1]".to_string())
    );
}

#[test]
fn division_by_zero() {
    assert_eq!(evaluate("0 / 0"), Err("Division by zero.\n[line 1]".to_string()));
    assert_eq!(evaluate("1 / 0"), Err("Division by zero.\n[line 1]".to_string()));
    assert_eq!(evaluate("0 / 5"), Err("Division by zero.\n[line 1]".to_string()));
    assert_eq!(evaluate("-4 / 2"), Ok("-2".to_string()));
}

#[test]
fn undefined_global() {
    assert_eq!(
        evaluate("missing"),
        Err("Undefined variable 'missing'.\n[line 1]".to_string())
    );
}

// ───────────────────────────── statements ──────────────────────────────

#[test]
fn variables_and_scopes() {
    assert_eq!(
        stdout_of(
            "var a = \"global\";\n\
             { var a = \"outer\"; { var a = \"inner\"; print a; } print a; }\n\
             print a;"
        ),
        "inner\nouter\nglobal\n"
    );
}

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(stdout_of("var a; print a;"), "nil\n");
}

#[test]
fn control_flow_statements() {
    assert_eq!(
        stdout_of(
            "for (var i = 0; i < 3; i = i + 1) print i;\n\
             var n = 0; while (n < 2) n = n + 1; print n;\n\
             if (n == 2) print \"two\"; else print \"other\";"
        ),
        "0\n1\n2\n2\ntwo\n"
    );
}

#[test]
fn closures_capture_by_reference() {
    assert_eq!(
        stdout_of(
            "fun makeCounter() {\n\
               var i = 0;\n\
               fun count() { i = i + 1; print i; }\n\
               return count;\n\
             }\n\
             var counter = makeCounter();\n\
             counter();\n\
             counter();"
        ),
        "1\n2\n"
    );
}

#[test]
fn closures_bind_statically() {
    // The resolver pins `a` to the global even after a shadowing local.
    assert_eq!(
        stdout_of(
            "var a = \"global\";\n\
             {\n\
               fun showA() { print a; }\n\
               showA();\n\
               var a = \"block\";\n\
               showA();\n\
             }"
        ),
        "global\nglobal\n"
    );
}

#[test]
fn recursion_and_early_return() {
    assert_eq!(
        stdout_of(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
             print fib(10);\n\
             fun find() { for (var i = 0; i < 10; i = i + 1) { if (i == 3) return i; } }\n\
             print find();\n\
             fun nothing() {}\n\
             print nothing();"
        ),
        "55\n3\nnil\n"
    );
}

#[test]
fn functions_display() {
    assert_eq!(
        stdout_of("fun f() {} print f; print clock; class C {} print C; print C();"),
        "<fn f>\n<native fn>\nC\nC instance\n"
    );
}

#[test]
fn clock_returns_a_number() {
    let mut lox = Lox::with_output(Vec::new());
    lox.run("var t = clock(); print t > 0;");

    assert_eq!(String::from_utf8_lossy(lox.output()), "true\n");
}

// ─────────────────────────────── classes ───────────────────────────────

#[test]
fn fields_and_methods() {
    assert_eq!(
        stdout_of(
            "class Point {\n\
               init(x, y) { this.x = x; this.y = y; }\n\
               sum() { return this.x + this.y; }\n\
             }\n\
             var p = Point(1, 2);\n\
             print p.sum();\n\
             p.x = 10;\n\
             print p.sum();\n\
             var m = p.sum;\n\
             print m();"
        ),
        "3\n12\n12\n"
    );
}

#[test]
fn init_runs_once_and_returns_instance() {
    assert_eq!(
        stdout_of(
            "class A { init() { print \"init\"; return; } }\n\
             var a = A();\n\
             print a.init();\n\
             print a;"
        ),
        "init\ninit\nA instance\nA instance\n"
    );
}

#[test]
fn super_calls_dispatch_to_superclass() {
    assert_eq!(
        stdout_of(
            "class A { method() { print \"A method\"; } }\n\
             class B < A {\n\
               method() { print \"B method\"; }\n\
               test() { super.method(); }\n\
             }\n\
             class C < B {}\n\
             C().test();"
        ),
        "A method\n"
    );
}

#[test]
fn inherited_methods_and_initializers() {
    assert_eq!(
        stdout_of(
            "class Base { init(n) { this.n = n; } get() { return this.n; } }\n\
             class Derived < Base {}\n\
             print Derived(7).get();"
        ),
        "7\n"
    );
}

#[test]
fn fields_shadow_methods() {
    assert_eq!(
        stdout_of(
            "class A { f() { return \"method\"; } }\n\
             var a = A();\n\
             fun g() { return \"field\"; }\n\
             a.f = g;\n\
             print a.f();"
        ),
        "field\n"
    );
}

// ──────────────────────────── runtime errors ───────────────────────────

#[test]
fn calling_a_non_callable() {
    let (_, reports) = run("\"not a function\"();");

    assert_eq!(reports, vec!["Can only call functions and classes.\n[line 1]"]);
}

#[test]
fn arity_mismatch() {
    let (_, reports) = run("fun f(a, b) {}\nf(1);");

    assert_eq!(reports, vec!["Expected 2 arguments but got 1.\n[line 2]"]);
}

#[test]
fn class_arity_follows_init() {
    let (_, reports) = run("class A { init(x) {} }\nA();");

    assert_eq!(reports, vec!["Expected 1 arguments but got 0.\n[line 2]"]);
}

#[test]
fn property_errors() {
    let (_, reports) = run("class A {}\nprint A().missing;");
    assert_eq!(reports, vec!["Undefined property 'missing'.\n[line 2]"]);

    let (_, reports) = run("var x = 1;\nprint x.y;");
    assert_eq!(reports, vec!["Only instances have properties.\n[line 2]"]);

    let (_, reports) = run("var x = 1;\nx.y = 2;");
    assert_eq!(reports, vec!["Only instances have fields.\n[line 2]"]);
}

#[test]
fn superclass_must_be_a_class() {
    let (_, reports) = run("var NotAClass = 1;\nclass A < NotAClass {}");

    assert_eq!(reports, vec!["Superclass must be a class.\n[line 2]"]);
}

#[test]
fn runtime_error_stops_the_program() {
    let (stdout, reports) = run("print 1;\nprint undefined;\nprint 2;");

    assert_eq!(stdout, "1\n");
    assert_eq!(reports, vec!["Undefined variable 'undefined'.\n[line 2]"]);
}

#[test]
fn assignment_to_undeclared_global() {
    let (_, reports) = run("x = 1;");

    assert_eq!(reports, vec!["Undefined variable 'x'.\n[line 1]"]);
}

#[test]
fn runtime_error_inside_block_restores_scope() {
    let mut lox = Lox::with_output(Vec::new());

    lox.run("var a = \"global\"; { var a = \"local\"; print nope; }");
    assert!(lox.diagnostics().had_runtime_error());

    lox.diagnostics_mut().reset_runtime_error();
    lox.run("print a;");

    assert_eq!(String::from_utf8_lossy(lox.output()), "global\n");
}

#[test]
fn values_compare_by_identity_for_objects() {
    assert_eq!(
        stdout_of(
            "class A {}\n\
             var a = A(); var b = A();\n\
             print a == a; print a == b;\n\
             fun f() {} print f == f;"
        ),
        "true\nfalse\ntrue\n"
    );
}

#[test]
fn globals_accumulate_across_runs() {
    let mut lox = Lox::with_output(Vec::new());
    lox.run("var c = clock;");
    lox.run("fun f() {}");

    let names = lox.interpreter().global_names();

    for expected in ["clock", "c", "f"] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }
}

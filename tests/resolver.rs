use pretty_assertions::assert_eq;

use rox::expr::ExprId;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner;
use rox::Diagnostics;

/// Parse and resolve `source`, handing back the interpreter that received
/// the binding distances.
fn resolve(source: &str) -> (Interpreter<Vec<u8>>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(source, &mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);
    assert!(!diagnostics.had_error(), "parse failed: {:?}", diagnostics.reports());

    let mut interpreter = Interpreter::with_output(Vec::new());
    Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);

    (interpreter, diagnostics)
}

fn errors(source: &str) -> Vec<String> {
    let (_, diagnostics) = resolve(source);
    diagnostics.reports().iter().map(|e| e.to_string()).collect()
}

#[test]
fn clean_program_has_no_errors() {
    assert!(errors("var a = 1; { var b = a; fun f(x) { return x + b; } print f(2); }").is_empty());
}

#[test]
fn local_read_in_own_initializer() {
    assert_eq!(
        errors("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_may_reference_itself() {
    assert!(errors("var a = 1; var a = a;").is_empty());
}

#[test]
fn top_level_return() {
    assert_eq!(
        errors("return 1;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn redeclaration_in_same_local_scope() {
    assert_eq!(
        errors("{\n  var a = 1;\n  var a = 2;\n}"),
        vec!["[line 3] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn shadowing_in_nested_scope_is_fine() {
    assert!(errors("{ var a = 1; { var a = 2; print a; } }").is_empty());
}

#[test]
fn duplicate_parameters() {
    assert_eq!(
        errors("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn this_outside_class() {
    assert_eq!(
        errors("print this;"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
    assert_eq!(
        errors("fun f() { return this; }"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
}

#[test]
fn super_misuse() {
    assert_eq!(
        errors("fun f() { super.g(); }"),
        vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
    );
    assert_eq!(
        errors("class A { f() { super.g(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
}

#[test]
fn class_inheriting_from_itself() {
    assert_eq!(
        errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
}

#[test]
fn value_returned_from_initializer() {
    assert_eq!(
        errors("class A { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
    assert!(errors("class A { init() { return; } }").is_empty());
}

#[test]
fn resolution_continues_after_an_error() {
    let found = errors("return;\n{ var b = b; }\nprint this;");

    assert_eq!(found.len(), 3);
    assert!(found[1].starts_with("[line 2]"));
    assert!(found[2].starts_with("[line 3]"));
}

#[test]
fn distances_count_enclosing_scopes() {
    // Only one variable reference: `a` inside the inner block.
    let (interpreter, diagnostics) = resolve("{ var a = 1; { print a; } }");

    assert!(diagnostics.reports().is_empty());
    assert_eq!(interpreter.resolved_depth(ExprId(0)), Some(1));
}

#[test]
fn closures_resolve_through_function_scopes() {
    let (interpreter, _) = resolve("fun f() { var x; fun g() { return x; } }");

    // g's body is one scope out from x's declaration in f.
    assert_eq!(interpreter.resolved_depth(ExprId(0)), Some(1));
}

#[test]
fn globals_stay_unresolved() {
    let (interpreter, _) = resolve("var g = 1; { print g; }");

    assert_eq!(interpreter.resolved_depth(ExprId(0)), None);
}

#[test]
fn this_resolves_to_the_method_binding_frame() {
    let (interpreter, diagnostics) = resolve("class A { f() { return this; } }");

    assert!(diagnostics.reports().is_empty());
    assert_eq!(interpreter.resolved_depth(ExprId(0)), Some(1));
}

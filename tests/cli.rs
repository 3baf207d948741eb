use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn rox() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rox"))
}

fn source_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn run_prints_program_output() {
    let file = source_file("var greeting = \"hi\";\nprint greeting + \" there\";\nprint 1 + 2;");

    rox()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("hi there\n3\n");
}

#[test]
fn run_static_error_exits_65() {
    let file = source_file("print 1;\nprint ;");

    rox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("")
        .stderr(predicate::str::contains(
            "[line 2] Error at ';': Expect expression.",
        ));
}

#[test]
fn run_resolution_error_exits_65() {
    let file = source_file("{ var a = a; }");

    rox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains(
            "Can't read local variable in its own initializer.",
        ));
}

#[test]
fn run_runtime_error_exits_70() {
    let file = source_file("print \"before\";\nprint -\"x\";\nprint \"after\";");

    rox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("before\n")
        .stderr(predicate::str::contains("Operand must be a number.\n[line 2]"));
}

#[test]
fn tokenize_lists_tokens() {
    let file = source_file("var x = 42;");

    rox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            "VAR var null\n\
             IDENTIFIER x null\n\
             EQUAL = null\n\
             NUMBER 42 42.0\n\
             SEMICOLON ; null\n\
             EOF  null\n",
        );
}

#[test]
fn tokenize_reports_bad_characters_and_keeps_going() {
    let file = source_file("(@)");

    rox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("LEFT_PAREN ( null\nRIGHT_PAREN ) null\nEOF  null\n")
        .stderr(predicate::str::contains("[line 1] Error: Unexpected character."));
}

#[test]
fn tokenize_json() {
    let file = source_file("nil");

    rox()
        .args(["tokenize", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lexeme\": \"nil\""));
}

#[test]
fn parse_prints_trees() {
    let file = source_file("print (1 + 2) * 3;");

    rox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout("(print (* (group (+ 1.0 2.0)) 3.0))\n");
}

#[test]
fn evaluate_prints_value() {
    let file = source_file("\"con\" + \"cat\"");

    rox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout("concat\n");
}

#[test]
fn evaluate_trailing_tokens_exit_65() {
    let file = source_file("1 2");

    rox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("")
        .stderr(predicate::str::contains(
            "[line 1] Error at '2': Expect end of expression.",
        ));
}

#[test]
fn evaluate_runtime_error_exits_70() {
    let file = source_file("10 / 0");

    rox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Division by zero."));
}

#[test]
fn missing_file_fails() {
    rox()
        .args(["run", "no_such_file.lox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open file"));
}

#[test]
fn repl_exits_on_eof() {
    // Piped stdin: rustyline hits EOF without a tty prompt.
    rox().arg("repl").write_stdin("").assert().success();
}

#[test]
fn repl_keeps_state_between_lines() {
    rox()
        .arg("repl")
        .write_stdin("var a = 1;\nprint a + 1;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}

#[test]
fn repl_recovers_after_errors() {
    rox()
        .arg("repl")
        .write_stdin("print ;\nprint nope;\nprint \"ok\";\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stderr(predicate::str::contains("Undefined variable 'nope'."));
}

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rox::ast_printer::Ast;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner::{self, Scanner};
use rox::token::Token;
use rox::{Diagnostics, Lox};

/// Static (scan / parse / resolve) errors were reported.
const EXIT_STATIC_ERROR: u8 = 65;

/// Execution stopped on an uncaught runtime error.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token list as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the syntax tree of each statement
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Reads a whole source file as UTF‑8 text.
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // `[module:line] - message`, module without the crate prefix.
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env() // RUST_LOG overrides the default level
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print and drain every collected report to stderr.
fn flush_reports(diagnostics: &mut Diagnostics) {
    for report in diagnostics.take_reports() {
        eprintln!("{}", report);
    }
}

/// Exit status for a finished pipeline.
fn exit_code(diagnostics: &Diagnostics) -> ExitCode {
    if diagnostics.had_error() {
        ExitCode::from(EXIT_STATIC_ERROR)
    } else if diagnostics.had_runtime_error() {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::SUCCESS
    }
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(&source) {
        match result {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }
            Err(e) => {
                eprintln!("{}", e);
                diagnostics.report(e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    }

    Ok(exit_code(&diagnostics))
}

fn parse(filename: &PathBuf) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::scan(&source, &mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);

    let printer = Ast;
    for stmt in &statements {
        println!("{}", printer.print_stmt(stmt));
    }

    flush_reports(&mut diagnostics);

    Ok(exit_code(&diagnostics))
}

fn evaluate(filename: &PathBuf) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::scan(&source, &mut diagnostics);
    let expr = Parser::new(&tokens).parse_expression(&mut diagnostics);

    match expr {
        Some(expr) if !diagnostics.had_error() => {
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }
                Err(e) => diagnostics.report(e),
            }
        }
        _ => debug!("Nothing to evaluate"),
    }

    flush_reports(&mut diagnostics);

    Ok(exit_code(&diagnostics))
}

fn run(filename: &PathBuf) -> Result<ExitCode> {
    let source = read_file(filename)?;
    info!("Provided input:\n{}", source);

    let mut lox = Lox::new();
    lox.run(&source);

    flush_reports(lox.diagnostics_mut());

    Ok(exit_code(lox.diagnostics()))
}

fn repl() -> Result<ExitCode> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut lox = Lox::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    debug!("Could not record history entry: {}", e);
                }

                lox.run(&line);

                let diagnostics = lox.diagnostics_mut();
                flush_reports(diagnostics);
                diagnostics.reset_error();
                diagnostics.reset_runtime_error();
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Evaluate { filename } => evaluate(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}

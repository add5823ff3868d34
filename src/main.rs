use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use tailspin::ast::Stmt;
use tailspin::interpreter::Interpreter;
use tailspin::optimizer;
use tailspin::parser::error::source_context;

#[derive(Parser)]
#[command(name = "tailspin")]
#[command(version = "0.1.0")]
#[command(
    about = "Tail-call optimization for a Python-like language",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show timing and pipeline logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file (decorated functions are optimized as they are defined)
    Run {
        /// The source file to run
        file: String,
    },
    /// Print the iterative form of a tail-recursive function
    Show {
        /// The source file containing the function
        file: String,

        /// The function to transform
        function: String,
    },
    /// Check that decorated functions are properly tail-recursive
    Check {
        /// The source file to check
        file: String,

        /// Check one specific function instead of every decorated one
        function: Option<String>,

        /// Disable colored diagnostics
        #[arg(long)]
        no_color: bool,
    },
    /// Parse a file and print its AST structure (for debugging)
    Ast {
        /// The source file to parse
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else {
        env_logger::init();
    }

    match cli.command {
        Commands::Run { file } => run_file(&file),
        Commands::Show { file, function } => show_file(&file, &function),
        Commands::Check {
            file,
            function,
            no_color,
        } => check_file(&file, function.as_deref(), !no_color),
        Commands::Ast { file } => ast_file(&file),
    }
}

fn read_source(filename: &str) -> Result<String> {
    fs::read_to_string(filename).with_context(|| format!("Failed to read file: {}", filename))
}

fn run_file(filename: &str) -> Result<()> {
    let source = read_source(filename)?;

    let module = match tailspin::parse(&source) {
        Ok(module) => module,
        Err(errors) => {
            report_parse_errors(filename, &source, &errors);
            std::process::exit(1);
        }
    };

    let mut interpreter = Interpreter::new();
    if let Err(error) = interpreter.interpret(&module) {
        eprintln!("{} {}", "error:".bright_red(), error);
        std::process::exit(1);
    }

    Ok(())
}

fn show_file(filename: &str, function: &str) -> Result<()> {
    let source = read_source(filename)?;

    match tailspin::show_transformed_code(&source, function) {
        Ok(code) => {
            print!("{}", code);
            Ok(())
        }
        Err(message) => {
            eprintln!("{} {}", "error:".bright_red(), message);
            std::process::exit(1);
        }
    }
}

fn check_file(filename: &str, function: Option<&str>, use_color: bool) -> Result<()> {
    let source = read_source(filename)?;

    let module = match tailspin::parse(&source) {
        Ok(module) => module,
        Err(errors) => {
            report_parse_errors(filename, &source, &errors);
            std::process::exit(1);
        }
    };

    let targets: Vec<&Stmt> = module
        .body
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| match s {
            Stmt::FunctionDef {
                name,
                decorator_list,
                ..
            } => match function {
                Some(wanted) => name == wanted,
                None => decorator_list
                    .iter()
                    .any(|d| optimizer::is_optimizer_decorator(d)),
            },
            _ => false,
        })
        .collect();

    if targets.is_empty() {
        match function {
            Some(wanted) => {
                eprintln!(
                    "{} function '{}' not found at module scope",
                    "error:".bright_red(),
                    wanted
                );
                std::process::exit(1);
            }
            None => {
                println!("No decorated functions found in '{}'", filename);
                return Ok(());
            }
        }
    }

    let mut failed = false;
    for def in targets {
        let Stmt::FunctionDef { name, .. } = def else {
            continue;
        };
        match optimizer::rewrite_function(def, name) {
            Ok(_) => {
                if use_color {
                    println!("{} {}", "✓".bright_green(), name);
                } else {
                    println!("ok: {}", name);
                }
            }
            Err(error) => {
                failed = true;
                if use_color {
                    println!("{} {}: {}", "✗".bright_red(), name, error);
                } else {
                    println!("failed: {}: {}", name, error);
                }
                if let Some(line) = error.line() {
                    if let Some(context) = source_context(&source, line, 1, use_color) {
                        print!("{}", context);
                    }
                }
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn ast_file(filename: &str) -> Result<()> {
    let source = read_source(filename)?;

    match tailspin::print_ast(&source) {
        Ok(output) => {
            print!("{}", output);
            Ok(())
        }
        Err(message) => {
            eprintln!("{} {}", "error:".bright_red(), message);
            std::process::exit(1);
        }
    }
}

fn report_parse_errors(
    filename: &str,
    source: &str,
    errors: &[tailspin::parser::ParseError],
) {
    eprintln!("Syntax errors found in '{}':", filename);
    for error in errors {
        let formatter = tailspin::parser::ParseErrorFormatter::new(error, Some(source), true);
        eprint!("{}", formatter);
    }
}

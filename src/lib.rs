// Make all modules public so they can be imported in tests
pub mod ast;
pub mod formatter;
pub mod interpreter;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod visitor;

// Import the Visitor trait so it's in scope
use crate::visitor::Visitor;

pub use optimizer::{TailRecursionError, Violation};

/// Parse the given source code into an AST
pub fn parse(source: &str) -> Result<ast::Module, Vec<parser::ParseError>> {
    let mut lexer = lexer::Lexer::new(source);
    let tokens = lexer.tokenize();

    // Convert lexer errors to parser errors
    if !lexer.get_errors().is_empty() {
        let errors = lexer
            .get_errors()
            .iter()
            .map(|e| parser::ParseError::invalid_syntax(&e.message, e.line, e.column))
            .collect();
        return Err(errors);
    }

    parser::parse(tokens)
}

/// Format the given AST back to source code
pub fn format_ast(module: &ast::Module, indent_size: usize) -> String {
    let mut formatter = formatter::CodeFormatter::new(indent_size);
    formatter.visit_module(module);
    formatter.get_output().to_string()
}

/// Find a module-level function definition by name
pub fn find_function<'a>(module: &'a ast::Module, name: &str) -> Option<&'a ast::Stmt> {
    module
        .body
        .iter()
        .map(|s| s.as_ref())
        .find(|s| matches!(s, ast::Stmt::FunctionDef { name: n, .. } if n == name))
}

/// Debug surface: rewrite the named function and return the reconstructed
/// source of its iterative form, without materializing a callable.
pub fn show_transformed_code(source: &str, name: &str) -> Result<String, String> {
    let module = parse(source).map_err(join_parse_errors)?;
    let def = find_function(&module, name)
        .ok_or_else(|| format!("function '{}' not found at module scope", name))?;
    optimizer::transformed_source(def, name).map_err(|e| e.to_string())
}

/// Parse and interpret a program. The `tco` decorator is available as a
/// builtin; decorated functions are optimized as their definitions execute.
pub fn run_source(source: &str) -> Result<(), String> {
    let module = parse(source).map_err(join_parse_errors)?;
    let mut interpreter = interpreter::Interpreter::new();
    interpreter.interpret(&module).map_err(|e| e.to_string())
}

/// Parse source code and return the printed AST structure
pub fn print_ast(source: &str) -> Result<String, String> {
    let module = parse(source).map_err(join_parse_errors)?;
    let mut printer = visitor::AstPrinter::new();
    Ok(printer.visit_module(&module))
}

fn join_parse_errors(errors: Vec<parser::ParseError>) -> String {
    errors
        .iter()
        .map(|e| e.get_message())
        .collect::<Vec<String>>()
        .join("\n")
}

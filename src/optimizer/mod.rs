pub mod error;
mod names;
pub mod transformer;
pub mod validator;

pub use error::{TailRecursionError, Violation};

use log::debug;

use crate::ast::{Expr, Stmt};
use crate::formatter::CodeFormatter;
use crate::visitor::Visitor;

/// The simple name of the optimizing decorator, as it appears in user
/// source (`@tco`, `@tco()`, `@tailspin.tco`, ...).
pub const DECORATOR_NAME: &str = "tco";

/// Whether a decorator expression denotes the optimizer itself: the bare
/// name, a dotted name ending in it, or either form with trailing call
/// parentheses. The stripping pass must recognize every spelling or the
/// re-materialized definition would decorate itself again.
pub fn is_optimizer_decorator(expr: &Expr) -> bool {
    match expr {
        Expr::Name { id, .. } => id == DECORATOR_NAME,
        Expr::Attribute { attr, .. } => attr == DECORATOR_NAME,
        Expr::Call { func, .. } => is_optimizer_decorator(func),
        _ => false,
    }
}

/// Run the decoration-time pipeline on a function definition: guard,
/// validate, then rewrite into iterative form. `qualname` is the
/// function's qualified name as reported by the host; a `<locals>` marker
/// in it means the function was defined inside another function, which the
/// host's source lookup cannot serve reliably.
pub fn rewrite_function(def: &Stmt, qualname: &str) -> Result<Stmt, TailRecursionError> {
    let Stmt::FunctionDef {
        name,
        body,
        is_async,
        ..
    } = def
    else {
        unreachable!("rewrite_function called on a non-function statement")
    };

    if *is_async {
        return Err(TailRecursionError::AsyncRejected { name: name.clone() });
    }

    if qualname.contains("<locals>") {
        return Err(TailRecursionError::NestedRejected {
            qualname: qualname.to_string(),
        });
    }

    validator::validate(name, body, *is_async)?;
    debug!("'{}' validated as tail-recursive", name);

    transformer::transform(def)
}

/// Debug surface: run the pipeline up to the rewritten AST and return the
/// reconstructed source text of the new definition.
pub fn transformed_source(def: &Stmt, qualname: &str) -> Result<String, TailRecursionError> {
    let rewritten = rewrite_function(def, qualname)?;
    let mut formatter = CodeFormatter::new(4);
    formatter.visit_stmt(&rewritten);
    Ok(formatter.get_output().to_string())
}

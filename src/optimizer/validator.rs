use crate::ast::{Expr, Stmt};

use super::error::{TailRecursionError, Violation};

/// Proves that every self-call in a function body sits in tail position.
///
/// A self-call is in tail position iff it is the entire expression of a
/// return statement, or a branch of a conditional expression that is itself
/// in tail position. Anything composed around the call (arithmetic, boolean
/// operators, subscripts, argument positions, collection displays)
/// disqualifies it.
///
/// Violations are accumulated; the caller gets them all in one error.
pub struct TailRecursionValidator<'a> {
    function_name: &'a str,
    violations: Vec<Violation>,
}

/// Validate the body of the named function. `is_async` comes from the
/// function's definition; structural rejections (async, yield, inner
/// functions aliasing the recursive binding) run before the tail-position
/// walk.
pub fn validate(
    function_name: &str,
    body: &[Box<Stmt>],
    is_async: bool,
) -> Result<(), TailRecursionError> {
    if is_async {
        return Err(TailRecursionError::AsyncRejected {
            name: function_name.to_string(),
        });
    }

    if let Some(line) = find_yield(body) {
        return Err(TailRecursionError::GeneratorRejected {
            name: function_name.to_string(),
            line,
        });
    }

    let mut validator = TailRecursionValidator {
        function_name,
        violations: Vec::new(),
    };

    validator.check_inner_defs(body);
    for stmt in body {
        validator.check_stmt(stmt);
    }

    if validator.violations.is_empty() {
        Ok(())
    } else {
        Err(TailRecursionError::NotTailRecursive {
            name: function_name.to_string(),
            violations: validator.violations,
        })
    }
}

impl<'a> TailRecursionValidator<'a> {
    /// An inner `def` that references the function's own name defeats the
    /// rewrite (the reference would alias the pre-optimization binding), so
    /// it is rejected conservatively.
    fn check_inner_defs(&mut self, body: &[Box<Stmt>]) {
        each_stmt(body, &mut |stmt| {
            if let Stmt::FunctionDef {
                name, body, line, ..
            } = stmt
            {
                if references_name(body, self.function_name) {
                    self.violations.push(Violation::new(
                        *line,
                        format!(
                            "inner function '{}' references '{}'; hoist it to module \
                             scope instead",
                            name, self.function_name
                        ),
                    ));
                }
            }
        });
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value, true);
                }
            }
            Stmt::Assign { targets, value, .. } => {
                for target in targets {
                    self.check_expr(target, false);
                }
                self.check_expr(value, false);
            }
            Stmt::AugAssign { target, value, .. } => {
                self.check_expr(target, false);
                self.check_expr(value, false);
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                self.check_expr(test, false);
                for stmt in body {
                    self.check_stmt(stmt);
                }
                for stmt in orelse {
                    self.check_stmt(stmt);
                }
            }
            Stmt::While {
                test, body, orelse, ..
            } => {
                self.check_expr(test, false);
                for stmt in body {
                    self.check_stmt(stmt);
                }
                for stmt in orelse {
                    self.check_stmt(stmt);
                }
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                self.check_expr(target, false);
                self.check_expr(iter, false);
                for stmt in body {
                    self.check_stmt(stmt);
                }
                for stmt in orelse {
                    self.check_stmt(stmt);
                }
            }
            Stmt::Assert { test, msg, .. } => {
                self.check_expr(test, false);
                if let Some(msg) = msg {
                    self.check_expr(msg, false);
                }
            }
            Stmt::Expr { value, .. } => self.check_expr(value, false),
            // Inner defs are handled by the structural scan and otherwise
            // left alone; they have their own scope.
            Stmt::FunctionDef { .. } => {}
            Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        }
    }

    fn check_expr(&mut self, expr: &Expr, is_tail: bool) {
        match expr {
            Expr::Call {
                func,
                args,
                keywords,
                line,
                ..
            } => {
                match func.as_ref() {
                    Expr::Name { id, .. } if id == self.function_name => {
                        if !is_tail {
                            self.violations.push(Violation::new(
                                *line,
                                format!(
                                    "recursive call to '{}' is not in tail position; it \
                                     must be the entire value of a return statement",
                                    self.function_name
                                ),
                            ));
                        }
                    }
                    Expr::Attribute { .. } | Expr::Subscript { .. }
                        if callee_base(func) == Some(self.function_name) =>
                    {
                        self.violations.push(Violation::new(
                            *line,
                            format!(
                                "accessor-style call through '{}' cannot be proven \
                                 tail-recursive",
                                self.function_name
                            ),
                        ));
                    }
                    other => self.check_expr(other, false),
                }

                // Arguments are never in tail position
                for arg in args {
                    self.check_expr(arg, false);
                }
                for (_, value) in keywords {
                    self.check_expr(value, false);
                }
            }
            Expr::IfExp {
                test, body, orelse, ..
            } => {
                self.check_expr(test, false);
                self.check_expr(body, is_tail);
                self.check_expr(orelse, is_tail);
            }
            Expr::BoolOp { values, .. } => {
                for value in values {
                    self.check_expr(value, false);
                }
            }
            Expr::BinOp { left, right, .. } => {
                self.check_expr(left, false);
                self.check_expr(right, false);
            }
            Expr::UnaryOp { operand, .. } => self.check_expr(operand, false),
            Expr::Compare {
                left, comparators, ..
            } => {
                self.check_expr(left, false);
                for comparator in comparators {
                    self.check_expr(comparator, false);
                }
            }
            Expr::List { elts, .. } | Expr::Tuple { elts, .. } => {
                for elt in elts {
                    self.check_expr(elt, false);
                }
            }
            Expr::Subscript { value, slice, .. } => {
                self.check_expr(value, false);
                self.check_expr(slice, false);
            }
            Expr::Slice {
                lower, upper, step, ..
            } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.check_expr(part, false);
                }
            }
            Expr::Attribute { value, .. } => self.check_expr(value, false),
            Expr::Starred { value, .. } => self.check_expr(value, false),
            Expr::Yield { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value, false);
                }
            }
            // Bare self-references (aliasing) are not calls; ignored.
            Expr::Name { .. } | Expr::Num { .. } | Expr::Str { .. } | Expr::NameConstant { .. } => {
            }
        }
    }
}

/// The underlying name at the base of an attribute/subscript chain.
fn callee_base(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name { id, .. } => Some(id),
        Expr::Attribute { value, .. } => callee_base(value),
        Expr::Subscript { value, .. } => callee_base(value),
        _ => None,
    }
}

/// First line containing a `yield`, searching the whole body including
/// nested statements.
fn find_yield(body: &[Box<Stmt>]) -> Option<usize> {
    let mut found: Option<usize> = None;
    each_expr(body, &mut |expr| {
        if let Expr::Yield { line, .. } = expr {
            match found {
                Some(existing) if existing <= *line => {}
                _ => found = Some(*line),
            }
        }
    });
    found
}

fn references_name(body: &[Box<Stmt>], name: &str) -> bool {
    let mut found = false;
    each_expr(body, &mut |expr| {
        if let Expr::Name { id, .. } = expr {
            if id == name {
                found = true;
            }
        }
    });
    found
}

/// Apply `f` to every statement in `body`, including nested blocks and
/// inner function bodies.
fn each_stmt(body: &[Box<Stmt>], f: &mut impl FnMut(&Stmt)) {
    for stmt in body {
        f(stmt);
        match stmt.as_ref() {
            Stmt::FunctionDef { body, .. } => each_stmt(body, f),
            Stmt::If { body, orelse, .. }
            | Stmt::While { body, orelse, .. }
            | Stmt::For { body, orelse, .. } => {
                each_stmt(body, f);
                each_stmt(orelse, f);
            }
            _ => {}
        }
    }
}

/// Apply `f` to every expression reachable from `body`, including inside
/// nested statements and inner function bodies.
fn each_expr(body: &[Box<Stmt>], f: &mut impl FnMut(&Expr)) {
    each_stmt(body, &mut |stmt| {
        let mut exprs: Vec<&Expr> = Vec::new();
        match stmt {
            Stmt::FunctionDef { params, .. } => {
                for param in params {
                    if let Some(typ) = &param.typ {
                        exprs.push(typ.as_ref());
                    }
                    if let Some(default) = &param.default {
                        exprs.push(default.as_ref());
                    }
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    exprs.push(value.as_ref());
                }
            }
            Stmt::Assign { targets, value, .. } => {
                for target in targets {
                    exprs.push(target.as_ref());
                }
                exprs.push(value.as_ref());
            }
            Stmt::AugAssign { target, value, .. } => {
                exprs.push(target.as_ref());
                exprs.push(value.as_ref());
            }
            Stmt::If { test, .. } | Stmt::While { test, .. } => exprs.push(test.as_ref()),
            Stmt::For { target, iter, .. } => {
                exprs.push(target.as_ref());
                exprs.push(iter.as_ref());
            }
            Stmt::Assert { test, msg, .. } => {
                exprs.push(test.as_ref());
                if let Some(msg) = msg {
                    exprs.push(msg.as_ref());
                }
            }
            Stmt::Expr { value, .. } => exprs.push(value.as_ref()),
            Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        }
        for expr in exprs {
            each_expr_in(expr, f);
        }
    });
}

fn each_expr_in(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    match expr {
        Expr::BoolOp { values, .. } => {
            for value in values {
                each_expr_in(value, f);
            }
        }
        Expr::BinOp { left, right, .. } => {
            each_expr_in(left, f);
            each_expr_in(right, f);
        }
        Expr::UnaryOp { operand, .. } => each_expr_in(operand, f),
        Expr::IfExp {
            test, body, orelse, ..
        } => {
            each_expr_in(test, f);
            each_expr_in(body, f);
            each_expr_in(orelse, f);
        }
        Expr::Compare {
            left, comparators, ..
        } => {
            each_expr_in(left, f);
            for comparator in comparators {
                each_expr_in(comparator, f);
            }
        }
        Expr::Call {
            func,
            args,
            keywords,
            ..
        } => {
            each_expr_in(func, f);
            for arg in args {
                each_expr_in(arg, f);
            }
            for (_, value) in keywords {
                each_expr_in(value, f);
            }
        }
        Expr::Yield { value, .. } => {
            if let Some(value) = value {
                each_expr_in(value, f);
            }
        }
        Expr::Attribute { value, .. } => each_expr_in(value, f),
        Expr::Subscript { value, slice, .. } => {
            each_expr_in(value, f);
            each_expr_in(slice, f);
        }
        Expr::Slice {
            lower, upper, step, ..
        } => {
            for part in [lower, upper, step].into_iter().flatten() {
                each_expr_in(part, f);
            }
        }
        Expr::Starred { value, .. } => each_expr_in(value, f),
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } => {
            for elt in elts {
                each_expr_in(elt, f);
            }
        }
        Expr::Name { .. } | Expr::Num { .. } | Expr::Str { .. } | Expr::NameConstant { .. } => {}
    }
}

use crate::ast::{Expr, Module, Parameter, Stmt};

pub trait Visitor<'ast, T> {
    fn visit_module(&mut self, module: &'ast Module) -> T;
    fn visit_stmt(&mut self, stmt: &'ast Stmt) -> T;
    fn visit_expr(&mut self, expr: &'ast Expr) -> T;
    fn visit_parameter(&mut self, param: &'ast Parameter) -> T;

    // Assignment targets default to ordinary expression handling
    fn visit_expr_as_target(&mut self, expr: &'ast Expr) -> T {
        self.visit_expr(expr)
    }
}

/// A simple visitor that prints the AST structure, used by the CLI `ast`
/// subcommand.
pub struct AstPrinter {
    indent: usize,
}

impl AstPrinter {
    pub fn new() -> Self {
        AstPrinter { indent: 0 }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.indent)
    }

    fn with_indent<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.indent += 1;
        let result = f(self);
        self.indent -= 1;
        result
    }

    fn visit_block(&mut self, label: &str, body: &[Box<Stmt>]) -> String {
        let mut result = format!("{}{}:\n", self.indent(), label);
        self.with_indent(|s| {
            for stmt in body {
                result.push_str(&format!("{}\n", s.visit_stmt(stmt)));
            }
        });
        result
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ast> Visitor<'ast, String> for AstPrinter {
    fn visit_module(&mut self, module: &'ast Module) -> String {
        let mut result = String::from("Module:\n");
        for stmt in &module.body {
            result.push_str(&format!("{}\n", self.visit_stmt(stmt)));
        }
        result
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) -> String {
        match stmt {
            Stmt::FunctionDef {
                name,
                params,
                body,
                decorator_list,
                returns,
                is_async,
                ..
            } => {
                let mut result = if *is_async {
                    format!("{}AsyncFunctionDef: {}\n", self.indent(), name)
                } else {
                    format!("{}FunctionDef: {}\n", self.indent(), name)
                };

                if !decorator_list.is_empty() {
                    result.push_str(&format!("{}Decorators:\n", self.indent()));
                    self.with_indent(|s| {
                        for decorator in decorator_list {
                            result.push_str(&format!("{}\n", s.visit_expr(decorator)));
                        }
                    });
                }

                result.push_str(&format!("{}Parameters:\n", self.indent()));
                self.with_indent(|s| {
                    for param in params {
                        result.push_str(&format!("{}\n", s.visit_parameter(param)));
                    }
                });

                if let Some(ret) = returns {
                    result.push_str(&format!(
                        "{}Returns: {}\n",
                        self.indent(),
                        self.visit_expr(ret)
                    ));
                }

                result.push_str(&self.visit_block("Body", body));
                result
            }
            Stmt::Return { value, .. } => {
                let mut result = format!("{}Return", self.indent());
                if let Some(value) = value {
                    result.push_str(&format!(" {}", self.visit_expr(value)));
                }
                result
            }
            Stmt::Assign { targets, value, .. } => {
                let mut result = format!("{}Assign:\n", self.indent());
                result.push_str(&format!("{}Targets:\n", self.indent()));
                self.with_indent(|s| {
                    for target in targets {
                        result.push_str(&format!("{}\n", s.visit_expr_as_target(target)));
                    }
                });
                result.push_str(&format!(
                    "{}Value: {}\n",
                    self.indent(),
                    self.visit_expr(value)
                ));
                result
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                format!(
                    "{}AugAssign: {:?}\n{}Target: {}\n{}Value: {}",
                    self.indent(),
                    op,
                    self.indent(),
                    self.visit_expr_as_target(target),
                    self.indent(),
                    self.visit_expr(value)
                )
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                let mut result = format!("{}For:\n", self.indent());
                result.push_str(&format!(
                    "{}Target: {}\n",
                    self.indent(),
                    self.visit_expr_as_target(target)
                ));
                result.push_str(&format!("{}Iter: {}\n", self.indent(), self.visit_expr(iter)));
                result.push_str(&self.visit_block("Body", body));
                if !orelse.is_empty() {
                    result.push_str(&self.visit_block("Else", orelse));
                }
                result
            }
            Stmt::While {
                test, body, orelse, ..
            } => {
                let mut result = format!("{}While:\n", self.indent());
                result.push_str(&format!("{}Test: {}\n", self.indent(), self.visit_expr(test)));
                result.push_str(&self.visit_block("Body", body));
                if !orelse.is_empty() {
                    result.push_str(&self.visit_block("Else", orelse));
                }
                result
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                let mut result = format!("{}If:\n", self.indent());
                result.push_str(&format!("{}Test: {}\n", self.indent(), self.visit_expr(test)));
                result.push_str(&self.visit_block("Body", body));
                if !orelse.is_empty() {
                    result.push_str(&self.visit_block("Else", orelse));
                }
                result
            }
            Stmt::Assert { test, msg, .. } => {
                let mut result = format!("{}Assert: {}", self.indent(), self.visit_expr(test));
                if let Some(msg) = msg {
                    result.push_str(&format!(", {}", self.visit_expr(msg)));
                }
                result
            }
            Stmt::Expr { value, .. } => {
                format!("{}Expr: {}", self.indent(), self.visit_expr(value))
            }
            Stmt::Pass { .. } => format!("{}Pass", self.indent()),
            Stmt::Break { .. } => format!("{}Break", self.indent()),
            Stmt::Continue { .. } => format!("{}Continue", self.indent()),
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) -> String {
        match expr {
            Expr::BoolOp { op, values, .. } => {
                let parts: Vec<String> = values.iter().map(|v| self.visit_expr(v)).collect();
                format!("{}BoolOp {:?}: [{}]", self.indent(), op, parts.join(", "))
            }
            Expr::BinOp {
                left, op, right, ..
            } => {
                format!(
                    "{}BinOp {:?}: ({}, {})",
                    self.indent(),
                    op,
                    self.visit_expr(left),
                    self.visit_expr(right)
                )
            }
            Expr::UnaryOp { op, operand, .. } => {
                format!("{}UnaryOp {:?}: {}", self.indent(), op, self.visit_expr(operand))
            }
            Expr::IfExp {
                test, body, orelse, ..
            } => {
                format!(
                    "{}IfExp: ({} if {} else {})",
                    self.indent(),
                    self.visit_expr(body),
                    self.visit_expr(test),
                    self.visit_expr(orelse)
                )
            }
            Expr::Compare {
                left,
                ops,
                comparators,
                ..
            } => {
                let mut result = format!("{}Compare: {}", self.indent(), self.visit_expr(left));
                for (op, comparator) in ops.iter().zip(comparators.iter()) {
                    result.push_str(&format!(" {:?} {}", op, self.visit_expr(comparator)));
                }
                result
            }
            Expr::Call {
                func,
                args,
                keywords,
                ..
            } => {
                let mut parts: Vec<String> = args.iter().map(|a| self.visit_expr(a)).collect();
                for (name, value) in keywords {
                    match name {
                        Some(name) => parts.push(format!("{}={}", name, self.visit_expr(value))),
                        None => parts.push(format!("**{}", self.visit_expr(value))),
                    }
                }
                format!(
                    "{}Call: {}({})",
                    self.indent(),
                    self.visit_expr(func),
                    parts.join(", ")
                )
            }
            Expr::Yield { value, .. } => match value {
                Some(value) => format!("{}Yield: {}", self.indent(), self.visit_expr(value)),
                None => format!("{}Yield", self.indent()),
            },
            Expr::Num { value, .. } => format!("{}Num: {:?}", self.indent(), value),
            Expr::Str { value, .. } => format!("{}Str: \"{}\"", self.indent(), value),
            Expr::NameConstant { value, .. } => {
                format!("{}NameConstant: {:?}", self.indent(), value)
            }
            Expr::Attribute { value, attr, .. } => {
                format!("{}Attribute: {}.{}", self.indent(), self.visit_expr(value), attr)
            }
            Expr::Subscript { value, slice, .. } => {
                format!(
                    "{}Subscript: {}[{}]",
                    self.indent(),
                    self.visit_expr(value),
                    self.visit_expr(slice)
                )
            }
            Expr::Slice {
                lower, upper, step, ..
            } => {
                let part = |e: &Option<Box<Expr>>, s: &mut Self| match e {
                    Some(e) => s.visit_expr(e),
                    None => String::new(),
                };
                format!(
                    "{}Slice: {}:{}:{}",
                    self.indent(),
                    part(lower, self),
                    part(upper, self),
                    part(step, self)
                )
            }
            Expr::Starred { value, .. } => {
                format!("{}Starred: {}", self.indent(), self.visit_expr(value))
            }
            Expr::Name { id, ctx, .. } => {
                format!("{}Name: {} (ctx: {:?})", self.indent(), id, ctx)
            }
            Expr::List { elts, .. } => {
                let parts: Vec<String> = elts.iter().map(|e| self.visit_expr(e)).collect();
                format!("{}List: [{}]", self.indent(), parts.join(", "))
            }
            Expr::Tuple { elts, .. } => {
                let parts: Vec<String> = elts.iter().map(|e| self.visit_expr(e)).collect();
                format!("{}Tuple: ({})", self.indent(), parts.join(", "))
            }
        }
    }

    fn visit_parameter(&mut self, param: &'ast Parameter) -> String {
        let mut result = format!("{}Parameter: ", self.indent());
        if param.is_vararg {
            result.push('*');
        }
        if param.is_kwarg {
            result.push_str("**");
        }
        result.push_str(&param.name);

        if let Some(typ) = &param.typ {
            result.push_str(&format!(" (type: {})", self.visit_expr(typ)));
        }
        if let Some(default) = &param.default {
            result.push_str(&format!(" = {}", self.visit_expr(default)));
        }
        result
    }
}

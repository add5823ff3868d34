use std::collections::HashMap;

use log::trace;

use crate::ast::{Expr, ExprContext, NameConstant, Stmt};

use super::error::TailRecursionError;
use super::is_optimizer_decorator;
use super::names::FreshNames;

/// Rewrites a validated tail-recursive function definition into an
/// iterative one.
///
/// The rewrite hoists every parameter into a fresh uniquely-named local,
/// wraps the body in a `while True` trampoline, and replaces each tail call
/// with one parallel rebinding of the hoisted locals followed by a transfer
/// back to the trampoline head. Inside nested loops the transfer is a
/// sentinel-flag-plus-break ladder, because a bare `continue` would bind to
/// the innermost loop rather than the trampoline.
pub struct TailCallTransformer {
    function_name: String,
    params: Vec<ParamSlot>,
    param_map: HashMap<String, String>,
    names: FreshNames,
    // Sentinel flags of the enclosing inner loops, innermost last
    loop_stack: Vec<String>,
}

struct ParamSlot {
    name: String,
    hoisted: String,
    default: Option<Expr>,
}

/// Transform a function definition statement. The definition must already
/// have been validated; the only errors raised here are argument-shape
/// mismatches in tail calls.
pub fn transform(def: &Stmt) -> Result<Stmt, TailRecursionError> {
    let Stmt::FunctionDef {
        name,
        params,
        body,
        decorator_list,
        returns,
        is_async,
        line,
        column,
    } = def
    else {
        unreachable!("transform called on a non-function statement")
    };

    for param in params {
        if param.is_vararg || param.is_kwarg {
            return Err(TailRecursionError::argument_shape(
                name,
                *line,
                format!(
                    "variadic parameter '{}{}' cannot be rebound by the trampoline",
                    if param.is_kwarg { "**" } else { "*" },
                    param.name
                ),
            ));
        }
    }

    let names = FreshNames::new();
    let mut slots = Vec::with_capacity(params.len());
    let mut param_map = HashMap::new();
    for param in params {
        let hoisted = names.param(&param.name);
        param_map.insert(param.name.clone(), hoisted.clone());
        slots.push(ParamSlot {
            name: param.name.clone(),
            hoisted,
            default: param.default.as_deref().cloned(),
        });
    }

    let mut transformer = TailCallTransformer {
        function_name: name.clone(),
        params: slots,
        param_map,
        names,
        loop_stack: Vec::new(),
    };

    // Pass B: hoist parameters into fresh locals
    let mut hoist = Vec::with_capacity(transformer.params.len());
    for slot in &transformer.params {
        hoist.push(Box::new(Stmt::Assign {
            targets: vec![Box::new(name_store(&slot.hoisted, *line))],
            value: Box::new(name_load(&slot.name, *line)),
            line: *line,
            column: 0,
        }));
    }

    // Passes C and D over the body
    let mut trampoline_body = transformer.transform_block(body)?;

    // Falling off the end of the body must return None, not re-iterate
    if !block_always_exits(&trampoline_body) {
        trampoline_body.push(Box::new(Stmt::Return {
            value: None,
            line: *line,
            column: 0,
        }));
    }

    let trampoline = Stmt::While {
        test: Box::new(Expr::NameConstant {
            value: NameConstant::True,
            line: *line,
            column: 0,
        }),
        body: trampoline_body,
        orelse: Vec::new(),
        line: *line,
        column: 0,
    };

    let mut new_body = hoist;
    new_body.push(Box::new(trampoline));

    trace!("transformed '{}' into trampoline form", name);

    Ok(Stmt::FunctionDef {
        name: name.clone(),
        params: params.clone(),
        body: new_body,
        // Pass A: drop the optimizer's own decorator so re-materializing
        // the definition cannot re-enter the pipeline
        decorator_list: decorator_list
            .iter()
            .filter(|d| !is_optimizer_decorator(d))
            .cloned()
            .collect(),
        returns: returns.clone(),
        is_async: *is_async,
        line: *line,
        column: *column,
    })
}

impl TailCallTransformer {
    fn transform_block(
        &mut self,
        stmts: &[Box<Stmt>],
    ) -> Result<Vec<Box<Stmt>>, TailRecursionError> {
        let mut result = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            for transformed in self.transform_stmt(stmt)? {
                result.push(Box::new(transformed));
            }
        }
        Ok(result)
    }

    fn transform_stmt(&mut self, stmt: &Stmt) -> Result<Vec<Stmt>, TailRecursionError> {
        match stmt {
            Stmt::Return {
                value: Some(value),
                line,
                column,
            } => {
                if let Expr::Call {
                    func,
                    args,
                    keywords,
                    line: call_line,
                    ..
                } = value.as_ref()
                {
                    if self.is_self_call(func) {
                        return self.rewrite_tail_call(args, keywords, *call_line);
                    }
                }

                // A conditional expression with a self-call in a branch
                // expands to a conditional statement so each branch can be
                // rewritten on its own
                if let Expr::IfExp {
                    test, body, orelse, ..
                } = value.as_ref()
                {
                    if expr_contains_self_call(value, &self.function_name) {
                        let new_test = self.subst_expr(test);
                        let body_stmts = self.transform_return(body, *line)?;
                        let orelse_stmts = self.transform_return(orelse, *line)?;
                        return Ok(vec![Stmt::If {
                            test: Box::new(new_test),
                            body: body_stmts,
                            orelse: orelse_stmts,
                            line: *line,
                            column: *column,
                        }]);
                    }
                }

                Ok(vec![Stmt::Return {
                    value: Some(Box::new(self.subst_expr(value))),
                    line: *line,
                    column: *column,
                }])
            }
            Stmt::Return { value: None, .. } => Ok(vec![stmt.clone()]),
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                line,
                column,
            } => {
                let new_target = Box::new(self.subst_expr(target));
                let new_iter = Box::new(self.subst_expr(iter));
                self.transform_loop(
                    body,
                    orelse,
                    *line,
                    |new_body, new_orelse| Stmt::For {
                        target: new_target,
                        iter: new_iter,
                        body: new_body,
                        orelse: new_orelse,
                        line: *line,
                        column: *column,
                    },
                )
            }
            Stmt::While {
                test,
                body,
                orelse,
                line,
                column,
            } => {
                let new_test = Box::new(self.subst_expr(test));
                self.transform_loop(
                    body,
                    orelse,
                    *line,
                    |new_body, new_orelse| Stmt::While {
                        test: new_test,
                        body: new_body,
                        orelse: new_orelse,
                        line: *line,
                        column: *column,
                    },
                )
            }
            Stmt::If {
                test,
                body,
                orelse,
                line,
                column,
            } => {
                let new_test = self.subst_expr(test);
                let new_body = self.transform_block(body)?;
                let new_orelse = self.transform_block(orelse)?;
                Ok(vec![Stmt::If {
                    test: Box::new(new_test),
                    body: new_body,
                    orelse: new_orelse,
                    line: *line,
                    column: *column,
                }])
            }
            Stmt::Assign {
                targets,
                value,
                line,
                column,
            } => Ok(vec![Stmt::Assign {
                targets: targets
                    .iter()
                    .map(|t| Box::new(self.subst_expr(t)))
                    .collect(),
                value: Box::new(self.subst_expr(value)),
                line: *line,
                column: *column,
            }]),
            Stmt::AugAssign {
                target,
                op,
                value,
                line,
                column,
            } => Ok(vec![Stmt::AugAssign {
                target: Box::new(self.subst_expr(target)),
                op: op.clone(),
                value: Box::new(self.subst_expr(value)),
                line: *line,
                column: *column,
            }]),
            Stmt::Expr {
                value,
                line,
                column,
            } => Ok(vec![Stmt::Expr {
                value: Box::new(self.subst_expr(value)),
                line: *line,
                column: *column,
            }]),
            Stmt::Assert {
                test,
                msg,
                line,
                column,
            } => Ok(vec![Stmt::Assert {
                test: Box::new(self.subst_expr(test)),
                msg: msg.as_ref().map(|m| Box::new(self.subst_expr(m))),
                line: *line,
                column: *column,
            }]),
            // Inner functions have their own scope and are left untouched;
            // the validator has already rejected the hazardous ones
            Stmt::FunctionDef { .. } => Ok(vec![stmt.clone()]),
            Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {
                Ok(vec![stmt.clone()])
            }
        }
    }

    /// Shared loop treatment for `for` and `while`. When the loop body
    /// contains a tail call, the loop gets a sentinel flag: initialized to
    /// False before entry, set to True by the tail-call rewrite, checked
    /// right after the loop to propagate the transfer one level out. The
    /// `else` clause runs in the surrounding scope (a `break` written there
    /// would bind to the enclosing loop), so it is rewritten after the
    /// sentinel is popped.
    fn transform_loop(
        &mut self,
        body: &[Box<Stmt>],
        orelse: &[Box<Stmt>],
        line: usize,
        build: impl FnOnce(Vec<Box<Stmt>>, Vec<Box<Stmt>>) -> Stmt,
    ) -> Result<Vec<Stmt>, TailRecursionError> {
        let has_tail = block_contains_self_call(body, &self.function_name);

        if !has_tail {
            let new_body = self.transform_block(body)?;
            let new_orelse = self.transform_block(orelse)?;
            return Ok(vec![build(new_body, new_orelse)]);
        }

        let flag = self.names.next_flag();

        self.loop_stack.push(flag.clone());
        let new_body = self.transform_block(body)?;
        self.loop_stack.pop();
        let new_orelse = self.transform_block(orelse)?;

        let flag_init = Stmt::Assign {
            targets: vec![Box::new(name_store(&flag, line))],
            value: Box::new(bool_const(false, line)),
            line,
            column: 0,
        };

        let loop_stmt = build(new_body, new_orelse);

        let resume = self.resume_stmts(line);
        let flag_check = Stmt::If {
            test: Box::new(name_load(&flag, line)),
            body: resume.into_iter().map(Box::new).collect(),
            orelse: Vec::new(),
            line,
            column: 0,
        };

        Ok(vec![flag_init, loop_stmt, flag_check])
    }

    /// Rewrite `return f(a1, ..., k=v, ...)` into the parallel rebinding of
    /// the hoisted locals plus a transfer back to the trampoline head.
    fn rewrite_tail_call(
        &mut self,
        args: &[Box<Expr>],
        keywords: &[(Option<String>, Box<Expr>)],
        line: usize,
    ) -> Result<Vec<Stmt>, TailRecursionError> {
        let n = self.params.len();
        let mut slots: Vec<Option<Expr>> = std::iter::repeat_with(|| None).take(n).collect();

        for (i, arg) in args.iter().enumerate() {
            if matches!(arg.as_ref(), Expr::Starred { .. }) {
                return Err(TailRecursionError::argument_shape(
                    &self.function_name,
                    line,
                    "starred arguments cannot be remapped to parameter slots",
                ));
            }
            if i >= n {
                return Err(TailRecursionError::argument_shape(
                    &self.function_name,
                    line,
                    format!(
                        "too many positional arguments ({} given, {} declared)",
                        args.len(),
                        n
                    ),
                ));
            }
            // Argument values are computed from the current trampoline
            // state, so substitution applies to them as well
            slots[i] = Some(self.subst_expr(arg));
        }

        for (keyword, value) in keywords {
            let Some(keyword) = keyword else {
                return Err(TailRecursionError::argument_shape(
                    &self.function_name,
                    line,
                    "'**' arguments cannot be remapped to parameter slots",
                ));
            };
            let Some(idx) = self.params.iter().position(|p| &p.name == keyword) else {
                return Err(TailRecursionError::argument_shape(
                    &self.function_name,
                    line,
                    format!("unknown keyword argument '{}'", keyword),
                ));
            };
            if slots[idx].is_some() {
                return Err(TailRecursionError::argument_shape(
                    &self.function_name,
                    line,
                    format!("duplicate value for parameter '{}'", keyword),
                ));
            }
            slots[idx] = Some(self.subst_expr(value));
        }

        let mut values = Vec::with_capacity(n);
        for (slot, param) in slots.into_iter().zip(self.params.iter()) {
            match slot {
                Some(expr) => values.push(expr),
                // Defaults evaluate in the enclosing scope, never over the
                // parameters, so they are inserted without substitution
                None => match &param.default {
                    Some(default) => values.push(default.clone()),
                    None => {
                        return Err(TailRecursionError::argument_shape(
                            &self.function_name,
                            line,
                            format!("missing value for parameter '{}'", param.name),
                        ));
                    }
                },
            }
        }

        let mut stmts = Vec::new();
        if n == 1 {
            stmts.push(Stmt::Assign {
                targets: vec![Box::new(name_store(&self.params[0].hoisted, line))],
                value: Box::new(values.pop().unwrap()),
                line,
                column: 0,
            });
        } else if n > 1 {
            // One parallel tuple assignment: every value is computed before
            // any hoisted local is rebound
            let targets = self
                .params
                .iter()
                .map(|p| Box::new(name_store(&p.hoisted, line)))
                .collect();
            stmts.push(Stmt::Assign {
                targets: vec![Box::new(Expr::Tuple {
                    elts: targets,
                    ctx: ExprContext::Store,
                    line,
                    column: 0,
                })],
                value: Box::new(Expr::Tuple {
                    elts: values.into_iter().map(Box::new).collect(),
                    ctx: ExprContext::Load,
                    line,
                    column: 0,
                }),
                line,
                column: 0,
            });
        }

        stmts.extend(self.resume_stmts(line));
        Ok(stmts)
    }

    /// The control transfer back to the trampoline from the current
    /// nesting depth: a plain `continue` directly under the trampoline, or
    /// set-innermost-flag-and-break when inside an inner loop.
    fn resume_stmts(&self, line: usize) -> Vec<Stmt> {
        match self.loop_stack.last() {
            Some(flag) => vec![
                Stmt::Assign {
                    targets: vec![Box::new(name_store(flag, line))],
                    value: Box::new(bool_const(true, line)),
                    line,
                    column: 0,
                },
                Stmt::Break { line, column: 0 },
            ],
            None => vec![Stmt::Continue { line, column: 0 }],
        }
    }

    fn transform_return(
        &mut self,
        value: &Expr,
        line: usize,
    ) -> Result<Vec<Box<Stmt>>, TailRecursionError> {
        let ret = Stmt::Return {
            value: Some(Box::new(value.clone())),
            line,
            column: 0,
        };
        let stmts = self.transform_stmt(&ret)?;
        Ok(stmts.into_iter().map(Box::new).collect())
    }

    fn is_self_call(&self, func: &Expr) -> bool {
        matches!(func, Expr::Name { id, .. } if id == &self.function_name)
    }

    /// Pass C: replace reads and writes of the declared parameters with the
    /// hoisted locals. Attribute names and keyword-argument names are
    /// identifiers, not name references, and stay untouched.
    fn subst_expr(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Name {
                id,
                ctx,
                line,
                column,
            } => match self.param_map.get(id) {
                Some(hoisted) => Expr::Name {
                    id: hoisted.clone(),
                    ctx: ctx.clone(),
                    line: *line,
                    column: *column,
                },
                None => expr.clone(),
            },
            Expr::BoolOp {
                op,
                values,
                line,
                column,
            } => Expr::BoolOp {
                op: op.clone(),
                values: values.iter().map(|v| Box::new(self.subst_expr(v))).collect(),
                line: *line,
                column: *column,
            },
            Expr::BinOp {
                left,
                op,
                right,
                line,
                column,
            } => Expr::BinOp {
                left: Box::new(self.subst_expr(left)),
                op: op.clone(),
                right: Box::new(self.subst_expr(right)),
                line: *line,
                column: *column,
            },
            Expr::UnaryOp {
                op,
                operand,
                line,
                column,
            } => Expr::UnaryOp {
                op: op.clone(),
                operand: Box::new(self.subst_expr(operand)),
                line: *line,
                column: *column,
            },
            Expr::IfExp {
                test,
                body,
                orelse,
                line,
                column,
            } => Expr::IfExp {
                test: Box::new(self.subst_expr(test)),
                body: Box::new(self.subst_expr(body)),
                orelse: Box::new(self.subst_expr(orelse)),
                line: *line,
                column: *column,
            },
            Expr::Compare {
                left,
                ops,
                comparators,
                line,
                column,
            } => Expr::Compare {
                left: Box::new(self.subst_expr(left)),
                ops: ops.clone(),
                comparators: comparators
                    .iter()
                    .map(|c| Box::new(self.subst_expr(c)))
                    .collect(),
                line: *line,
                column: *column,
            },
            Expr::Call {
                func,
                args,
                keywords,
                line,
                column,
            } => Expr::Call {
                func: Box::new(self.subst_expr(func)),
                args: args.iter().map(|a| Box::new(self.subst_expr(a))).collect(),
                keywords: keywords
                    .iter()
                    .map(|(name, value)| (name.clone(), Box::new(self.subst_expr(value))))
                    .collect(),
                line: *line,
                column: *column,
            },
            Expr::Yield {
                value,
                line,
                column,
            } => Expr::Yield {
                value: value.as_ref().map(|v| Box::new(self.subst_expr(v))),
                line: *line,
                column: *column,
            },
            Expr::Attribute {
                value,
                attr,
                ctx,
                line,
                column,
            } => Expr::Attribute {
                value: Box::new(self.subst_expr(value)),
                attr: attr.clone(),
                ctx: ctx.clone(),
                line: *line,
                column: *column,
            },
            Expr::Subscript {
                value,
                slice,
                ctx,
                line,
                column,
            } => Expr::Subscript {
                value: Box::new(self.subst_expr(value)),
                slice: Box::new(self.subst_expr(slice)),
                ctx: ctx.clone(),
                line: *line,
                column: *column,
            },
            Expr::Slice {
                lower,
                upper,
                step,
                line,
                column,
            } => Expr::Slice {
                lower: lower.as_ref().map(|e| Box::new(self.subst_expr(e))),
                upper: upper.as_ref().map(|e| Box::new(self.subst_expr(e))),
                step: step.as_ref().map(|e| Box::new(self.subst_expr(e))),
                line: *line,
                column: *column,
            },
            Expr::Starred {
                value,
                ctx,
                line,
                column,
            } => Expr::Starred {
                value: Box::new(self.subst_expr(value)),
                ctx: ctx.clone(),
                line: *line,
                column: *column,
            },
            Expr::List {
                elts,
                ctx,
                line,
                column,
            } => Expr::List {
                elts: elts.iter().map(|e| Box::new(self.subst_expr(e))).collect(),
                ctx: ctx.clone(),
                line: *line,
                column: *column,
            },
            Expr::Tuple {
                elts,
                ctx,
                line,
                column,
            } => Expr::Tuple {
                elts: elts.iter().map(|e| Box::new(self.subst_expr(e))).collect(),
                ctx: ctx.clone(),
                line: *line,
                column: *column,
            },
            Expr::Num { .. } | Expr::Str { .. } | Expr::NameConstant { .. } => expr.clone(),
        }
    }
}

fn name_load(id: &str, line: usize) -> Expr {
    Expr::Name {
        id: id.to_string(),
        ctx: ExprContext::Load,
        line,
        column: 0,
    }
}

fn name_store(id: &str, line: usize) -> Expr {
    Expr::Name {
        id: id.to_string(),
        ctx: ExprContext::Store,
        line,
        column: 0,
    }
}

fn bool_const(value: bool, line: usize) -> Expr {
    Expr::NameConstant {
        value: if value {
            NameConstant::True
        } else {
            NameConstant::False
        },
        line,
        column: 0,
    }
}

/// Whether any statement in the block contains a direct self-call. Nested
/// function definitions are skipped; they are separate scopes.
fn block_contains_self_call(body: &[Box<Stmt>], name: &str) -> bool {
    body.iter().any(|stmt| match stmt.as_ref() {
        Stmt::Return { value, .. } => value
            .as_ref()
            .map_or(false, |v| expr_contains_self_call(v, name)),
        Stmt::Assign { targets, value, .. } => {
            targets.iter().any(|t| expr_contains_self_call(t, name))
                || expr_contains_self_call(value, name)
        }
        Stmt::AugAssign { target, value, .. } => {
            expr_contains_self_call(target, name) || expr_contains_self_call(value, name)
        }
        Stmt::If {
            test, body, orelse, ..
        }
        | Stmt::While {
            test, body, orelse, ..
        } => {
            expr_contains_self_call(test, name)
                || block_contains_self_call(body, name)
                || block_contains_self_call(orelse, name)
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            expr_contains_self_call(target, name)
                || expr_contains_self_call(iter, name)
                || block_contains_self_call(body, name)
                || block_contains_self_call(orelse, name)
        }
        Stmt::Assert { test, msg, .. } => {
            expr_contains_self_call(test, name)
                || msg
                    .as_ref()
                    .map_or(false, |m| expr_contains_self_call(m, name))
        }
        Stmt::Expr { value, .. } => expr_contains_self_call(value, name),
        Stmt::FunctionDef { .. } => false,
        Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => false,
    })
}

fn expr_contains_self_call(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Call {
            func,
            args,
            keywords,
            ..
        } => {
            matches!(func.as_ref(), Expr::Name { id, .. } if id == name)
                || expr_contains_self_call(func, name)
                || args.iter().any(|a| expr_contains_self_call(a, name))
                || keywords
                    .iter()
                    .any(|(_, v)| expr_contains_self_call(v, name))
        }
        Expr::BoolOp { values, .. } => values.iter().any(|v| expr_contains_self_call(v, name)),
        Expr::BinOp { left, right, .. } => {
            expr_contains_self_call(left, name) || expr_contains_self_call(right, name)
        }
        Expr::UnaryOp { operand, .. } => expr_contains_self_call(operand, name),
        Expr::IfExp {
            test, body, orelse, ..
        } => {
            expr_contains_self_call(test, name)
                || expr_contains_self_call(body, name)
                || expr_contains_self_call(orelse, name)
        }
        Expr::Compare {
            left, comparators, ..
        } => {
            expr_contains_self_call(left, name)
                || comparators.iter().any(|c| expr_contains_self_call(c, name))
        }
        Expr::Yield { value, .. } => value
            .as_ref()
            .map_or(false, |v| expr_contains_self_call(v, name)),
        Expr::Attribute { value, .. } => expr_contains_self_call(value, name),
        Expr::Subscript { value, slice, .. } => {
            expr_contains_self_call(value, name) || expr_contains_self_call(slice, name)
        }
        Expr::Slice {
            lower, upper, step, ..
        } => [lower, upper, step]
            .into_iter()
            .flatten()
            .any(|e| expr_contains_self_call(e, name)),
        Expr::Starred { value, .. } => expr_contains_self_call(value, name),
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } => {
            elts.iter().any(|e| expr_contains_self_call(e, name))
        }
        Expr::Name { .. } | Expr::Num { .. } | Expr::Str { .. } | Expr::NameConstant { .. } => {
            false
        }
    }
}

/// Whether control can fall off the end of the block. Conservative: loops
/// are assumed to complete normally.
fn block_always_exits(body: &[Box<Stmt>]) -> bool {
    body.iter().any(|stmt| stmt_always_exits(stmt))
}

fn stmt_always_exits(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => true,
        Stmt::If { body, orelse, .. } => {
            !orelse.is_empty() && block_always_exits(body) && block_always_exits(orelse)
        }
        _ => false,
    }
}

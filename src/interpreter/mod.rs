pub mod env;
pub mod error;
pub mod value;

pub use env::{Env, EnvRef};
pub use error::RuntimeError;
pub use value::{Builtin, FunctionObject, FunctionParam, Value};

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::ast::{
    BoolOperator, CmpOperator, Expr, Module, NameConstant, Number, Operator, Stmt, UnaryOperator,
};
use crate::formatter::expr_source;
use crate::optimizer;

use value::{value_eq, value_is};

const DEFAULT_RECURSION_LIMIT: usize = 1000;

/// Control-flow outcome of executing a statement.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking evaluator for the Python-like language. Hosts the `tco`
/// decorator: decorating a function runs the optimization pipeline at
/// definition time and binds the re-materialized iterative callable in its
/// place.
pub struct Interpreter {
    globals: EnvRef,
    recursion_limit: usize,
    depth: usize,
    // Enclosing scope names, used to compute qualified names like
    // "outer.<locals>.inner"
    qualname_stack: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Env::new();
        for builtin in [Builtin::Print, Builtin::Range, Builtin::Len, Builtin::Tco] {
            Env::set(&globals, builtin.name(), Value::Builtin(builtin));
        }

        Interpreter {
            globals,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            depth: 0,
            qualname_stack: Vec::new(),
        }
    }

    /// Raise or lower the call-depth bound. The default of 1000 mirrors the
    /// host language's stock limit.
    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        Env::get(&self.globals, name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        Env::set(&self.globals, name, value);
    }

    /// Interpret a module in the global environment.
    pub fn interpret(&mut self, module: &Module) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        for stmt in &module.body {
            match self.exec_stmt(stmt, &globals)? {
                Flow::Normal => {}
                Flow::Return(_) => {
                    return Err(RuntimeError::TypeError(
                        "'return' outside function".to_string(),
                    ))
                }
                Flow::Break | Flow::Continue => {
                    return Err(RuntimeError::TypeError(
                        "'break' or 'continue' outside loop".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Call a global binding with positional arguments.
    pub fn call_global(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let func = self
            .get_global(name)
            .ok_or_else(|| RuntimeError::NameError(name.to_string()))?;
        self.call_value(func, args, Vec::new())
    }

    pub fn call_value(
        &mut self,
        func: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        match func {
            Value::Builtin(builtin) => self.call_builtin(builtin, args, kwargs),
            Value::Function(func) => self.call_function_object(&func, args, kwargs),
            other => Err(RuntimeError::TypeError(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn exec_block(&mut self, stmts: &[Box<Stmt>], env: &EnvRef) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::FunctionDef { .. } => {
                self.define_function(stmt, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.eval_expr(value, env)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Assign { targets, value, .. } => {
                let value = self.eval_expr(value, env)?;
                for target in targets {
                    self.assign_target(target, value.clone(), env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                let current = self.eval_expr(target, env)?;
                let operand = self.eval_expr(value, env)?;
                let result = binary_op(op, current, operand)?;
                self.assign_target(target, result, env)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    self.exec_block(body, env)
                } else {
                    self.exec_block(orelse, env)
                }
            }
            Stmt::While {
                test, body, orelse, ..
            } => {
                loop {
                    if !self.eval_expr(test, env)?.is_truthy() {
                        // Normal completion runs the else clause; a break
                        // skips it
                        if !orelse.is_empty() {
                            match self.exec_block(orelse, env)? {
                                Flow::Normal => {}
                                flow => return Ok(flow),
                            }
                        }
                        break;
                    }
                    match self.exec_block(body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                let iter_value = self.eval_expr(iter, env)?;
                let items = iterate(&iter_value)?;
                let mut broke = false;
                for item in items {
                    self.assign_target(target, item, env)?;
                    match self.exec_block(body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => {
                            broke = true;
                            break;
                        }
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                if !broke && !orelse.is_empty() {
                    match self.exec_block(orelse, env)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Assert { test, msg, .. } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    Ok(Flow::Normal)
                } else {
                    let detail = match msg {
                        Some(msg) => format!(": {}", self.eval_expr(msg, env)?),
                        None => String::new(),
                    };
                    Err(RuntimeError::AssertionError(detail))
                }
            }
            Stmt::Expr { value, .. } => {
                self.eval_expr(value, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Pass { .. } => Ok(Flow::Normal),
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
        }
    }

    /// Build a function object from a `def`, apply its decorators
    /// innermost-first, and bind the result.
    fn define_function(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<(), RuntimeError> {
        let Stmt::FunctionDef {
            name,
            params,
            body,
            decorator_list,
            returns,
            ..
        } = stmt
        else {
            unreachable!("define_function called on a non-function statement")
        };

        let mut fparams = Vec::with_capacity(params.len());
        for param in params {
            let default = match &param.default {
                Some(default) => Some(self.eval_expr(default, env)?),
                None => None,
            };
            fparams.push(FunctionParam {
                name: param.name.clone(),
                annotation: param.typ.as_ref().map(|t| expr_source(t)),
                default,
            });
        }

        let docstring = match body.first().map(|s| s.as_ref()) {
            Some(Stmt::Expr { value, .. }) => match value.as_ref() {
                Expr::Str { value, .. } => Some(value.clone()),
                _ => None,
            },
            _ => None,
        };

        let qualname = match self.qualname_stack.last() {
            Some(scope) => format!("{}.{}", scope, name),
            None => name.clone(),
        };

        let func = FunctionObject {
            name: name.clone(),
            qualname,
            params: fparams,
            body: body.clone(),
            docstring,
            returns: returns.as_ref().map(|r| expr_source(r)),
            globals: env.clone(),
            def_node: Some(stmt.clone()),
        };

        let mut value = Value::Function(Rc::new(func));
        for decorator in decorator_list.iter().rev() {
            let decorator_value = self.eval_expr(decorator, env)?;
            value = self.call_value(decorator_value, vec![value], Vec::new())?;
        }

        Env::set(env, name, value);
        Ok(())
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if !kwargs.is_empty() {
            return Err(RuntimeError::TypeError(format!(
                "{}() takes no keyword arguments",
                builtin.name()
            )));
        }

        match builtin {
            Builtin::Print => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                println!("{}", rendered.join(" "));
                Ok(Value::None)
            }
            Builtin::Range => builtin_range(args),
            Builtin::Len => match args.as_slice() {
                [Value::Str(s)] => Ok(Value::Int(BigInt::from(s.chars().count()))),
                [Value::List(items)] => Ok(Value::Int(BigInt::from(items.borrow().len()))),
                [Value::Tuple(items)] => Ok(Value::Int(BigInt::from(items.len()))),
                [other] => Err(RuntimeError::TypeError(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
                _ => Err(RuntimeError::TypeError(
                    "len() takes exactly one argument".to_string(),
                )),
            },
            Builtin::Tco => match args.as_slice() {
                // Factory form: @tco() evaluates to the decorator itself
                [] => Ok(Value::Builtin(Builtin::Tco)),
                [Value::Function(func)] => {
                    let func = func.clone();
                    self.optimize_function(&func)
                }
                [Value::Builtin(builtin)] => Err(RuntimeError::TailRecursion(
                    optimizer::TailRecursionError::source_unavailable(builtin.name()),
                )),
                [other] => Err(RuntimeError::TypeError(format!(
                    "tco() expects a function, got '{}'",
                    other.type_name()
                ))),
                _ => Err(RuntimeError::TypeError(
                    "tco() takes a single function argument".to_string(),
                )),
            },
        }
    }

    /// The decoration-time pipeline plus re-materialization: guard,
    /// validate, transform, then execute the rewritten definition in a copy
    /// of the function's globals and carry the original's metadata onto the
    /// fresh callable.
    fn optimize_function(&mut self, func: &Rc<FunctionObject>) -> Result<Value, RuntimeError> {
        let def = func
            .def_node
            .as_ref()
            .ok_or_else(|| optimizer::TailRecursionError::source_unavailable(&func.name))?;

        let rewritten = optimizer::rewrite_function(def, &func.qualname)?;
        debug!("re-materializing optimized '{}'", func.qualname);

        // Namespace for re-materialization: globals plus any bindings
        // visible through the defining environment. A binding that does not
        // exist yet (the function's own name during decoration) is simply
        // absent and resolves at call time like any other missing name.
        let namespace = Env::flattened_copy(&func.globals);

        let saved_scope = std::mem::take(&mut self.qualname_stack);
        let result = self.exec_stmt(&rewritten, &namespace);
        self.qualname_stack = saved_scope;
        result?;

        let materialized = Env::get(&namespace, &func.name)
            .ok_or_else(|| RuntimeError::NameError(func.name.clone()))?;
        let Value::Function(materialized) = materialized else {
            return Err(RuntimeError::TypeError(
                "re-materialized object is not a function".to_string(),
            ));
        };

        // The equivalent of wrapping: the new callable carries the
        // original's name, qualified name, docstring, annotations and
        // signature, but the rewritten body
        let wrapped = FunctionObject {
            name: func.name.clone(),
            qualname: func.qualname.clone(),
            params: func.params.clone(),
            body: materialized.body.clone(),
            docstring: func.docstring.clone(),
            returns: func.returns.clone(),
            globals: materialized.globals.clone(),
            def_node: materialized.def_node.clone(),
        };

        Ok(Value::Function(Rc::new(wrapped)))
    }

    fn call_function_object(
        &mut self,
        func: &Rc<FunctionObject>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= self.recursion_limit {
            return Err(RuntimeError::RecursionDepth);
        }

        if args.len() > func.params.len() {
            return Err(RuntimeError::TypeError(format!(
                "{}() takes {} positional arguments but {} were given",
                func.name,
                func.params.len(),
                args.len()
            )));
        }

        let mut bound: Vec<Option<Value>> =
            std::iter::repeat_with(|| None).take(func.params.len()).collect();
        for (i, arg) in args.into_iter().enumerate() {
            bound[i] = Some(arg);
        }
        for (name, value) in kwargs {
            let Some(idx) = func.params.iter().position(|p| p.name == name) else {
                return Err(RuntimeError::TypeError(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    func.name, name
                )));
            };
            if bound[idx].is_some() {
                return Err(RuntimeError::TypeError(format!(
                    "{}() got multiple values for argument '{}'",
                    func.name, name
                )));
            }
            bound[idx] = Some(value);
        }

        let local = Env::with_parent(func.globals.clone());
        for (slot, param) in bound.into_iter().zip(func.params.iter()) {
            let value = match slot {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => default.clone(),
                    None => {
                        return Err(RuntimeError::TypeError(format!(
                            "{}() missing required argument '{}'",
                            func.name, param.name
                        )));
                    }
                },
            };
            Env::set(&local, &param.name, value);
        }

        self.depth += 1;
        self.qualname_stack.push(format!("{}.<locals>", func.qualname));
        let result = self.exec_block(&func.body, &local);
        self.qualname_stack.pop();
        self.depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
            Flow::Break | Flow::Continue => Err(RuntimeError::TypeError(
                "'break' or 'continue' outside loop".to_string(),
            )),
        }
    }

    fn assign_target(
        &mut self,
        target: &Expr,
        value: Value,
        env: &EnvRef,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name { id, .. } => {
                Env::set(env, id, value);
                Ok(())
            }
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                let items = match &value {
                    Value::List(items) => items.borrow().clone(),
                    Value::Tuple(items) => items.as_ref().clone(),
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "cannot unpack non-sequence '{}'",
                            other.type_name()
                        )));
                    }
                };
                if items.len() != elts.len() {
                    return Err(RuntimeError::ValueError(format!(
                        "expected {} values to unpack, got {}",
                        elts.len(),
                        items.len()
                    )));
                }
                for (elt, item) in elts.iter().zip(items) {
                    self.assign_target(elt, item, env)?;
                }
                Ok(())
            }
            Expr::Subscript { value: obj, slice, .. } => {
                let container = self.eval_expr(obj, env)?;
                if matches!(slice.as_ref(), Expr::Slice { .. }) {
                    return Err(RuntimeError::TypeError(
                        "slice assignment is not supported".to_string(),
                    ));
                }
                let index = self.eval_expr(slice, env)?;
                match container {
                    Value::List(items) => {
                        let mut items = items.borrow_mut();
                        let idx = normalize_index(&index, items.len())?;
                        items[idx] = value;
                        Ok(())
                    }
                    other => Err(RuntimeError::TypeError(format!(
                        "'{}' object does not support item assignment",
                        other.type_name()
                    ))),
                }
            }
            other => Err(RuntimeError::TypeError(format!(
                "cannot assign to {}",
                other
            ))),
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Name { id, .. } => {
                Env::get(env, id).ok_or_else(|| RuntimeError::NameError(id.clone()))
            }
            Expr::Num { value, .. } => match value {
                Number::Integer(i) => Ok(Value::Int(BigInt::from(*i))),
                Number::Float(f) => Ok(Value::Float(*f)),
            },
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::NameConstant { value, .. } => Ok(match value {
                NameConstant::None => Value::None,
                NameConstant::True => Value::Bool(true),
                NameConstant::False => Value::Bool(false),
            }),
            Expr::BoolOp { op, values, .. } => {
                let mut value = self.eval_expr(&values[0], env)?;
                for next in &values[1..] {
                    let settled = match op {
                        BoolOperator::Or => value.is_truthy(),
                        BoolOperator::And => !value.is_truthy(),
                    };
                    if settled {
                        break;
                    }
                    value = self.eval_expr(next, env)?;
                }
                Ok(value)
            }
            Expr::BinOp {
                left, op, right, ..
            } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                binary_op(op, left, right)
            }
            Expr::UnaryOp { op, operand, .. } => {
                let operand = self.eval_expr(operand, env)?;
                unary_op(op, operand)
            }
            Expr::IfExp {
                test, body, orelse, ..
            } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    self.eval_expr(body, env)
                } else {
                    self.eval_expr(orelse, env)
                }
            }
            Expr::Compare {
                left,
                ops,
                comparators,
                ..
            } => {
                let mut previous = self.eval_expr(left, env)?;
                for (op, comparator) in ops.iter().zip(comparators.iter()) {
                    let current = self.eval_expr(comparator, env)?;
                    if !compare_values(op, &previous, &current)? {
                        return Ok(Value::Bool(false));
                    }
                    previous = current;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call {
                func,
                args,
                keywords,
                ..
            } => {
                let func_value = self.eval_expr(func, env)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    if matches!(arg.as_ref(), Expr::Starred { .. }) {
                        return Err(RuntimeError::TypeError(
                            "argument unpacking is not supported".to_string(),
                        ));
                    }
                    arg_values.push(self.eval_expr(arg, env)?);
                }
                let mut kwarg_values = Vec::with_capacity(keywords.len());
                for (name, value) in keywords {
                    match name {
                        Some(name) => {
                            kwarg_values.push((name.clone(), self.eval_expr(value, env)?))
                        }
                        None => {
                            return Err(RuntimeError::TypeError(
                                "'**' argument unpacking is not supported".to_string(),
                            ));
                        }
                    }
                }
                self.call_value(func_value, arg_values, kwarg_values)
            }
            Expr::Subscript { value, slice, .. } => {
                let container = self.eval_expr(value, env)?;
                if let Expr::Slice {
                    lower, upper, step, ..
                } = slice.as_ref()
                {
                    let lower = self.eval_optional(lower, env)?;
                    let upper = self.eval_optional(upper, env)?;
                    let step = self.eval_optional(step, env)?;
                    slice_value(&container, lower, upper, step)
                } else {
                    let index = self.eval_expr(slice, env)?;
                    index_value(&container, &index)
                }
            }
            Expr::List { elts, .. } => {
                let mut items = Vec::with_capacity(elts.len());
                for elt in elts {
                    items.push(self.eval_expr(elt, env)?);
                }
                Ok(Value::List(Rc::new(RefCell::new(items))))
            }
            Expr::Tuple { elts, .. } => {
                let mut items = Vec::with_capacity(elts.len());
                for elt in elts {
                    items.push(self.eval_expr(elt, env)?);
                }
                Ok(Value::Tuple(Rc::new(items)))
            }
            Expr::Attribute { value, attr, .. } => {
                let value = self.eval_expr(value, env)?;
                Err(RuntimeError::TypeError(format!(
                    "'{}' object has no attribute '{}'",
                    value.type_name(),
                    attr
                )))
            }
            Expr::Yield { .. } => Err(RuntimeError::TypeError(
                "generator functions are not supported".to_string(),
            )),
            Expr::Starred { .. } => Err(RuntimeError::TypeError(
                "starred expression outside call".to_string(),
            )),
            Expr::Slice { .. } => Err(RuntimeError::TypeError(
                "slice outside subscript".to_string(),
            )),
        }
    }

    fn eval_optional(
        &mut self,
        expr: &Option<Box<Expr>>,
        env: &EnvRef,
    ) -> Result<Option<Value>, RuntimeError> {
        match expr {
            Some(expr) => Ok(Some(self.eval_expr(expr, env)?)),
            None => Ok(None),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn iterate(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.as_ref().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn builtin_range(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut ints = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Int(i) => ints.push(i.clone()),
            Value::Bool(b) => ints.push(BigInt::from(*b as i64)),
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "range() argument must be an integer, not '{}'",
                    other.type_name()
                )));
            }
        }
    }

    let (start, stop, step) = match ints.len() {
        1 => (BigInt::zero(), ints[0].clone(), BigInt::one()),
        2 => (ints[0].clone(), ints[1].clone(), BigInt::one()),
        3 => {
            if ints[2].is_zero() {
                return Err(RuntimeError::ValueError(
                    "range() step must not be zero".to_string(),
                ));
            }
            (ints[0].clone(), ints[1].clone(), ints[2].clone())
        }
        n => {
            return Err(RuntimeError::TypeError(format!(
                "range() takes 1 to 3 arguments, got {}",
                n
            )));
        }
    };

    let mut values = Vec::new();
    let mut i = start;
    while if step.is_positive() { i < stop } else { i > stop } {
        values.push(Value::Int(i.clone()));
        i += &step;
    }
    Ok(Value::List(Rc::new(RefCell::new(values))))
}

fn unary_op(op: &UnaryOperator, operand: Value) -> Result<Value, RuntimeError> {
    use value::Numeric;

    match op {
        UnaryOperator::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOperator::USub => match operand.as_number() {
            Some(Numeric::Int(i)) => Ok(Value::Int(-i)),
            Some(Numeric::Float(f)) => Ok(Value::Float(-f)),
            None => Err(RuntimeError::TypeError(format!(
                "bad operand type for unary -: '{}'",
                operand.type_name()
            ))),
        },
        UnaryOperator::UAdd => match operand.as_number() {
            Some(Numeric::Int(i)) => Ok(Value::Int(i)),
            Some(Numeric::Float(f)) => Ok(Value::Float(f)),
            None => Err(RuntimeError::TypeError(format!(
                "bad operand type for unary +: '{}'",
                operand.type_name()
            ))),
        },
        UnaryOperator::Invert => match operand.as_number() {
            Some(Numeric::Int(i)) => Ok(Value::Int(-(i + BigInt::from(1)))),
            _ => Err(RuntimeError::TypeError(format!(
                "bad operand type for unary ~: '{}'",
                operand.type_name()
            ))),
        },
    }
}

fn binary_op(op: &Operator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use value::Numeric;

    // Sequence forms of + and *
    match (op, &left, &right) {
        (Operator::Add, Value::Str(a), Value::Str(b)) => {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
        (Operator::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            return Ok(Value::List(Rc::new(RefCell::new(items))));
        }
        (Operator::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            return Ok(Value::Tuple(Rc::new(items)));
        }
        (Operator::Mult, Value::Str(s), other) | (Operator::Mult, other, Value::Str(s)) => {
            let count = repeat_count(other)?;
            return Ok(Value::Str(s.repeat(count)));
        }
        (Operator::Mult, Value::List(items), other)
        | (Operator::Mult, other, Value::List(items)) => {
            let count = repeat_count(other)?;
            let items = items.borrow();
            let mut result = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                result.extend(items.iter().cloned());
            }
            return Ok(Value::List(Rc::new(RefCell::new(result))));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(RuntimeError::TypeError(format!(
            "unsupported operand types for {:?}: '{}' and '{}'",
            op,
            left.type_name(),
            right.type_name()
        )));
    };

    match (a, b) {
        (Numeric::Int(a), Numeric::Int(b)) => int_op(op, a, b),
        (a, b) => float_op(op, a.to_f64(), b.to_f64()),
    }
}

fn repeat_count(value: &Value) -> Result<usize, RuntimeError> {
    match value {
        Value::Int(i) => Ok(i.to_usize().unwrap_or(0)),
        Value::Bool(b) => Ok(*b as usize),
        other => Err(RuntimeError::TypeError(format!(
            "can't multiply sequence by non-int of type '{}'",
            other.type_name()
        ))),
    }
}

fn int_op(op: &Operator, a: BigInt, b: BigInt) -> Result<Value, RuntimeError> {
    match op {
        Operator::Add => Ok(Value::Int(a + b)),
        Operator::Sub => Ok(Value::Int(a - b)),
        Operator::Mult => Ok(Value::Int(a * b)),
        Operator::Div => {
            if b.is_zero() {
                return Err(RuntimeError::ZeroDivision);
            }
            Ok(Value::Float(
                a.to_f64().unwrap_or(f64::INFINITY) / b.to_f64().unwrap_or(f64::INFINITY),
            ))
        }
        Operator::FloorDiv => {
            if b.is_zero() {
                return Err(RuntimeError::ZeroDivision);
            }
            let q = &a / &b;
            let r = &a % &b;
            // Floor semantics: round toward negative infinity
            if !r.is_zero() && (r.is_negative() != b.is_negative()) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        Operator::Mod => {
            if b.is_zero() {
                return Err(RuntimeError::ZeroDivision);
            }
            let r = &a % &b;
            // Result takes the sign of the divisor
            if !r.is_zero() && (r.is_negative() != b.is_negative()) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        Operator::Pow => {
            if b.is_negative() {
                return Ok(Value::Float(
                    a.to_f64()
                        .unwrap_or(f64::INFINITY)
                        .powf(b.to_f64().unwrap_or(f64::NEG_INFINITY)),
                ));
            }
            let exponent = b.to_u32().ok_or_else(|| {
                RuntimeError::ValueError("exponent too large".to_string())
            })?;
            Ok(Value::Int(num_traits::Pow::pow(&a, exponent)))
        }
        Operator::LShift => {
            let shift = shift_amount(&b)?;
            Ok(Value::Int(a << shift))
        }
        Operator::RShift => {
            let shift = shift_amount(&b)?;
            Ok(Value::Int(a >> shift))
        }
        Operator::BitOr => Ok(Value::Int(a | b)),
        Operator::BitXor => Ok(Value::Int(a ^ b)),
        Operator::BitAnd => Ok(Value::Int(a & b)),
    }
}

fn shift_amount(b: &BigInt) -> Result<usize, RuntimeError> {
    if b.is_negative() {
        return Err(RuntimeError::ValueError("negative shift count".to_string()));
    }
    b.to_usize()
        .ok_or_else(|| RuntimeError::ValueError("shift count too large".to_string()))
}

fn float_op(op: &Operator, a: f64, b: f64) -> Result<Value, RuntimeError> {
    match op {
        Operator::Add => Ok(Value::Float(a + b)),
        Operator::Sub => Ok(Value::Float(a - b)),
        Operator::Mult => Ok(Value::Float(a * b)),
        Operator::Div => {
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision);
            }
            Ok(Value::Float(a / b))
        }
        Operator::FloorDiv => {
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision);
            }
            Ok(Value::Float((a / b).floor()))
        }
        Operator::Mod => {
            if b == 0.0 {
                return Err(RuntimeError::ZeroDivision);
            }
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                Ok(Value::Float(r + b))
            } else {
                Ok(Value::Float(r))
            }
        }
        Operator::Pow => Ok(Value::Float(a.powf(b))),
        _ => Err(RuntimeError::TypeError(format!(
            "unsupported operand types for {:?}: 'float'",
            op
        ))),
    }
}

fn compare_values(op: &CmpOperator, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    use std::cmp::Ordering;
    use value::Numeric;

    match op {
        CmpOperator::Eq => return Ok(value_eq(a, b)),
        CmpOperator::NotEq => return Ok(!value_eq(a, b)),
        CmpOperator::Is => return Ok(value_is(a, b)),
        CmpOperator::IsNot => return Ok(!value_is(a, b)),
        CmpOperator::In => return contains(b, a),
        CmpOperator::NotIn => return contains(b, a).map(|found| !found),
        _ => {}
    }

    let ordering = match (a, b) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match (a.as_number(), b.as_number()) {
            (Some(Numeric::Int(a)), Some(Numeric::Int(b))) => a.cmp(&b),
            (Some(a), Some(b)) => match a.to_f64().partial_cmp(&b.to_f64()) {
                Some(ordering) => ordering,
                None => return Ok(false),
            },
            _ => {
                return Err(RuntimeError::TypeError(format!(
                    "'{:?}' not supported between instances of '{}' and '{}'",
                    op,
                    a.type_name(),
                    b.type_name()
                )));
            }
        },
    };

    Ok(match op {
        CmpOperator::Lt => ordering == Ordering::Less,
        CmpOperator::LtE => ordering != Ordering::Greater,
        CmpOperator::Gt => ordering == Ordering::Greater,
        CmpOperator::GtE => ordering != Ordering::Less,
        _ => unreachable!(),
    })
}

fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match container {
        Value::List(items) => Ok(items.borrow().iter().any(|i| value_eq(i, item))),
        Value::Tuple(items) => Ok(items.iter().any(|i| value_eq(i, item))),
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(RuntimeError::TypeError(format!(
                "'in <string>' requires string as left operand, not '{}'",
                other.type_name()
            ))),
        },
        other => Err(RuntimeError::TypeError(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn normalize_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let idx = match index {
        Value::Int(i) => i.clone(),
        Value::Bool(b) => BigInt::from(*b as i64),
        other => {
            return Err(RuntimeError::TypeError(format!(
                "indices must be integers, not '{}'",
                other.type_name()
            )));
        }
    };

    let idx = if idx.is_negative() {
        idx + BigInt::from(len)
    } else {
        idx
    };

    idx.to_usize()
        .filter(|i| *i < len)
        .ok_or(RuntimeError::IndexError)
}

fn index_value(container: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let idx = normalize_index(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::Tuple(items) => {
            let idx = normalize_index(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(index, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn slice_value(
    container: &Value,
    lower: Option<Value>,
    upper: Option<Value>,
    step: Option<Value>,
) -> Result<Value, RuntimeError> {
    if let Some(step) = &step {
        match step {
            Value::Int(i) if i.is_one() => {}
            Value::Int(_) => {
                return Err(RuntimeError::TypeError(
                    "only slice steps of 1 are supported".to_string(),
                ));
            }
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "slice step must be an integer, not '{}'",
                    other.type_name()
                )));
            }
        }
    }

    let bound = |value: Option<Value>, default: i64, len: i64| -> Result<i64, RuntimeError> {
        let Some(value) = value else {
            return Ok(default);
        };
        let raw = match value {
            Value::Int(i) => i.to_i64().unwrap_or(if i.is_negative() {
                i64::MIN / 2
            } else {
                i64::MAX / 2
            }),
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "slice indices must be integers, not '{}'",
                    other.type_name()
                )));
            }
        };
        let adjusted = if raw < 0 { raw + len } else { raw };
        Ok(adjusted.clamp(0, len))
    };

    match container {
        Value::List(items) => {
            let items = items.borrow();
            let len = items.len() as i64;
            let start = bound(lower, 0, len)? as usize;
            let stop = bound(upper, len, len)? as usize;
            let slice = if start < stop {
                items[start..stop].to_vec()
            } else {
                Vec::new()
            };
            Ok(Value::List(Rc::new(RefCell::new(slice))))
        }
        Value::Tuple(items) => {
            let len = items.len() as i64;
            let start = bound(lower, 0, len)? as usize;
            let stop = bound(upper, len, len)? as usize;
            let slice = if start < stop {
                items[start..stop].to_vec()
            } else {
                Vec::new()
            };
            Ok(Value::Tuple(Rc::new(slice)))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = bound(lower, 0, len)? as usize;
            let stop = bound(upper, len, len)? as usize;
            let slice: String = if start < stop {
                chars[start..stop].iter().collect()
            } else {
                String::new()
            };
            Ok(Value::Str(slice))
        }
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

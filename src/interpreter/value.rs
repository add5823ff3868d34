use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::ast::Stmt;

use super::env::EnvRef;

/// Runtime value. Integers are arbitrary precision, lists share mutable
/// storage, tuples are immutable.
#[derive(Debug, Clone)]
pub enum Value {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Function(Rc<FunctionObject>),
    Builtin(Builtin),
    None,
}

/// Native callables bound in every module environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Builtin {
    Print,
    Range,
    Len,
    /// The tail-call-optimizing decorator.
    Tco,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Tco => "tco",
        }
    }
}

/// A user-defined function: its signature and metadata, the statements of
/// its body, the environment it was defined in, and the `def` node it came
/// from (the source the optimizer re-parses; absent for callables with no
/// recoverable definition).
#[derive(Debug)]
pub struct FunctionObject {
    pub name: String,
    pub qualname: String,
    pub params: Vec<FunctionParam>,
    pub body: Vec<Box<Stmt>>,
    pub docstring: Option<String>,
    pub returns: Option<String>,
    pub globals: EnvRef,
    pub def_node: Option<Stmt>,
}

#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<Value>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::None => "NoneType",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => !i.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
            Value::None => false,
        }
    }

    /// Numeric view used for mixed arithmetic and comparison; booleans
    /// count as 0/1 the way the host language treats them.
    pub fn as_number(&self) -> Option<Numeric> {
        match self {
            Value::Int(i) => Some(Numeric::Int(i.clone())),
            Value::Bool(b) => Some(Numeric::Int(BigInt::from(*b as i64))),
            Value::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(BigInt::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

pub enum Numeric {
    Int(BigInt),
    Float(f64),
}

impl Numeric {
    pub fn to_f64(&self) -> f64 {
        match self {
            Numeric::Int(i) => i.to_f64().unwrap_or(f64::INFINITY),
            Numeric::Float(f) => *f,
        }
    }
}

/// Structural equality with numeric cross-type comparison.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| value_eq(x, y))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| value_eq(x, y))
        }
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => match (a.as_number(), b.as_number()) {
            (Some(Numeric::Int(a)), Some(Numeric::Int(b))) => a == b,
            (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
            _ => false,
        },
    }
}

/// Identity comparison (`is`). Reference types compare by pointer,
/// singletons by kind.
pub fn value_is(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => {
                if fl.fract() == 0.0 && fl.is_finite() {
                    write!(f, "{:.1}", fl)
                } else {
                    write!(f, "{}", fl)
                }
            }
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", repr(item))?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", repr(item))?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Function(func) => write!(f, "<function {}>", func.qualname),
            Value::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            Value::None => write!(f, "None"),
        }
    }
}

/// Element rendering inside containers: strings get quotes.
fn repr(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

use std::fmt;
use thiserror::Error;

/// A single tail-position violation found by the validator.
#[derive(Debug, Clone)]
pub struct Violation {
    pub line: usize,
    pub message: String,
}

impl Violation {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Violation {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The single structured error raised by the optimization pipeline. Every
/// variant is surfaced at decoration time; no partially transformed function
/// is ever produced.
#[derive(Error, Debug, Clone)]
pub enum TailRecursionError {
    #[error(
        "async function '{name}' cannot be optimized: interleaved activations \
         would share the rebound parameters"
    )]
    AsyncRejected { name: String },

    #[error(
        "cannot optimize nested function '{qualname}': define it at module \
         scope and decorate it there"
    )]
    NestedRejected { qualname: String },

    #[error("generator function '{name}' cannot be optimized ('yield' at line {line})")]
    GeneratorRejected { name: String, line: usize },

    #[error(
        "function '{name}' is not properly tail-recursive:\n{}",
        format_violations(.violations)
    )]
    NotTailRecursive {
        name: String,
        violations: Vec<Violation>,
    },

    #[error("source for function '{name}' is unavailable")]
    SourceUnavailable { name: String },

    #[error("line {line}: cannot remap tail-call arguments of '{name}': {message}")]
    ArgumentShape {
        name: String,
        line: usize,
        message: String,
    },
}

impl TailRecursionError {
    pub fn argument_shape(name: &str, line: usize, message: impl Into<String>) -> Self {
        TailRecursionError::ArgumentShape {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn source_unavailable(name: &str) -> Self {
        TailRecursionError::SourceUnavailable {
            name: name.to_string(),
        }
    }

    /// The first source line implicated by this error, when one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            TailRecursionError::GeneratorRejected { line, .. } => Some(*line),
            TailRecursionError::ArgumentShape { line, .. } => Some(*line),
            TailRecursionError::NotTailRecursive { violations, .. } => {
                violations.first().map(|v| v.line)
            }
            _ => None,
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

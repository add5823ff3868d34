use thiserror::Error;

use crate::optimizer::TailRecursionError;

/// Runtime errors raised while interpreting a program. Decoration-time
/// failures from the optimizer pass through unwrapped as the
/// `TailRecursion` variant.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    #[error("maximum recursion depth exceeded")]
    RecursionDepth,

    #[error("name '{0}' is not defined")]
    NameError(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("division by zero")]
    ZeroDivision,

    #[error("index out of range")]
    IndexError,

    #[error("assertion failed{0}")]
    AssertionError(String),

    #[error("value error: {0}")]
    ValueError(String),

    #[error(transparent)]
    TailRecursion(#[from] TailRecursionError),
}

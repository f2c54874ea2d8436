use thiserror::Error;

use super::function::FunctionError;

/// Errors raised while evaluating a compiled expression against working memory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no fact named '{name}'")]
    MissingFact { name: String },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("operator '{op}' expects {expected}, found {found}")]
    InvalidOperand {
        op: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{op}'")]
    Overflow { op: String },

    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    #[error("evaluation panicked: {message}")]
    Panic { message: String },
}

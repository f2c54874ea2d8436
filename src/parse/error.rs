use thiserror::Error;

/// Errors produced when compiling expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parse error: {message}")]
    Syntax { message: String },

    #[error("undefined function '{name}'")]
    UndefinedFunction { name: String },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }
}

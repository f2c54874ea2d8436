use std::time::Duration;

use thiserror::Error;

use crate::parse::ParseError;
use crate::pool::PoolError;
use crate::EvalError;

/// Per-rule and per-invocation failures collected by [`Engine::run`](crate::Engine::run).
///
/// None of these abort the invocation outright: they are gathered into the
/// [`Outcome`](crate::Outcome) alongside whatever target value the remaining
/// rules produced.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule {rule} ({output}): failed to compile `{expression}`: {source}")]
    Compile {
        rule: usize,
        output: String,
        expression: String,
        #[source]
        source: ParseError,
    },

    #[error("rule {rule} ({output}): {source}")]
    Evaluation {
        rule: usize,
        output: String,
        #[source]
        source: EvalError,
    },

    #[error("round {round} timed out after {elapsed:?} with {pending} job(s) pending")]
    Timeout {
        round: usize,
        pending: usize,
        elapsed: Duration,
    },

    #[error("session workers disconnected")]
    Disconnected,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl EngineError {
    #[must_use]
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    #[must_use]
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Index of the rule that failed, for per-rule errors.
    #[must_use]
    pub fn rule(&self) -> Option<usize> {
        match self {
            Self::Compile { rule, .. } | Self::Evaluation { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

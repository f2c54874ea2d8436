use std::fmt;
use std::time::Duration;

use super::Value;
use crate::error::EngineError;

/// Result of [`Engine::run`](crate::Engine::run): the target fact's value, if
/// any rule (or the initial facts) produced it, and every per-rule error.
///
/// An absent value with no errors means the dependency chain to the target
/// was never satisfied.
#[derive(Debug)]
#[must_use]
pub struct Outcome {
    value: Option<Value>,
    errors: Vec<EngineError>,
}

impl Outcome {
    pub(crate) fn new(value: Option<Value>, errors: Vec<EngineError>) -> Self {
        Self { value, errors }
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn errors(&self) -> &[EngineError] {
        &self.errors
    }

    /// True when no rule failed, whether or not a value was produced.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<Value>, Vec<EngineError>) {
        (self.value, self.errors)
    }
}

/// Detailed report returned by
/// [`Engine::run_detailed`](crate::Engine::run_detailed).
///
/// Records which rules were scheduled in each round, in declaration order,
/// along with the wall-clock duration of the whole invocation.
#[derive(Debug)]
#[must_use]
pub struct RunReport {
    outcome: Outcome,
    rounds: Vec<Vec<usize>>,
    duration: Duration,
}

impl RunReport {
    pub(crate) fn new(outcome: Outcome, rounds: Vec<Vec<usize>>, duration: Duration) -> Self {
        Self {
            outcome,
            rounds,
            duration,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    /// Rule indices scheduled in each round.
    #[must_use]
    pub fn rounds(&self) -> &[Vec<usize>] {
        &self.rounds
    }

    /// The round a rule was scheduled in (1-based), if it was scheduled at all.
    #[must_use]
    pub fn round_of(&self, rule: usize) -> Option<usize> {
        self.rounds
            .iter()
            .position(|round| round.contains(&rule))
            .map(|i| i + 1)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome.value() {
            Some(v) => write!(f, "value: {v}")?,
            None => write!(f, "value: none")?,
        }
        write!(f, ", rounds: {}", self.rounds.len())?;
        write!(f, ", errors: {}", self.outcome.errors().len())?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}

//! The round loop.
//!
//! Each round compiles (or fetches) the expression of every ready rule,
//! submits the jobs, waits for all of their results, merges them in
//! declaration order and computes the next round from the merged outputs.
//! Nothing written in round K is visible to evaluations of round K.

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::cache::ExpressionCache;
use crate::config::{CompileFailurePolicy, EngineConfig};
use crate::error::EngineError;
use crate::session::Session;
use crate::{Facts, Functions, RuleSet, Value};

/// Everything a dispatch reads besides the session.
pub(crate) struct Dispatcher<'a> {
    pub(crate) rules: &'a RuleSet,
    pub(crate) functions: &'a Functions,
    pub(crate) cache: &'a ExpressionCache,
    pub(crate) config: &'a EngineConfig,
}

pub(crate) struct Dispatched {
    pub(crate) value: Option<Value>,
    pub(crate) errors: Vec<EngineError>,
    pub(crate) rounds: Vec<Vec<usize>>,
    /// A round was abandoned with jobs still running; the session must not be
    /// reused.
    pub(crate) abandoned: bool,
}

impl Dispatcher<'_> {
    pub(crate) fn run(&self, session: &Session, initial: &Facts, target: &str) -> Dispatched {
        let mut ready = session.seed(initial, self.rules, self.config.zero_input_rules);
        let mut errors = Vec::new();
        let mut rounds = Vec::new();
        let mut abandoned = false;

        while !ready.is_empty() {
            ready.sort_unstable();
            ready.dedup();
            let round = rounds.len() + 1;
            debug!(round, ready = ready.len(), "round started");

            let (submitted, mut halted) = self.submit_round(session, &ready, &mut errors);
            rounds.push(ready);

            let started = Instant::now();
            let deadline = self.config.round_timeout.map(|timeout| started + timeout);
            let mut collected = session.collect(submitted, deadline);

            if collected.timed_out {
                session.abort();
                let pending = submitted - collected.results.len();
                let elapsed = started.elapsed();
                warn!(round, pending, ?elapsed, "round timed out");
                errors.push(EngineError::Timeout {
                    round,
                    pending,
                    elapsed,
                });
                halted = true;
                abandoned = true;
            }
            if collected.disconnected {
                warn!(round, "session workers disconnected");
                errors.push(EngineError::Disconnected);
                halted = true;
            }

            // Declaration order: the last declared writer of an output wins.
            collected.results.sort_by_key(|result| result.rule);
            let mut merged = Vec::with_capacity(collected.results.len());
            for result in collected.results {
                match result.outcome {
                    Ok(value) => {
                        session.merge(&result.output, value);
                        merged.push(result.output);
                    }
                    Err(source) => errors.push(EngineError::Evaluation {
                        rule: result.rule,
                        output: result.output,
                        source,
                    }),
                }
            }

            if halted {
                break;
            }
            ready = Vec::new();
            for output in &merged {
                session.schedule(self.rules, output, &mut ready);
            }
        }

        let stray = session.drain();
        if stray > 0 {
            trace!(stray, "discarded stray results while draining");
        }
        debug!(rounds = rounds.len(), errors = errors.len(), target, "dispatch finished");

        Dispatched {
            value: session.get(target),
            errors,
            rounds,
            abandoned,
        }
    }

    /// Compile and submit one round's jobs. Returns how many jobs were
    /// submitted and whether a failure ends the invocation after this round.
    fn submit_round(
        &self,
        session: &Session,
        ready: &[usize],
        errors: &mut Vec<EngineError>,
    ) -> (usize, bool) {
        let mut submitted = 0;
        let mut halted = false;

        for &index in ready {
            let Some(rule) = self.rules.get(index) else {
                continue;
            };
            let expression = match self.cache.get_or_compile(&rule.expression, self.functions) {
                Ok(expression) => expression,
                Err(source) => {
                    warn!(
                        rule = index,
                        output = %rule.output,
                        error = %source,
                        "rule failed to compile"
                    );
                    errors.push(EngineError::Compile {
                        rule: index,
                        output: rule.output.clone(),
                        expression: rule.expression.clone(),
                        source,
                    });
                    halted = true;
                    if self.config.compile_failure == CompileFailurePolicy::HaltRound {
                        break;
                    }
                    continue;
                }
            };
            if let Err(err) = session.submit(index, &rule.output, expression) {
                errors.push(err);
                halted = true;
                break;
            }
            submitted += 1;
        }

        (submitted, halted)
    }
}

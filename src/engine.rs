use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::ExpressionCache;
use crate::config::{resolve_workers, EngineConfig, DEFAULT_TARGET};
use crate::dispatch::Dispatcher;
use crate::pool::{PoolStats, RefCountedPool};
use crate::session::Session;
use crate::{Facts, Functions, Outcome, RuleSet, RunReport};

#[derive(Debug, Default)]
struct State {
    facts: Facts,
    rules: RuleSet,
    functions: Functions,
}

/// A forward-chaining rule engine.
///
/// Holds the initial facts, the rule set and the extension functions, plus a
/// compiled-expression cache and a pool of reusable sessions sized to the
/// configured worker count. `run` may be called concurrently from many
/// threads; the setters wait for in-flight runs to finish.
///
/// ```
/// use chainfire::{Engine, Facts, RuleSet, Value};
///
/// let engine = Engine::with_workers(2);
/// engine.set_facts(
///     Facts::new()
///         .set("account_partner", "hello")
///         .set("account_region", "ID"),
/// );
/// engine.set_rules(
///     RuleSet::builder()
///         .rule(
///             ["account_partner", "account_region"],
///             "isEligible",
///             r#"account_partner == "hello" && account_region == "ID""#,
///         )
///         .rule(["isEligible"], "result_end", "isEligible")
///         .build(),
/// );
///
/// let outcome = engine.run_default();
/// assert_eq!(outcome.value(), Some(&Value::Bool(true)));
/// assert!(outcome.is_clean());
/// ```
pub struct Engine {
    state: RwLock<State>,
    config: EngineConfig,
    cache: ExpressionCache,
    workers: usize,
    pool: RefCountedPool<Session>,
}

impl Engine {
    /// Engine with the default configuration (auto-sized workers).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self::with_config(EngineConfig::default().with_workers(workers))
    }

    /// Engine with explicit worker count and cache lifetimes. `workers == 0`
    /// sizes from the CPU count.
    #[must_use]
    pub fn configure(workers: usize, cache_ttl: Duration, cache_sweep_interval: Duration) -> Self {
        Self::with_config(
            EngineConfig::default()
                .with_workers(workers)
                .with_cache_ttl(cache_ttl)
                .with_cache_sweep_interval(cache_sweep_interval),
        )
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let workers = config.resolved_workers();
        Self {
            state: RwLock::new(State::default()),
            cache: ExpressionCache::new(config.cache_ttl, config.cache_sweep_interval),
            config,
            workers,
            pool: RefCountedPool::new(move || Session::new(workers)),
        }
    }

    /// Replace the initial facts wholesale.
    pub fn set_facts(&self, facts: Facts) {
        self.state.write().facts = facts;
    }

    /// Replace the rule set and flush the expression cache.
    pub fn set_rules(&self, rules: impl Into<RuleSet>) {
        let rules = rules.into();
        let mut state = self.state.write();
        debug!(%rules, "rule set replaced");
        state.rules = rules;
        self.cache.flush();
    }

    /// Replace the extension-function table. Compiled expressions bind the
    /// functions they call, so the cache is flushed too.
    pub fn set_rule_functions(&self, functions: Functions) {
        let mut state = self.state.write();
        state.functions = functions;
        self.cache.flush();
    }

    /// Replace facts, rules and functions in one step.
    pub fn set(&self, facts: Facts, rules: impl Into<RuleSet>, functions: Functions) {
        let rules = rules.into();
        let mut state = self.state.write();
        *state = State {
            facts,
            rules,
            functions,
        };
        self.cache.flush();
    }

    /// Fire rules until nothing more is ready and return the value of
    /// `target`. `workers == 0` uses the configured worker count; any other
    /// count (capped at [`MAX_WORKERS`](crate::MAX_WORKERS)) runs on a one-off
    /// session that is torn down afterwards.
    pub fn run(&self, target: &str, workers: usize) -> Outcome {
        self.run_detailed(target, workers).into_outcome()
    }

    /// [`run`](Self::run) with the default target `"result_end"` and worker
    /// count.
    pub fn run_default(&self) -> Outcome {
        self.run(DEFAULT_TARGET, 0)
    }

    /// Like [`run`](Self::run), also reporting which rules fired in each
    /// round and how long the invocation took.
    pub fn run_detailed(&self, target: &str, workers: usize) -> RunReport {
        let started = Instant::now();
        let state = self.state.read();
        let workers = if workers > 0 {
            resolve_workers(workers)
        } else {
            self.workers
        };

        let scratch;
        let pool = if workers == self.workers {
            &self.pool
        } else {
            debug!(workers, "worker override, using a one-off session");
            scratch = RefCountedPool::new(move || Session::new(workers));
            &scratch
        };
        let session = pool.acquire();
        let dispatcher = Dispatcher {
            rules: &state.rules,
            functions: &state.functions,
            cache: &self.cache,
            config: &self.config,
        };
        let dispatched = dispatcher.run(&session, &state.facts, target);

        let mut errors = dispatched.errors;
        // Workers of an abandoned round may still be evaluating; resetting the
        // session would wait for them.
        let given_back = if dispatched.abandoned {
            session.retire()
        } else {
            session.release()
        };
        if let Err(err) = given_back {
            warn!(error = %err, "session release failed");
            errors.push(err.into());
        }

        RunReport::new(
            Outcome::new(dispatched.value, errors),
            dispatched.rounds,
            started.elapsed(),
        )
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Counters of the session pool. One-off sessions built for worker
    /// overrides are not counted.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Drop every idle session, joining its worker threads.
    pub fn clear_sessions(&self) {
        self.pool.clear();
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.state.read().rules.len()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("rules", &self.rule_count())
            .field("cache", &self.cache.stats())
            .field("pool", &self.pool_stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rule, Value};

    fn eligibility_engine() -> Engine {
        let engine = Engine::with_workers(2);
        engine.set_facts(
            Facts::new()
                .set("account_partner", "hello")
                .set("account_region", "ID"),
        );
        engine.set_rules(vec![
            Rule::new(
                ["account_partner", "account_region"],
                "isEligible",
                r#"account_partner == "hello" && account_region == "ID""#,
            ),
            Rule::new(["isEligible"], "result_end", "isEligible"),
        ]);
        engine
    }

    #[test]
    fn run_reaches_target() {
        let outcome = eligibility_engine().run_default();
        assert_eq!(outcome.value(), Some(&Value::Bool(true)));
        assert!(outcome.is_clean());
    }

    #[test]
    fn sessions_are_reused_between_runs() {
        let engine = eligibility_engine();
        let _ = engine.run_default();
        let _ = engine.run_default();
        let stats = engine.pool_stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.referenced, 2);
        assert_eq!(stats.returned, 2);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn worker_overrides_do_not_grow_the_pool() {
        let engine = eligibility_engine();
        let _ = engine.run_default();
        for workers in [1, 3, 5, 7, 9] {
            let outcome = engine.run(DEFAULT_TARGET, workers);
            assert_eq!(outcome.value(), Some(&Value::Bool(true)));
            assert!(outcome.is_clean());
        }
        let stats = engine.pool_stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.referenced, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn override_matching_configured_count_uses_the_pool() {
        let engine = eligibility_engine();
        let _ = engine.run(DEFAULT_TARGET, 2);
        let _ = engine.run_default();
        let stats = engine.pool_stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.referenced, 2);
    }

    #[test]
    fn set_rules_flushes_cache() {
        let engine = eligibility_engine();
        let _ = engine.run_default();
        assert_eq!(engine.cache().len(), 2);
        engine.set_rules(RuleSet::default());
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn set_rule_functions_flushes_cache() {
        let engine = eligibility_engine();
        let _ = engine.run_default();
        engine.set_rule_functions(Functions::new());
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn repeated_runs_hit_the_cache() {
        let engine = eligibility_engine();
        let _ = engine.run_default();
        let _ = engine.run_default();
        let stats = engine.cache().stats();
        assert_eq!(stats.compiles, 2);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn run_detailed_reports_rounds() {
        let report = eligibility_engine().run_detailed(DEFAULT_TARGET, 0);
        assert_eq!(report.rounds(), &[vec![0], vec![1]]);
        assert_eq!(report.round_of(1), Some(2));
        assert_eq!(report.outcome().value(), Some(&Value::Bool(true)));
    }

    #[test]
    fn empty_engine_yields_nothing() {
        let outcome = Engine::with_workers(1).run_default();
        assert_eq!(outcome.value(), None);
        assert!(outcome.is_clean());
    }
}

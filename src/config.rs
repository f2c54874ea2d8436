use std::time::Duration;

use crate::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};

/// Target fact name used by [`Engine::run_default`](crate::Engine::run_default).
pub const DEFAULT_TARGET: &str = "result_end";

/// Upper bound on worker threads per session, for configured counts and
/// per-run overrides alike.
pub const MAX_WORKERS: usize = 256;

/// Whether rules with no inputs fire at seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZeroInputPolicy {
    /// Zero-input rules never fire.
    #[default]
    Skip,
    /// Zero-input rules are scheduled in the first round.
    FireOnSeed,
}

/// What happens to the rest of a round when one ready rule fails to compile.
///
/// Either way, no further rounds run after the failing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompileFailurePolicy {
    /// Submit every other ready rule of the round.
    #[default]
    FinishRound,
    /// Stop launching jobs at the first failure. Jobs already submitted are
    /// still awaited and merged.
    HaltRound,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Worker threads per session; `0` sizes from the CPU count. Capped at
    /// [`MAX_WORKERS`].
    pub workers: usize,
    /// Sliding lifetime of an unused cache entry.
    pub cache_ttl: Duration,
    /// Minimum time between opportunistic cache sweeps.
    pub cache_sweep_interval: Duration,
    /// Deadline for collecting one round's results.
    pub round_timeout: Option<Duration>,
    pub zero_input_rules: ZeroInputPolicy,
    pub compile_failure: CompileFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            cache_ttl: DEFAULT_TTL,
            cache_sweep_interval: DEFAULT_SWEEP_INTERVAL,
            round_timeout: None,
            zero_input_rules: ZeroInputPolicy::default(),
            compile_failure: CompileFailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cache_sweep_interval(mut self, interval: Duration) -> Self {
        self.cache_sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_zero_input_rules(mut self, policy: ZeroInputPolicy) -> Self {
        self.zero_input_rules = policy;
        self
    }

    #[must_use]
    pub fn with_compile_failure(mut self, policy: CompileFailurePolicy) -> Self {
        self.compile_failure = policy;
        self
    }

    /// Worker count after resolving `0` against the CPU count.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        resolve_workers(self.workers)
    }
}

/// `0` means one less than the logical CPU count, and a single worker on
/// machines with two CPUs or fewer.
pub(crate) fn resolve_workers(requested: usize) -> usize {
    let workers = if requested > 0 {
        requested
    } else {
        let cpus = num_cpus::get();
        if cpus <= 2 { 1 } else { cpus - 1 }
    };
    workers.min(MAX_WORKERS)
}

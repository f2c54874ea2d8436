//! Content-addressed cache of compiled expressions.
//!
//! Keys are BLAKE3 hashes of the expression text, so rules sharing the same
//! text share one compiled [`Expression`]. Entries expire after a sliding TTL;
//! expired entries are swept opportunistically during lookups once the sweep
//! interval has elapsed, or on demand with [`ExpressionCache::purge_expired`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use blake3::Hasher;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::parse::ParseError;
use crate::{Expression, Functions};

/// Default lifetime of an unused entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default interval between opportunistic sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// BLAKE3 hash of an expression's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_hash: [u8; 32],
}

impl CacheKey {
    #[must_use]
    pub fn for_expression(source: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(source.as_bytes());
        CacheKey {
            content_hash: *hasher.finalize().as_bytes(),
        }
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.content_hash
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

#[derive(Debug)]
struct CacheEntry {
    expression: Arc<Expression>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(expression: Arc<Expression>) -> Self {
        Self {
            expression,
            last_accessed: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) >= ttl
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful parses. Failed parses are counted as misses only.
    pub compiles: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses ({:.1}% hit rate), {} compiles, {} evictions",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.compiles,
            self.evictions
        )
    }
}

/// Concurrent compiled-expression cache owned by one engine.
pub struct ExpressionCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    evictions: AtomicU64,
}

impl ExpressionCache {
    #[must_use]
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the compiled form of `source`, parsing it against `functions`
    /// on a miss. Parse failures are returned and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when `source` does not compile.
    pub fn get_or_compile(
        &self,
        source: &str,
        functions: &Functions,
    ) -> Result<Arc<Expression>, ParseError> {
        self.maybe_sweep();
        let key = CacheKey::for_expression(source);
        if let Some(expression) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(expression);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let expression = Arc::new(Expression::compile(source, functions)?);
        self.compiles.fetch_add(1, Ordering::Relaxed);
        // Concurrent compiles of the same text: last writer wins.
        self.entries
            .insert(key, CacheEntry::new(Arc::clone(&expression)));
        Ok(expression)
    }

    /// Look up a previously compiled expression without compiling.
    #[must_use]
    pub fn get(&self, source: &str) -> Option<Arc<Expression>> {
        self.lookup(&CacheKey::for_expression(source))
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<Expression>> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(key)?;
            if !entry.is_expired(self.ttl, now) {
                entry.last_accessed = now;
                return Some(Arc::clone(&entry.expression));
            }
        }
        // The shard guard is released above; removing while holding it deadlocks.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(self.ttl, now))
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    fn maybe_sweep(&self) {
        let due = {
            let mut last = self.last_sweep.lock();
            if last.elapsed() >= self.sweep_interval {
                *last = Instant::now();
                true
            } else {
                false
            }
        };
        if due {
            self.purge_expired();
        }
    }

    /// Remove every expired entry, returning how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(self.ttl, now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        *self.last_sweep.lock() = now;
        debug!(evicted, remaining = self.entries.len(), "expression cache swept");
        evicted
    }

    /// Drop every entry. Counters are kept.
    pub fn flush(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        debug!(dropped, "expression cache flushed");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_SWEEP_INTERVAL)
    }
}

impl fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("ttl", &self.ttl)
            .field("sweep_interval", &self.sweep_interval)
            .field("stats", &self.stats())
            .finish()
    }
}

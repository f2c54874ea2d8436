//! Per-invocation scratch state: working memory, fired-rule markers and the
//! worker threads that evaluate jobs against them.
//!
//! A session is built once by the pool and reused. Its epoch counter
//! separates invocations and aborted rounds: workers skip jobs stamped with
//! an old epoch and the collector discards results carrying one.
//!
//! Workers evaluate against an `Arc` snapshot of working memory taken when the
//! job starts, so the dispatcher can write without waiting on a slow job.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::agenda;
use crate::config::ZeroInputPolicy;
use crate::error::EngineError;
use crate::pool::Recycle;
use crate::{EvalError, Expression, Facts, RuleSet, Value};

/// One rule firing handed to a worker.
pub(crate) struct Job {
    pub(crate) rule: usize,
    pub(crate) output: String,
    pub(crate) expression: Arc<Expression>,
    pub(crate) epoch: u64,
}

/// A worker's answer to a [`Job`].
#[derive(Debug)]
pub(crate) struct EvalResult {
    pub(crate) rule: usize,
    pub(crate) output: String,
    pub(crate) epoch: u64,
    pub(crate) outcome: Result<Value, EvalError>,
}

/// What a round's barrier wait produced.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub(crate) results: Vec<EvalResult>,
    pub(crate) timed_out: bool,
    pub(crate) disconnected: bool,
}

pub(crate) struct Session {
    facts: Arc<RwLock<Arc<Facts>>>,
    fired: Mutex<HashSet<usize>>,
    jobs: Mutex<Option<Sender<Job>>>,
    results: Mutex<Receiver<EvalResult>>,
    epoch: Arc<AtomicU64>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    retired: AtomicBool,
}

impl Session {
    /// Build a session and spawn `workers` evaluator threads.
    pub(crate) fn new(workers: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<EvalResult>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let facts = Arc::new(RwLock::new(Arc::new(Facts::new())));
        let epoch = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers.max(1) {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let facts = Arc::clone(&facts);
            let epoch = Arc::clone(&epoch);
            let spawned = thread::Builder::new()
                .name(format!("chainfire-worker-{id}"))
                .spawn(move || worker_loop(id, &jobs, &results, &facts, &epoch));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!(worker = id, error = %err, "failed to spawn worker"),
            }
        }

        Self {
            facts,
            fired: Mutex::new(HashSet::new()),
            jobs: Mutex::new(Some(job_tx)),
            results: Mutex::new(result_rx),
            epoch,
            workers: Mutex::new(handles),
            retired: AtomicBool::new(false),
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Value of a fact in working memory.
    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.facts.read().get(name).cloned()
    }

    pub(crate) fn fact_count(&self) -> usize {
        self.facts.read().len()
    }

    pub(crate) fn fired_count(&self) -> usize {
        self.fired.lock().len()
    }

    #[cfg(test)]
    fn is_fired(&self, rule: usize) -> bool {
        self.fired.lock().contains(&rule)
    }

    /// Copy the initial facts in and compute the first agenda.
    pub(crate) fn seed(
        &self,
        initial: &Facts,
        rules: &RuleSet,
        policy: ZeroInputPolicy,
    ) -> Vec<usize> {
        let mut facts = self.facts.write();
        let facts = Arc::make_mut(&mut facts);
        facts.extend_from(initial);
        let mut fired = self.fired.lock();
        agenda::seed(rules, facts, &mut fired, policy)
    }

    /// Write a result into working memory. Only the dispatcher calls this,
    /// between rounds.
    pub(crate) fn merge(&self, output: &str, value: Value) {
        Arc::make_mut(&mut self.facts.write()).insert(output, value);
    }

    /// Dependents of `fact` that became ready, appended to `ready`.
    pub(crate) fn schedule(&self, rules: &RuleSet, fact: &str, ready: &mut Vec<usize>) {
        let facts = self.facts.read();
        let mut fired = self.fired.lock();
        agenda::schedule_dependents(rules, fact, &facts, &mut fired, ready);
    }

    /// Queue a job stamped with the current epoch.
    pub(crate) fn submit(
        &self,
        rule: usize,
        output: &str,
        expression: Arc<Expression>,
    ) -> Result<(), EngineError> {
        let job = Job {
            rule,
            output: output.to_owned(),
            expression,
            epoch: self.epoch(),
        };
        match self.jobs.lock().as_ref() {
            Some(sender) => sender.send(job).map_err(|_| EngineError::Disconnected),
            None => Err(EngineError::Disconnected),
        }
    }

    /// Barrier wait: block until `expected` current-epoch results arrive, the
    /// deadline passes, or every worker is gone.
    pub(crate) fn collect(&self, expected: usize, deadline: Option<Instant>) -> Collected {
        let receiver = self.results.lock();
        let epoch = self.epoch();
        let mut collected = Collected::default();

        while collected.results.len() < expected {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    receiver.recv_timeout(remaining)
                }
                None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(result) if result.epoch == epoch => collected.results.push(result),
                Ok(stale) => {
                    trace!(rule = stale.rule, epoch = stale.epoch, "discarded stale result");
                }
                Err(RecvTimeoutError::Timeout) => {
                    collected.timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    collected.disconnected = true;
                    break;
                }
            }
        }
        collected
    }

    /// Invalidate every queued job and in-flight result.
    pub(crate) fn abort(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Discard results already waiting in the result channel.
    pub(crate) fn drain(&self) -> usize {
        let receiver = self.results.lock();
        receiver.try_iter().count()
    }
}

impl Recycle for Session {
    fn recycle(&self) {
        self.abort();
        {
            let mut facts = self.facts.write();
            match Arc::get_mut(&mut facts) {
                Some(facts) => facts.clear(),
                None => *facts = Arc::new(Facts::new()),
            }
        }
        self.fired.lock().clear();
        let stray = self.drain();
        if stray > 0 {
            trace!(stray, "dropped stray results on recycle");
        }
    }

    /// A retired session may still have workers busy with jobs from an
    /// aborted round. They are left to finish on their own.
    fn retire(&self) {
        self.abort();
        self.retired.store(true, Ordering::Release);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing the job channel lets every idle worker fall out of its loop.
        self.jobs.get_mut().take();
        let handles: Vec<_> = self.workers.get_mut().drain(..).collect();
        if self.retired.load(Ordering::Acquire) {
            debug!(workers = handles.len(), "detached workers of retired session");
            return;
        }
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workers", &self.worker_count())
            .field("epoch", &self.epoch())
            .field("facts", &self.fact_count())
            .field("fired", &self.fired_count())
            .finish()
    }
}

fn worker_loop(
    id: usize,
    jobs: &Mutex<Receiver<Job>>,
    results: &Sender<EvalResult>,
    facts: &RwLock<Arc<Facts>>,
    epoch: &AtomicU64,
) {
    loop {
        let job = jobs.lock().recv();
        let Ok(job) = job else {
            break;
        };
        if job.epoch != epoch.load(Ordering::Acquire) {
            trace!(worker = id, rule = job.rule, "skipped job from aborted epoch");
            continue;
        }

        let outcome = {
            let snapshot = Arc::clone(&facts.read());
            panic::catch_unwind(AssertUnwindSafe(|| job.expression.evaluate(&snapshot)))
                .unwrap_or_else(|payload| {
                    Err(EvalError::Panic {
                        message: panic_message(payload.as_ref()),
                    })
                })
        };
        trace!(worker = id, rule = job.rule, ok = outcome.is_ok(), "job evaluated");

        let result = EvalResult {
            rule: job.rule,
            output: job.output,
            epoch: job.epoch,
            outcome,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

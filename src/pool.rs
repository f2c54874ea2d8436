//! Reference-counted object pool.
//!
//! [`RefCountedPool::acquire`] hands out a [`Lease`] with a reference count
//! of one. Nested users call [`Lease::retain`] for an extra handle; every
//! handle is given back with [`Lease::release`]. When the count reaches zero
//! the object is recycled and parked for the next `acquire`.
//!
//! A lease can instead be [retired](Lease::retire): once its count reaches
//! zero the object is dropped rather than recycled, for objects left in a
//! state that cannot be reset cheaply.
//!
//! Misuse (releasing a handle twice, retaining an object that has already
//! been recycled) is reported as a [`PoolError`] rather than a panic.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

/// Objects that can be reset and reused by a [`RefCountedPool`].
pub trait Recycle: Send + Sync {
    /// Clear all per-use state. Called once the last lease is released.
    fn recycle(&self);

    /// Called instead of `recycle` when the last lease of a retired object
    /// goes away. The object is dropped afterwards.
    fn retire(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("lease released more than once")]
    AlreadyReleased,

    #[error("reference count decremented below zero")]
    Underflow,

    #[error("cannot retain an object whose reference count already reached zero")]
    Revive,
}

/// Counters describing pool activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects constructed by the factory.
    pub allocated: u64,
    /// Successful `acquire` calls.
    pub referenced: u64,
    /// Objects recycled back into the pool.
    pub returned: u64,
    /// Objects dropped instead of recycled.
    pub retired: u64,
    /// Objects currently parked and ready for reuse.
    pub idle: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated: {}, referenced: {}, returned: {}, retired: {}, idle: {}",
            self.allocated, self.referenced, self.returned, self.retired, self.idle
        )
    }
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct Shared<T> {
    idle: Mutex<Vec<Arc<Slot<T>>>>,
    factory: Factory<T>,
    allocated: AtomicU64,
    referenced: AtomicU64,
    returned: AtomicU64,
    retired: AtomicU64,
}

struct Slot<T> {
    value: T,
    count: AtomicU32,
    retired: AtomicBool,
}

/// A pool of reusable `T`s with explicit reference counting.
pub struct RefCountedPool<T: Recycle> {
    shared: Arc<Shared<T>>,
}

impl<T: Recycle + 'static> RefCountedPool<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::new()),
                factory: Box::new(factory),
                allocated: AtomicU64::new(0),
                referenced: AtomicU64::new(0),
                returned: AtomicU64::new(0),
                retired: AtomicU64::new(0),
            }),
        }
    }

    /// Take a parked object or build a new one. The returned lease holds the
    /// only reference.
    pub fn acquire(&self) -> Lease<T> {
        let parked = self.shared.idle.lock().pop();
        let slot = parked.unwrap_or_else(|| {
            self.shared.allocated.fetch_add(1, Ordering::Relaxed);
            Arc::new(Slot {
                value: (self.shared.factory)(),
                count: AtomicU32::new(0),
                retired: AtomicBool::new(false),
            })
        });
        slot.count.store(1, Ordering::Release);
        self.shared.referenced.fetch_add(1, Ordering::Relaxed);
        Lease {
            slot,
            pool: Arc::downgrade(&self.shared),
            released: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.shared.allocated.load(Ordering::Relaxed),
            referenced: self.shared.referenced.load(Ordering::Relaxed),
            returned: self.shared.returned.load(Ordering::Relaxed),
            retired: self.shared.retired.load(Ordering::Relaxed),
            idle: self.shared.idle.lock().len(),
        }
    }

    /// Drop every parked object.
    pub fn clear(&self) {
        self.shared.idle.lock().clear();
    }
}

impl<T: Recycle> fmt::Debug for RefCountedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCountedPool")
            .field("idle", &self.shared.idle.lock().len())
            .field("allocated", &self.shared.allocated.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// A counted handle to a pooled object.
///
/// Dropping a lease that was never released releases it.
pub struct Lease<T: Recycle> {
    slot: Arc<Slot<T>>,
    pool: Weak<Shared<T>>,
    released: AtomicBool,
}

impl<T: Recycle> Lease<T> {
    /// Take an additional reference. The new handle must be released too.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyReleased`] if this handle was released, or
    /// [`PoolError::Revive`] if the object's count already reached zero.
    pub fn retain(&self) -> Result<Lease<T>, PoolError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PoolError::AlreadyReleased);
        }
        let mut current = self.slot.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(PoolError::Revive);
            }
            match self.slot.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        Ok(Lease {
            slot: Arc::clone(&self.slot),
            pool: Weak::clone(&self.pool),
            released: AtomicBool::new(false),
        })
    }

    /// Give this handle's reference back. The last release recycles the
    /// object and parks it in the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyReleased`] on a second release of the same
    /// handle, or [`PoolError::Underflow`] if the count was already zero.
    pub fn release(&self) -> Result<(), PoolError> {
        self.give_back()
    }

    /// Release this handle and mark the object as unusable. When the last
    /// handle goes, the object is dropped instead of parked.
    ///
    /// # Errors
    ///
    /// Same as [`release`](Self::release).
    pub fn retire(&self) -> Result<(), PoolError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PoolError::AlreadyReleased);
        }
        self.slot.retired.store(true, Ordering::Release);
        self.give_back()
    }

    fn give_back(&self) -> Result<(), PoolError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(PoolError::AlreadyReleased);
        }
        let mut current = self.slot.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(PoolError::Underflow);
            }
            match self.slot.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if current != 1 {
            return Ok(());
        }
        if self.slot.retired.load(Ordering::Acquire) {
            self.slot.value.retire();
            if let Some(pool) = self.pool.upgrade() {
                pool.retired.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.slot.value.recycle();
            if let Some(pool) = self.pool.upgrade() {
                pool.returned.fetch_add(1, Ordering::Relaxed);
                pool.idle.lock().push(Arc::clone(&self.slot));
            }
        }
        Ok(())
    }

    /// Current reference count of the underlying object.
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.slot.count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl<T: Recycle> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.slot.value
    }
}

impl<T: Recycle> Drop for Lease<T> {
    fn drop(&mut self) {
        if !self.is_released() {
            if let Err(err) = self.release() {
                warn!(error = %err, "implicit lease release failed");
            }
        }
    }
}

impl<T: Recycle> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("ref_count", &self.ref_count())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

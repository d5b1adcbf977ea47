use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::AllocationError;

/// Supplies output memory to codecs.
///
/// Codecs only ever ask for buffers; they never hand memory back. What the
/// owner does with its bookkeeping is its own business.
pub trait BufferOwner: Send + Sync {
    /// Return a zeroed buffer of exactly `len` bytes.
    fn allocate(&self, len: usize) -> Result<Vec<u8>, AllocationError>;
}

/// Arena-style buffer owner with an optional byte budget.
///
/// Accounting is monotonic: bytes handed out count against the limit for the
/// pool's whole lifetime, like an arena that is only reclaimed when dropped.
/// Counters are atomic so one pool can back codecs on several threads.
#[derive(Debug, Default)]
pub struct MemPool {
    limit: Option<usize>,
    allocated: AtomicUsize,
    allocations: AtomicU64,
}

impl MemPool {
    /// A pool with no byte limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool that refuses to hand out more than `limit` bytes in total.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Total bytes handed out so far.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of successful `allocate` calls.
    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    fn reserve(&self, len: usize) -> Result<(), AllocationError> {
        let mut current = self.allocated.load(Ordering::Relaxed);
        loop {
            let next = current.checked_add(len).filter(|n| self.limit.map_or(true, |l| *n <= l));
            let Some(next) = next else {
                return Err(AllocationError {
                    requested: len,
                    allocated: current,
                    limit: self.limit,
                });
            };
            match self.allocated.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

impl BufferOwner for MemPool {
    fn allocate(&self, len: usize) -> Result<Vec<u8>, AllocationError> {
        self.reserve(len)?;
        let mut buf = Vec::new();
        if buf.try_reserve_exact(len).is_err() {
            self.allocated.fetch_sub(len, Ordering::Relaxed);
            return Err(AllocationError {
                requested: len,
                allocated: self.allocated_bytes(),
                limit: self.limit,
            });
        }
        buf.resize(len, 0);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(buf)
    }
}

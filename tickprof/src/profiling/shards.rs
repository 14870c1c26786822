//! Shard tokens bounding concurrent samplers
//!
//! Each shard pairs a try-lock with a scratch buffer of
//! [`MAX_STACK_FRAMES`] frames allocated up front. A sampler takes one shard
//! or gives up immediately; the controller takes all of them (`drain`) to
//! exclude samplers while it resets or reads the session tables.

#![allow(unsafe_code)] // scratch buffers are handed out under the token

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tickprof_common::{StackFrame, CONCURRENCY_LEVEL, MAX_STACK_FRAMES};

struct Shard {
    held: AtomicBool,
    scratch: UnsafeCell<Box<[StackFrame]>>,
}

impl Shard {
    fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            scratch: UnsafeCell::new(vec![StackFrame::default(); MAX_STACK_FRAMES].into_boxed_slice()),
        }
    }

    fn try_lock(&self) -> bool {
        self.held.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed).is_ok()
    }

    fn unlock(&self) {
        self.held.store(false, Ordering::Release);
    }
}

pub struct ShardSet {
    shards: Box<[Shard]>,
}

// SAFETY: a shard's scratch buffer is only reachable through a ShardGuard,
// which exists only while its token is held
unsafe impl Sync for ShardSet {}

impl Default for ShardSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardSet {
    #[must_use]
    pub fn new() -> Self {
        Self { shards: (0..CONCURRENCY_LEVEL).map(|_| Shard::new()).collect() }
    }

    /// Take shard `index % CONCURRENCY_LEVEL` if it is free; never waits
    #[must_use]
    pub fn try_acquire(&self, index: usize) -> Option<ShardGuard<'_>> {
        let shard = &self.shards[index % self.shards.len()];
        shard.try_lock().then(|| ShardGuard { shard })
    }

    /// Take every shard, waiting for in-flight samplers to finish
    ///
    /// Controller only. Samplers arriving meanwhile fail `try_acquire`.
    #[must_use]
    pub fn drain(&self) -> Drained<'_> {
        for shard in &*self.shards {
            while !shard.try_lock() {
                thread::yield_now();
            }
        }
        Drained { set: self }
    }
}

/// Exclusive use of one shard's scratch buffer
pub struct ShardGuard<'a> {
    shard: &'a Shard,
}

impl ShardGuard<'_> {
    pub fn scratch(&mut self) -> &mut [StackFrame] {
        // SAFETY: the token is held for the guard's lifetime and the borrow
        // is tied to &mut self
        unsafe { &mut *self.shard.scratch.get() }
    }
}

impl Drop for ShardGuard<'_> {
    fn drop(&mut self) {
        self.shard.unlock();
    }
}

/// Every shard held by the controller
pub struct Drained<'a> {
    set: &'a ShardSet,
}

impl Drop for Drained<'_> {
    fn drop(&mut self) {
        for shard in &*self.set.shards {
            shard.unlock();
        }
    }
}

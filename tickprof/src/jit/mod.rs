//! # JIT Range Index
//!
//! Tracks where the host VM has put generated code: compiled managed methods
//! and runtime stubs. The sampler uses it twice per interrupt:
//!
//! 1. Native unwinding stops at the first program counter inside the JIT
//!    bounds; from there the VM's own stack walker takes over.
//! 2. When the VM cannot walk an unfinished top frame, the leaf program
//!    counter is looked up here to name the frame by hand.
//!
//! ## Concurrency
//!
//! - The `[min, max)` bounds are atomics, read without any lock.
//! - The range maps sit behind an `RwLock`. Notifications from the VM take
//!   the write side. The sampler only ever calls `try_read`, so an interrupt
//!   that lands while this thread holds the write lock gives up on the lookup
//!   instead of deadlocking.

pub mod ranges;

use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use tickprof_common::StackFrame;

use crate::domain::MethodId;
use ranges::RangeMap;

#[derive(Default)]
struct JitRanges {
    methods: RangeMap<MethodId>,
    stubs: RangeMap<String>,
}

pub struct JitIndex {
    min_address: AtomicUsize,
    max_address: AtomicUsize,
    ranges: RwLock<JitRanges>,
}

impl Default for JitIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl JitIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_address: AtomicUsize::new(usize::MAX),
            max_address: AtomicUsize::new(0),
            ranges: RwLock::new(JitRanges::default()),
        }
    }

    /// A managed method was compiled to `address..address + length`
    pub fn on_code_generated(&self, address: usize, length: usize, method: MethodId) {
        let mut ranges = self.ranges.write().unwrap_or_else(PoisonError::into_inner);
        ranges.methods.insert(address, length, method);
        self.widen_bounds(address, address.saturating_add(length));
    }

    /// Compiled code for `method` at `address` was discarded
    ///
    /// The bounds are not narrowed; they only ever cover more address space.
    pub fn on_code_removed(&self, address: usize, method: MethodId) {
        let mut ranges = self.ranges.write().unwrap_or_else(PoisonError::into_inner);
        if ranges.methods.remove_if(address, |m| *m == method).is_none() {
            debug!("No compiled range for {method} at 0x{address:x}");
        }
    }

    /// The VM generated a runtime stub called `name`
    pub fn on_stub_generated(&self, address: usize, length: usize, name: &str) {
        let mut ranges = self.ranges.write().unwrap_or_else(PoisonError::into_inner);
        ranges.stubs.insert(address, length, name.to_string());
        self.widen_bounds(address, address.saturating_add(length));
    }

    // Called with the write lock held, so bounds have a single writer
    fn widen_bounds(&self, start: usize, end: usize) {
        if start < self.min_address.load(Ordering::Relaxed) {
            self.min_address.store(start, Ordering::Release);
        }
        if end > self.max_address.load(Ordering::Relaxed) {
            self.max_address.store(end, Ordering::Release);
        }
    }

    /// Lowest and highest generated-code addresses seen so far
    #[must_use]
    pub fn bounds(&self) -> (usize, usize) {
        (self.min_address.load(Ordering::Acquire), self.max_address.load(Ordering::Acquire))
    }

    /// True if `pc` is within the JIT bounds; lock-free
    #[must_use]
    pub fn contains(&self, pc: usize) -> bool {
        let (min, max) = self.bounds();
        pc >= min && pc < max
    }

    /// Compiled method enclosing `pc`
    #[must_use]
    pub fn find_method(&self, pc: usize) -> Option<MethodId> {
        let ranges = self.ranges.read().unwrap_or_else(PoisonError::into_inner);
        ranges.methods.find(pc).map(|(_, method)| *method)
    }

    /// Name of the stub starting exactly at `start`
    #[must_use]
    pub fn stub_name(&self, start: usize) -> Option<String> {
        let ranges = self.ranges.read().unwrap_or_else(PoisonError::into_inner);
        ranges.stubs.get(start).cloned()
    }

    /// Name the frame executing at `pc` from generated-code ranges alone
    ///
    /// Safe to call from interrupt context: it never blocks and returns
    /// `None` if a writer holds the lock.
    #[must_use]
    pub fn top_frame(&self, pc: usize) -> Option<StackFrame> {
        if !self.contains(pc) {
            return None;
        }
        let ranges = self.ranges.try_read().ok()?;
        if let Some((_, method)) = ranges.methods.find(pc) {
            return Some(StackFrame::java(method.0, 0));
        }
        ranges.stubs.find(pc).map(|(range, _)| StackFrame::stub(range.start))
    }
}

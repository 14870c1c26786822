//! Per-session aggregates and their generation discipline
//!
//! Samplers write through `&self` with lock-free protocols. The controller
//! replaces the frame arena and symbol table, and reads everything back,
//! only while holding every shard token.

#![allow(unsafe_code)] // arena and symbols are swapped under a full drain

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use tickprof_common::FailureKind;

use crate::aggregation::{CallTraceTable, FailureCounters, FrameArena, FrameBufferUsage, MethodTable, Snapshot};
use crate::host::{StackMemory, StackWalker};
use crate::jit::JitIndex;
use crate::profiling::{CallContext, Sampler, ShardSet};
use crate::symbolization::SymbolTable;

pub struct SessionTables {
    samples: AtomicU64,
    failures: FailureCounters,
    traces: CallTraceTable,
    methods: MethodTable,
    arena: UnsafeCell<FrameArena>,
    symbols: UnsafeCell<SymbolTable>,
    shards: ShardSet,
}

// SAFETY: `arena` and `symbols` are only replaced or mutably borrowed while
// `shards` is drained; samplers only touch them while holding a shard
unsafe impl Sync for SessionTables {}

impl SessionTables {
    #[must_use]
    pub fn new(table_capacity: usize) -> Self {
        Self {
            samples: AtomicU64::new(0),
            failures: FailureCounters::default(),
            traces: CallTraceTable::new(table_capacity),
            methods: MethodTable::new(table_capacity),
            arena: UnsafeCell::new(FrameArena::default()),
            symbols: UnsafeCell::new(SymbolTable::default()),
            shards: ShardSet::new(),
        }
    }

    /// Interrupts seen this session, including skipped and failed ones
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Acquire)
    }

    /// Capture one sample and fold it into the tables
    ///
    /// Interrupt context. Gives up with [`FailureKind::Skipped`] if the
    /// chosen shard is busy.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&self, context: &CallContext, walker: &dyn StackWalker, memory: &dyn StackMemory, jit: &JitIndex) {
        let index = self.samples.fetch_add(1, Ordering::AcqRel) as usize;
        let Some(mut shard) = self.shards.try_acquire(index) else {
            self.failures.record(FailureKind::Skipped);
            return;
        };

        // SAFETY: the shard token excludes a concurrent drain
        let (arena, symbols) = unsafe { (&*self.arena.get(), &*self.symbols.get()) };
        let sampler = Sampler { walker, memory, jit, symbols, failures: &self.failures };

        let frames = shard.scratch();
        let n = sampler.capture(context, frames);
        if n > 0 {
            self.traces.store(&frames[..n], arena);
            self.methods.store(frames[0]);
        }
    }

    /// Clear everything for a new session
    pub fn reset(&self, frame_buffer: usize, symbols: SymbolTable) {
        let _drained = self.shards.drain();
        self.samples.store(0, Ordering::Release);
        self.failures.reset();
        self.traces.clear();
        self.methods.clear();
        // SAFETY: all shards are held, so no sampler holds a reference
        unsafe {
            *self.arena.get() = FrameArena::new(frame_buffer);
            *self.symbols.get() = symbols;
        }
    }

    /// Run `f` over a quiescent copy of the aggregates
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot<'_>) -> R) -> R {
        let _drained = self.shards.drain();
        // SAFETY: all shards are held, so no sampler holds a reference
        let (arena, symbols) = unsafe { (&mut *self.arena.get(), &*self.symbols.get()) };

        let frame_buffer =
            FrameBufferUsage { used: arena.used(), capacity: arena.capacity(), overflowed: arena.overflowed() };
        let snapshot = Snapshot {
            samples: self.samples(),
            failures: self.failures.values(),
            frame_buffer,
            traces: self.traces.entries(),
            methods: self.methods.entries(),
            frames: arena.frames(),
            symbols,
        };
        f(&snapshot)
    }
}

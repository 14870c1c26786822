//! Host collaborators
//!
//! The profiler engine never talks to a VM, a timer or raw memory directly.
//! Each of those sits behind a trait here, bundled into a [`Host`] when the
//! `Profiler` is built:
//!
//! - [`StackWalker`]: managed frames for an interrupt context
//! - [`MethodResolver`]: class and method names for reports
//! - [`SymbolLoader`]: native symbol table, reloaded on every start
//! - [`InterruptSource`]: delivers the periodic sampling interrupt
//! - [`StackMemory`]: word reads for frame-pointer unwinding
//!
//! Everything called from interrupt context ([`StackWalker::walk`],
//! [`StackMemory::read_word`]) must not allocate, lock or log.

#![allow(unsafe_code)] // DirectMemory dereferences stack addresses

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use tickprof_common::{StackFrame, WalkError};

use crate::domain::{MethodId, MethodInfo, ProfilerError};
use crate::profiling::{CallContext, ItimerSource};
use crate::symbolization::{ProcMapsLoader, SymbolLoader};

/// Host VM stack-walk primitive
pub trait StackWalker: Send + Sync {
    /// Fill `frames` with managed frames, leaf first, and return how many
    /// were written. `frames.len()` is the depth budget.
    ///
    /// # Errors
    /// The VM's reason for producing no frames
    fn walk(&self, context: &CallContext, frames: &mut [StackFrame]) -> Result<usize, WalkError>;
}

/// Host VM method metadata, used only by reporters
pub trait MethodResolver: Send + Sync {
    /// # Errors
    /// The VM's raw error code, rendered as `[jvmtiError N]`
    fn describe(&self, method: MethodId) -> Result<MethodInfo, i32>;
}

/// Periodic interrupt delivery
pub trait InterruptSource: Send + Sync {
    /// Start delivering interrupts every `interval_ns`
    ///
    /// # Errors
    /// Returns an error if the platform refused to install the handler or timer
    fn arm(&self, interval_ns: i64) -> Result<(), ProfilerError>;

    /// Stop delivering interrupts; must be safe to call when not armed
    fn disarm(&self);
}

/// Word-sized reads of the interrupted thread's stack
pub trait StackMemory: Send + Sync {
    /// `None` if `address` cannot be read
    fn read_word(&self, address: usize) -> Option<usize>;
}

/// Walker and resolver for processes without a managed runtime
///
/// Every walk reports [`WalkError::NoJavaFrame`], so traces consist of
/// native frames only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVm;

impl StackWalker for NoVm {
    fn walk(&self, _context: &CallContext, _frames: &mut [StackFrame]) -> Result<usize, WalkError> {
        Err(WalkError::NoJavaFrame)
    }
}

impl MethodResolver for NoVm {
    fn describe(&self, _method: MethodId) -> Result<MethodInfo, i32> {
        Err(JVMTI_ERROR_INVALID_METHODID)
    }
}

const JVMTI_ERROR_INVALID_METHODID: i32 = 23;

/// Reads the current process's memory directly
///
/// Only word-aligned, non-null addresses are dereferenced. Callers bound
/// the addresses they ask for to the interrupted thread's stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMemory;

impl StackMemory for DirectMemory {
    fn read_word(&self, address: usize) -> Option<usize> {
        if address == 0 || address % std::mem::size_of::<usize>() != 0 {
            return None;
        }
        // SAFETY: the address is aligned and non-null; callers only pass
        // frame-pointer-derived addresses on the sampled thread's stack
        Some(unsafe { std::ptr::read_volatile(address as *const usize) })
    }
}

/// Interrupt source driven by the embedder
///
/// Arming only records the request; samples are delivered by calling
/// `Profiler::record_sample` directly. Clones share state, so a test can
/// keep one handle and give the other to the profiler.
#[derive(Debug, Default, Clone)]
pub struct ManualSource {
    state: Arc<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    armed: AtomicBool,
    interval_ns: AtomicI64,
    arm_calls: AtomicUsize,
    disarm_calls: AtomicUsize,
}

impl ManualSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::Acquire)
    }

    /// Interval passed to the most recent `arm`
    #[must_use]
    pub fn interval_ns(&self) -> i64 {
        self.state.interval_ns.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn arm_calls(&self) -> usize {
        self.state.arm_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn disarm_calls(&self) -> usize {
        self.state.disarm_calls.load(Ordering::Acquire)
    }
}

impl InterruptSource for ManualSource {
    fn arm(&self, interval_ns: i64) -> Result<(), ProfilerError> {
        self.state.interval_ns.store(interval_ns, Ordering::Release);
        self.state.arm_calls.fetch_add(1, Ordering::AcqRel);
        self.state.armed.store(true, Ordering::Release);
        Ok(())
    }

    fn disarm(&self) {
        self.state.disarm_calls.fetch_add(1, Ordering::AcqRel);
        self.state.armed.store(false, Ordering::Release);
    }
}

/// Everything the profiler needs from its environment
pub struct Host {
    pub walker: Box<dyn StackWalker>,
    pub methods: Box<dyn MethodResolver>,
    pub symbols: Box<dyn SymbolLoader>,
    pub source: Box<dyn InterruptSource>,
    pub memory: Box<dyn StackMemory>,
}

impl Host {
    /// Self-profiling setup: no managed runtime, symbols from
    /// `/proc/self/maps`, `SIGPROF` timer, direct stack reads
    #[must_use]
    pub fn native() -> Self {
        Self {
            walker: Box::new(NoVm),
            methods: Box::new(NoVm),
            symbols: Box::new(ProcMapsLoader::default()),
            source: Box::new(ItimerSource::new()),
            memory: Box::new(DirectMemory),
        }
    }

    #[must_use]
    pub fn with_walker(mut self, walker: impl StackWalker + 'static) -> Self {
        self.walker = Box::new(walker);
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl MethodResolver + 'static) -> Self {
        self.methods = Box::new(methods);
        self
    }

    #[must_use]
    pub fn with_symbols(mut self, symbols: impl SymbolLoader + 'static) -> Self {
        self.symbols = Box::new(symbols);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl InterruptSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    #[must_use]
    pub fn with_memory(mut self, memory: impl StackMemory + 'static) -> Self {
        self.memory = Box::new(memory);
        self
    }
}

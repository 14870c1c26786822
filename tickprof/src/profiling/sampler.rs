//! Stack capture for one interrupt
//!
//! Runs inside the signal handler. Writes only into the caller's scratch
//! buffer and the failure counters; no allocation, no blocking locks.
//!
//! ```text
//! [ native frames (leaf .. first JIT pc) | managed frames (host walker) ]
//!   ^ frames[0]
//! ```

use tickprof_common::{FailureKind, StackFrame, WalkError};

use crate::aggregation::FailureCounters;
use crate::host::{StackMemory, StackWalker};
use crate::jit::JitIndex;
use crate::symbolization::SymbolTable;

use super::context::CallContext;

/// Borrowed view of everything one capture needs
pub struct Sampler<'a> {
    pub walker: &'a dyn StackWalker,
    pub memory: &'a dyn StackMemory,
    pub jit: &'a JitIndex,
    pub symbols: &'a SymbolTable,
    pub failures: &'a FailureCounters,
}

impl Sampler<'_> {
    /// Capture the stack at `context` into `frames`, leaf first
    ///
    /// Returns the total frame count. A managed walk that fails is charged
    /// to exactly one failure counter; the native prefix, if any, is still
    /// returned.
    pub fn capture(&self, context: &CallContext, frames: &mut [StackFrame]) -> usize {
        let native = context.native_call_chain(self.memory, self.jit, self.symbols, frames);
        native + self.java_trace(context, &mut frames[native..])
    }

    fn java_trace(&self, context: &CallContext, frames: &mut [StackFrame]) -> usize {
        let error = match self.walker.walk(context, frames) {
            Ok(n) if n > 0 => return n.min(frames.len()),
            Ok(_) => WalkError::NoJavaFrame,
            Err(e) => e,
        };

        if error == WalkError::UnknownJava {
            if let Some(n) = self.repair_top_frame(context, frames) {
                return n;
            }
        }

        self.failures.record(FailureKind::from(error));
        0
    }

    /// Retry a walk that stumbled on an unfinished leaf frame
    ///
    /// The leaf is popped via the frame-pointer chain and named from the JIT
    /// index at its original pc; the walker then restarts from the caller.
    fn repair_top_frame(&self, context: &CallContext, frames: &mut [StackFrame]) -> Option<usize> {
        let caller = context.pop_frame(self.memory)?;

        let mut offset = 0;
        if let (Some(top), Some(slot)) = (self.jit.top_frame(context.pc), frames.first_mut()) {
            *slot = top;
            offset = 1;
        }

        match self.walker.walk(&caller, &mut frames[offset..]) {
            Ok(n) if n > 0 => Some((n + offset).min(frames.len())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MethodId;
    use crate::profiling::context::tests::FakeStack;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted walk results and remembers the contexts it saw
    struct ScriptedWalker {
        results: Mutex<Vec<Result<Vec<u64>, WalkError>>>,
        contexts: Mutex<Vec<CallContext>>,
        calls: AtomicUsize,
    }

    impl ScriptedWalker {
        fn new(mut results: Vec<Result<Vec<u64>, WalkError>>) -> Self {
            results.reverse();
            Self { results: Mutex::new(results), contexts: Mutex::new(Vec::new()), calls: AtomicUsize::new(0) }
        }
    }

    impl StackWalker for ScriptedWalker {
        fn walk(&self, context: &CallContext, frames: &mut [StackFrame]) -> Result<usize, WalkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(*context);
            let ids = self.results.lock().unwrap().pop().unwrap_or(Err(WalkError::UnknownState))?;
            for (slot, id) in frames.iter_mut().zip(&ids) {
                *slot = StackFrame::java(*id, 1);
            }
            Ok(ids.len().min(frames.len()))
        }
    }

    struct Fixture {
        jit: JitIndex,
        symbols: SymbolTable,
        failures: FailureCounters,
        stack: FakeStack,
    }

    impl Fixture {
        fn new() -> Self {
            let jit = JitIndex::new();
            jit.on_code_generated(0x50_000, 0x1000, MethodId(0xaaa));
            jit.on_code_generated(0x51_000, 0x1000, MethodId(0xbbb));
            Self {
                jit,
                symbols: SymbolTable::default(),
                failures: FailureCounters::default(),
                stack: FakeStack::default().frame(0x7000, 0x7100, 0x51_040),
            }
        }

        fn sampler<'a>(&'a self, walker: &'a dyn StackWalker) -> Sampler<'a> {
            Sampler {
                walker,
                memory: &self.stack,
                jit: &self.jit,
                symbols: &self.symbols,
                failures: &self.failures,
            }
        }
    }

    const IN_JIT: CallContext = CallContext::new(0x50_010, 0x6ff0, 0x7000);

    #[test]
    fn test_successful_walk() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Ok(vec![3, 2, 1])]);
        let mut frames = [StackFrame::default(); 16];

        let n = fixture.sampler(&walker).capture(&IN_JIT, &mut frames);
        assert_eq!(n, 3);
        assert_eq!(frames[0], StackFrame::java(3, 1));
        assert_eq!(fixture.failures.total(), 0);
    }

    #[test]
    fn test_repair_splices_leaf_from_jit() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Err(WalkError::UnknownJava), Ok(vec![0xbbb, 0xccc])]);
        let mut frames = [StackFrame::default(); 16];

        let n = fixture.sampler(&walker).capture(&IN_JIT, &mut frames);
        assert_eq!(n, 3);
        assert_eq!(frames[0], StackFrame::java(0xaaa, 0));
        assert_eq!(frames[1], StackFrame::java(0xbbb, 1));
        assert_eq!(frames[2], StackFrame::java(0xccc, 1));
        assert_eq!(fixture.failures.total(), 0);

        let contexts = walker.contexts.lock().unwrap();
        assert_eq!(contexts[1].pc, 0x51_040);
        assert_eq!(contexts[1].fp, 0x7100);
    }

    #[test]
    fn test_failed_repair_counts_original_error() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Err(WalkError::UnknownJava), Err(WalkError::GcActive)]);
        let mut frames = [StackFrame::default(); 16];

        assert_eq!(fixture.sampler(&walker).capture(&IN_JIT, &mut frames), 0);
        assert_eq!(fixture.failures.get(FailureKind::UnknownJava), 1);
        assert_eq!(fixture.failures.total(), 1);
    }

    #[test]
    fn test_unpoppable_frame_skips_retry() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Err(WalkError::UnknownJava)]);
        let mut frames = [StackFrame::default(); 16];
        let no_frame_pointer = CallContext::new(0x50_010, 0x6ff0, 0);

        assert_eq!(fixture.sampler(&walker).capture(&no_frame_pointer, &mut frames), 0);
        assert_eq!(walker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.failures.get(FailureKind::UnknownJava), 1);
    }

    #[test]
    fn test_other_errors_are_not_repaired() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Err(WalkError::Safepoint)]);
        let mut frames = [StackFrame::default(); 16];

        assert_eq!(fixture.sampler(&walker).capture(&IN_JIT, &mut frames), 0);
        assert_eq!(walker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.failures.get(FailureKind::Safepoint), 1);
    }

    #[test]
    fn test_empty_walk_counts_as_non_java() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Ok(vec![])]);
        let mut frames = [StackFrame::default(); 16];

        assert_eq!(fixture.sampler(&walker).capture(&IN_JIT, &mut frames), 0);
        assert_eq!(fixture.failures.get(FailureKind::NoJavaFrame), 1);
    }

    #[test]
    fn test_native_prefix_survives_walk_failure() {
        let fixture = Fixture::new();
        let walker = ScriptedWalker::new(vec![Err(WalkError::NoJavaFrame)]);
        let mut frames = [StackFrame::default(); 16];
        // Native leaf whose caller is JIT code
        let native = CallContext::new(0x30_000, 0x6ff0, 0x7000);

        assert_eq!(fixture.sampler(&walker).capture(&native, &mut frames), 1);
        assert_eq!(frames[0], StackFrame::unresolved(0x30_000));
        assert_eq!(fixture.failures.get(FailureKind::NoJavaFrame), 1);
    }
}

//! Fake host collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use tickprof::domain::{MethodId, MethodInfo};
use tickprof::host::{Host, ManualSource, MethodResolver, NoVm, StackMemory, StackWalker};
use tickprof::profiling::CallContext;
use tickprof::session::{Profiler, ProfilerConfig};
use tickprof::symbolization::{CodeCache, NativeSymbol, SymbolTable};
use tickprof_common::{StackFrame, WalkError};

pub const WORD: usize = std::mem::size_of::<usize>();

/// Walk results keyed by the context's program counter
#[derive(Default)]
pub struct FakeWalker {
    results: HashMap<usize, Result<Vec<u64>, WalkError>>,
}

impl FakeWalker {
    pub fn on(mut self, pc: usize, result: Result<Vec<u64>, WalkError>) -> Self {
        self.results.insert(pc, result);
        self
    }
}

impl StackWalker for FakeWalker {
    fn walk(&self, context: &CallContext, frames: &mut [StackFrame]) -> Result<usize, WalkError> {
        let ids = self.results.get(&context.pc).cloned().unwrap_or(Err(WalkError::NoJavaFrame))?;
        for (slot, &id) in frames.iter_mut().zip(&ids) {
            *slot = StackFrame::java(id, 0);
        }
        Ok(ids.len().min(frames.len()))
    }
}

/// Method names keyed by method id; unknown ids fail with error 23
#[derive(Default)]
pub struct FakeMethods(pub HashMap<u64, MethodInfo>);

impl FakeMethods {
    pub fn with(mut self, id: u64, class_signature: &str, name: &str) -> Self {
        self.0.insert(id, MethodInfo::new(class_signature, name));
        self
    }
}

impl MethodResolver for FakeMethods {
    fn describe(&self, method: MethodId) -> Result<MethodInfo, i32> {
        self.0.get(&method.0).cloned().ok_or(23)
    }
}

/// Sparse stack of frame records
#[derive(Default, Clone)]
pub struct FakeStack(pub HashMap<usize, usize>);

impl FakeStack {
    pub fn frame(mut self, fp: usize, caller_fp: usize, return_pc: usize) -> Self {
        self.0.insert(fp, caller_fp);
        self.0.insert(fp + WORD, return_pc);
        self
    }
}

impl StackMemory for FakeStack {
    fn read_word(&self, address: usize) -> Option<usize> {
        self.0.get(&address).copied()
    }
}

/// `libapp.so` at 0x10000 with `root`, `mid` and `leaf`, 0x100 bytes each
pub const ROOT: usize = 0x10_200;
pub const MID: usize = 0x10_100;
pub const LEAF: usize = 0x10_000;

pub fn app_symbols() -> SymbolTable {
    SymbolTable::new(vec![CodeCache::new(
        "libapp.so",
        0x10_000,
        0x20_000,
        vec![
            NativeSymbol::new(LEAF, 0x100, "leaf"),
            NativeSymbol::new(MID, 0x100, "mid"),
            NativeSymbol::new(ROOT, 0x100, "root"),
        ],
    )])
}

/// Native stack `root -> mid -> leaf`; returns the leaf context
pub fn native_stack() -> (FakeStack, CallContext) {
    let stack = FakeStack::default()
        .frame(0x7000, 0x7100, MID + 0x10)
        .frame(0x7100, 0x7200, ROOT + 0x10)
        .frame(0x7200, 0, 0);
    (stack, CallContext::new(LEAF + 0x10, 0x6ff0, 0x7000))
}

pub fn host(source: &ManualSource) -> Host {
    Host::native()
        .with_walker(NoVm)
        .with_methods(NoVm)
        .with_symbols(app_symbols())
        .with_source(source.clone())
        .with_memory(FakeStack::default())
}

pub fn profiler_with(host: Host, table_capacity: usize) -> Profiler {
    Profiler::new(ProfilerConfig { table_capacity, ..ProfilerConfig::default() }, host)
}

pub fn render(profiler: &Profiler, options: &tickprof::session::DumpOptions) -> String {
    let mut out = Vec::new();
    profiler.dump(&mut out, options).unwrap();
    String::from_utf8(out).unwrap()
}

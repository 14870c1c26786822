//! Register state of an interrupted thread and frame-pointer unwinding

use tickprof_common::{StackFrame, MAX_NATIVE_FRAMES};

use crate::host::StackMemory;
use crate::jit::JitIndex;
use crate::symbolization::SymbolTable;

const WORD: usize = std::mem::size_of::<usize>();

/// Anything below this is not a code address
const MIN_VALID_PC: usize = 0x1000;

/// Largest plausible distance between two adjacent frame pointers
const MAX_FRAME_SIZE: usize = 0x40000;

/// Program counter, stack pointer and frame pointer at interrupt time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    pub pc: usize,
    pub sp: usize,
    pub fp: usize,
}

impl CallContext {
    #[must_use]
    pub const fn new(pc: usize, sp: usize, fp: usize) -> Self {
        Self { pc, sp, fp }
    }

    /// Context of the caller of the current leaf frame
    ///
    /// Assumes the standard frame layout: `[fp]` holds the caller's frame
    /// pointer and `[fp + word]` the return address. Nothing is read unless
    /// `fp` lies within one frame above `sp`.
    #[must_use]
    pub fn pop_frame(&self, memory: &dyn StackMemory) -> Option<CallContext> {
        if self.fp == 0 || self.fp % WORD != 0 {
            return None;
        }
        if self.fp < self.sp || self.fp >= self.sp.saturating_add(MAX_FRAME_SIZE) {
            return None;
        }
        let pc = memory.read_word(self.fp + WORD)?;
        if pc < MIN_VALID_PC {
            return None;
        }
        let fp = memory.read_word(self.fp)?;
        Some(CallContext { pc, sp: self.fp + 2 * WORD, fp })
    }

    /// Native frames from the leaf up to the first JIT-compiled frame
    ///
    /// Each program counter becomes a [`StackFrame::native`] keyed by the
    /// enclosing symbol's start address, or [`StackFrame::unresolved`] when no
    /// symbol covers it. Returns the number of frames written to `out`.
    pub fn native_call_chain(
        &self,
        memory: &dyn StackMemory,
        jit: &JitIndex,
        symbols: &SymbolTable,
        out: &mut [StackFrame],
    ) -> usize {
        let max_depth = out.len().min(MAX_NATIVE_FRAMES);
        let mut pc = self.pc;
        let mut fp = self.fp;
        let mut prev_fp = self.sp.saturating_sub(1);
        let mut depth = 0;

        while depth < max_depth && pc >= MIN_VALID_PC && !jit.contains(pc) {
            out[depth] = symbols.lookup(pc).map_or(StackFrame::unresolved(pc), StackFrame::native);
            depth += 1;

            // The caller's frame must sit above ours on the same stack
            if fp <= prev_fp || fp >= prev_fp.saturating_add(MAX_FRAME_SIZE) {
                break;
            }
            let (Some(next_pc), Some(next_fp)) = (memory.read_word(fp + WORD), memory.read_word(fp))
            else {
                break;
            };
            prev_fp = fp;
            pc = next_pc;
            fp = next_fp;
        }

        depth
    }

    /// Registers saved by the kernel for a signal delivered to this thread
    ///
    /// # Safety
    /// `ucontext` must be the third argument of an `SA_SIGINFO` handler.
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[allow(unsafe_code, clippy::cast_sign_loss)]
    #[must_use]
    pub unsafe fn from_ucontext(ucontext: *const libc::c_void) -> Self {
        let uc = &*ucontext.cast::<libc::ucontext_t>();
        let gregs = &uc.uc_mcontext.gregs;
        Self {
            pc: gregs[libc::REG_RIP as usize] as usize,
            sp: gregs[libc::REG_RSP as usize] as usize,
            fp: gregs[libc::REG_RBP as usize] as usize,
        }
    }

    /// Registers saved by the kernel for a signal delivered to this thread
    ///
    /// # Safety
    /// `ucontext` must be the third argument of an `SA_SIGINFO` handler.
    #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
    #[allow(unsafe_code, clippy::cast_possible_truncation)]
    #[must_use]
    pub unsafe fn from_ucontext(ucontext: *const libc::c_void) -> Self {
        let uc = &*ucontext.cast::<libc::ucontext_t>();
        let mc = &uc.uc_mcontext;
        Self { pc: mc.pc as usize, sp: mc.sp as usize, fp: mc.regs[29] as usize }
    }
}

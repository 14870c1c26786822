//! # Shared Data Structures (interrupt context ↔ host bindings)
//!
//! Defines the plain data types and constants shared between the sampling
//! path, which runs inside a signal handler, and the host-VM bindings that
//! feed it frames. All types are `#[repr(C)]` and `Copy` so they can be
//! written into pre-allocated buffers without touching the allocator.
//!
//! ## Key Types
//!
//! - [`StackFrame`] - One captured frame (managed method + bci, or a native marker)
//! - [`WalkError`] - Reason codes returned by the host stack-walk primitive
//! - [`FailureKind`] - Classified reasons a sample produced no trace

#![no_std]

// ============================================================================
// Sizing Constants
// ============================================================================

/// Number of slots in the call-trace and method tables
///
/// Tables never grow during a session. Once every slot is claimed, new
/// distinct traces are dropped.
pub const MAX_CALLTRACES: usize = 65536;

/// Depth budget for one captured trace (native + managed frames)
pub const MAX_STACK_FRAMES: usize = 2048;

/// Maximum number of leading native frames resolved before the managed walk
pub const MAX_NATIVE_FRAMES: usize = 128;

/// Number of shard tokens bounding concurrent in-flight samples
///
/// Each shard owns a private scratch buffer of [`MAX_STACK_FRAMES`] frames.
pub const CONCURRENCY_LEVEL: usize = 16;

/// Default sampling interval (10 ms)
pub const DEFAULT_INTERVAL_NS: i64 = 10_000_000;

/// Default frame arena capacity, in frames
pub const DEFAULT_FRAME_BUFFER: usize = 1_000_000;

// ============================================================================
// Frame Kinds
// ============================================================================

/// `bci` marker: `method_id` is the start address of a resolved native symbol
pub const BCI_NATIVE_FRAME: i32 = -10;

/// `bci` marker: `method_id` is a raw program counter with no symbol
pub const BCI_UNRESOLVED_ADDRESS: i32 = -11;

/// `bci` marker: `method_id` is the start address of a VM runtime stub
pub const BCI_RUNTIME_STUB: i32 = -12;

/// One entry of a captured trace
///
/// Managed frames carry the VM's method identity and a non-negative
/// byte-code index. Native frames use one of the `BCI_*` markers above and
/// store an address in `method_id`. A zero `method_id` is an unknown frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Byte-code index, or one of the `BCI_*` markers
    pub bci: i32,

    /// Method identity (managed) or address (native/stub)
    pub method_id: u64,
}

impl StackFrame {
    /// Managed frame at byte-code index `bci`
    #[must_use]
    pub const fn java(method_id: u64, bci: i32) -> Self {
        Self { bci, method_id }
    }

    /// Native frame resolved to the symbol starting at `symbol_start`
    #[must_use]
    pub const fn native(symbol_start: usize) -> Self {
        Self { bci: BCI_NATIVE_FRAME, method_id: symbol_start as u64 }
    }

    /// Native frame whose program counter matched no symbol
    #[must_use]
    pub const fn unresolved(pc: usize) -> Self {
        Self { bci: BCI_UNRESOLVED_ADDRESS, method_id: pc as u64 }
    }

    /// Frame inside a VM runtime stub starting at `stub_start`
    #[must_use]
    pub const fn stub(stub_start: usize) -> Self {
        Self { bci: BCI_RUNTIME_STUB, method_id: stub_start as u64 }
    }

    /// True for any frame that is not a managed method
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self.bci, BCI_NATIVE_FRAME | BCI_UNRESOLVED_ADDRESS | BCI_RUNTIME_STUB)
    }
}

// ============================================================================
// Failure Classification
// ============================================================================

/// Why a sample could not produce a managed trace
///
/// The discriminant is the index into the session's failure counters and
/// also the order in which the summary prints them.
#[repr(usize)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NoJavaFrame = 0,
    NotInitialized = 1,
    GcActive = 2,
    UnknownNative = 3,
    NotWalkableNative = 4,
    UnknownJava = 5,
    NotWalkableJava = 6,
    UnknownState = 7,
    ThreadExit = 8,
    Deopt = 9,
    Safepoint = 10,
    /// Every shard token was busy; the sample was not attempted
    Skipped = 11,
}

impl FailureKind {
    /// Number of failure counters
    pub const COUNT: usize = 12;

    /// All kinds, in counter order
    pub const ALL: [FailureKind; Self::COUNT] = [
        FailureKind::NoJavaFrame,
        FailureKind::NotInitialized,
        FailureKind::GcActive,
        FailureKind::UnknownNative,
        FailureKind::NotWalkableNative,
        FailureKind::UnknownJava,
        FailureKind::NotWalkableJava,
        FailureKind::UnknownState,
        FailureKind::ThreadExit,
        FailureKind::Deopt,
        FailureKind::Safepoint,
        FailureKind::Skipped,
    ];

    /// Counter index
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Label used by the summary report
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            FailureKind::NoJavaFrame => "Non-Java:",
            FailureKind::NotInitialized => "JVM not initialized:",
            FailureKind::GcActive => "GC active:",
            FailureKind::UnknownNative => "Unknown (native):",
            FailureKind::NotWalkableNative => "Not walkable (native):",
            FailureKind::UnknownJava => "Unknown (Java):",
            FailureKind::NotWalkableJava => "Not walkable (Java):",
            FailureKind::UnknownState => "Unknown state:",
            FailureKind::ThreadExit => "Thread exit:",
            FailureKind::Deopt => "Deopt:",
            FailureKind::Safepoint => "Safepoint:",
            FailureKind::Skipped => "Skipped:",
        }
    }
}

/// Error returned by the host stack-walk primitive
///
/// Mirrors the VM's `ticks_*` result codes. [`WalkError::UnknownJava`] means
/// the topmost managed frame was not fully constructed; the sampler answers
/// it with a single top-frame repair attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalkError {
    NoJavaFrame,
    NotInitialized,
    GcActive,
    UnknownNative,
    NotWalkableNative,
    UnknownJava,
    NotWalkableJava,
    UnknownState,
    ThreadExit,
    Deopt,
    Safepoint,
}

impl WalkError {
    /// Decode a raw VM result code (`0`, `-1`, ... `-10`)
    ///
    /// Codes outside the known set decode as [`WalkError::UnknownState`].
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => WalkError::NoJavaFrame,
            -1 => WalkError::NotInitialized,
            -2 => WalkError::GcActive,
            -3 => WalkError::UnknownNative,
            -4 => WalkError::NotWalkableNative,
            -5 => WalkError::UnknownJava,
            -6 => WalkError::NotWalkableJava,
            -8 => WalkError::ThreadExit,
            -9 => WalkError::Deopt,
            -10 => WalkError::Safepoint,
            _ => WalkError::UnknownState,
        }
    }

    /// Failure counter charged for this error
    #[must_use]
    pub const fn failure_kind(self) -> FailureKind {
        match self {
            WalkError::NoJavaFrame => FailureKind::NoJavaFrame,
            WalkError::NotInitialized => FailureKind::NotInitialized,
            WalkError::GcActive => FailureKind::GcActive,
            WalkError::UnknownNative => FailureKind::UnknownNative,
            WalkError::NotWalkableNative => FailureKind::NotWalkableNative,
            WalkError::UnknownJava => FailureKind::UnknownJava,
            WalkError::NotWalkableJava => FailureKind::NotWalkableJava,
            WalkError::UnknownState => FailureKind::UnknownState,
            WalkError::ThreadExit => FailureKind::ThreadExit,
            WalkError::Deopt => FailureKind::Deopt,
            WalkError::Safepoint => FailureKind::Safepoint,
        }
    }
}

impl From<WalkError> for FailureKind {
    fn from(err: WalkError) -> Self {
        err.failure_kind()
    }
}

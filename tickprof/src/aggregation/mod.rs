//! # Lock-free Sample Aggregation
//!
//! Fixed-capacity structures written from interrupt context by many threads
//! at once and read by the reporters once sampling is quiescent.
//!
//! - **`hash`**: Murmur-style mixes keying both tables
//! - **`probe`**: Open-addressed claim-or-find shared by both tables
//! - **`call_traces`**: Full-trace table, one slot per distinct trace hash
//! - **`methods`**: Top-of-stack method table
//! - **`arena`**: Append-only frame storage with a CAS bump cursor
//! - **`failures`**: Classified failure counters
//! - **`snapshot`**: Plain copy of everything above for the reporters
//!
//! ## Slot Protocol
//!
//! ```text
//! key == target  ──────────────────────────────► counter += 1
//! key == 0       ── CAS(0 → target) won  ──► init payload ──► counter += 1
//!                └─ CAS lost ──► re-read the same slot
//! other key      ──► next slot (wrapping); back at start ──► drop
//! ```
//!
//! Nothing in this module allocates after construction, blocks, or logs.

pub mod arena;
pub mod call_traces;
pub mod failures;
pub mod hash;
pub mod methods;
mod probe;
pub mod snapshot;

pub use arena::FrameArena;
pub use call_traces::CallTraceTable;
pub use failures::FailureCounters;
pub use methods::MethodTable;
pub use snapshot::{FrameBufferUsage, MethodEntry, Snapshot, TraceEntry};

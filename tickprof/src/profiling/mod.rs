//! Interrupt-context sampling
//!
//! Everything that runs inside the `SIGPROF` handler, plus the handler
//! itself:
//! - Register context and frame-pointer unwinding
//! - Shard tokens with pre-allocated scratch buffers
//! - Stack capture with top-frame repair
//! - Per-thread filter
//! - `ITIMER_PROF` interrupt source

pub mod context;
pub mod sampler;
pub mod shards;
pub mod signal;
pub mod thread_filter;

// Re-export common types
pub use context::CallContext;
pub use sampler::Sampler;
pub use shards::{Drained, ShardGuard, ShardSet};
pub use signal::ItimerSource;
pub use thread_filter::ThreadFilter;

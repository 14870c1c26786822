//! # Profiling Session
//!
//! One explicitly constructed [`Profiler`] owns everything a session writes:
//! counters, the call-trace and method tables, the frame arena and the
//! native symbol table. Tests build as many independent profilers as they
//! like; the signal-driven binary leaks one and registers it.
//!
//! ## Quiescence
//!
//! `stop` disarms the interrupt source, but a sampler that was already
//! running keeps going until it returns. Resets and report passes
//! therefore take every shard token first, which waits out in-flight
//! samplers and turns any that arrive meanwhile into `Skipped` failures.

pub mod config;
pub mod profiler;
pub mod tables;

pub use config::{Action, DumpOptions, ProfilerConfig};
pub use profiler::Profiler;
pub use tables::SessionTables;

//! # tickprof - In-process Sampling Profiler
//!
//! tickprof samples the call stacks of a running process from a periodic
//! CPU-time interrupt, aggregates them into fixed-size lock-free tables, and
//! renders flame-graph, top-N and summary reports once sampling stops. Stacks
//! are mixed: native frames are unwound with frame pointers, managed frames
//! come from the host VM's own stack walker.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Host process (optionally a VM)                 │
//! │   compilation events ──► JitIndex      walk() ◄── StackWalker   │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ SIGPROF (ITIMER_PROF)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Sampler (interrupt context)                     │
//! │  shard token ──► native chain ──► managed walk ──► top-frame    │
//! │                                                     repair      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ lock-free inserts
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   CallTraceTable   MethodTable   FrameArena   FailureCounters   │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ stop + drain ──► Snapshot
//!                         ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Flamegraph  │   │   Top-N /    │   │     JSON     │
//! │  (collapsed) │   │   Summary    │   │    export    │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`aggregation`]: Lock-free tables, frame arena, failure counters, snapshots
//! - [`profiling`]: Interrupt-context capture, shard tokens, thread filter, `SIGPROF` driver
//! - [`session`]: IDLE/RUNNING controller, configuration, command dispatch
//! - [`jit`]: Generated-code ranges for compiled methods and runtime stubs
//! - [`symbolization`]: `/proc/self/maps` + ELF symbol tables for native frames
//! - [`analysis`]: Text reporters and frame naming
//! - [`export`]: JSON profile export
//! - [`host`]: Traits for the VM, interrupt source and stack memory
//! - [`domain`]: Core domain types and errors
//! - [`cli`]: Command-line argument parsing for the demo binary
//!
//! ## Typical Usage
//!
//! ```no_run
//! use tickprof::host::Host;
//! use tickprof::profiling::signal;
//! use tickprof::session::{DumpOptions, Profiler, ProfilerConfig};
//!
//! let profiler: &'static Profiler =
//!     Box::leak(Box::new(Profiler::new(ProfilerConfig::default(), Host::native())));
//! signal::register(profiler);
//! profiler.start(10_000_000, 1_000_000)?;
//! // ... run the workload ...
//! profiler.dump(&mut std::io::stdout(), &DumpOptions::standard())?;
//! # Ok::<(), tickprof::domain::ProfilerError>(())
//! ```

pub mod aggregation;
pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod host;
pub mod jit;
pub mod profiling;
pub mod session;
pub mod symbolization;

//! Text reports over a quiescent session snapshot
//!
//! This module contains the read-only report passes. None of them touch
//! the live tables; they run on a [`Snapshot`](crate::aggregation::Snapshot)
//! taken while every sampler is excluded.
//!
//! - **`flamegraph`**: collapsed stacks, root first, slashed class names
//! - **`summary`**: totals, failure breakdown, frame arena usage
//! - **`top`**: hottest traces (leaf first) and methods, dotted class names
//! - **`naming`**: frame → display name

pub mod flamegraph;
pub mod naming;
pub mod summary;
pub mod top;

pub use flamegraph::write_flamegraph;
pub use naming::{FrameNamer, NameStyle};
pub use summary::write_summary;
pub use top::{write_top_methods, write_top_traces};

//! Quiescent copy of one session's aggregates
//!
//! Built while every shard token is held, then handed to the reporters.
//! Counters and table entries are copied; frames and symbols are borrowed.

// Percentage calculations intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use std::ops::Range;

use tickprof_common::{FailureKind, StackFrame};

use crate::symbolization::SymbolTable;

/// One claimed call-trace slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub samples: u64,

    /// Location in the frame arena, leaf first; `None` if the arena was full
    pub frames: Option<Range<usize>>,
}

/// One claimed method slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEntry {
    pub samples: u64,
    pub frame: StackFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameBufferUsage {
    pub used: usize,
    pub capacity: usize,
    pub overflowed: bool,
}

impl FrameBufferUsage {
    /// Utilization in percent
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        100.0 * self.used as f64 / self.capacity as f64
    }
}

pub struct Snapshot<'a> {
    /// Every interrupt that reached the sampler, failures and skips included
    pub samples: u64,
    pub failures: [u64; FailureKind::COUNT],
    pub frame_buffer: FrameBufferUsage,
    pub traces: Vec<TraceEntry>,
    pub methods: Vec<MethodEntry>,
    pub frames: &'a [StackFrame],
    pub symbols: &'a SymbolTable,
}

impl<'a> Snapshot<'a> {
    /// Frames of `entry`, leaf first, if they were stored
    #[must_use]
    pub fn trace_frames(&self, entry: &TraceEntry) -> Option<&'a [StackFrame]> {
        let frames: &'a [StackFrame] = self.frames;
        entry.frames.clone().and_then(|range| frames.get(range))
    }

    /// `count` as a percentage of all samples
    #[must_use]
    pub fn percent(&self, count: u64) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        count as f64 * 100.0 / self.samples as f64
    }

    #[must_use]
    pub fn failure_count(&self, kind: FailureKind) -> u64 {
        self.failures[kind.index()]
    }

    /// Up to `max` traces, most sampled first
    #[must_use]
    pub fn top_traces(&self, max: usize) -> Vec<&TraceEntry> {
        let mut sorted: Vec<&TraceEntry> = self.traces.iter().collect();
        sorted.sort_by(|a, b| b.samples.cmp(&a.samples));
        sorted.truncate(max);
        sorted
    }

    /// Up to `max` methods, most sampled first
    #[must_use]
    pub fn top_methods(&self, max: usize) -> Vec<&MethodEntry> {
        let mut sorted: Vec<&MethodEntry> = self.methods.iter().collect();
        sorted.sort_by(|a, b| b.samples.cmp(&a.samples));
        sorted.truncate(max);
        sorted
    }
}

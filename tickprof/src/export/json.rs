//! Structured JSON profile
//!
//! The same data as the text reports, for tools that would rather not parse
//! them. Frame names use the dotted style.

// Percentage calculations intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use std::io::Write;

use tickprof_common::FailureKind;

use crate::aggregation::Snapshot;
use crate::analysis::{FrameNamer, NameStyle};
use crate::domain::ProfilerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub total_samples: u64,
    /// Every failure kind, in summary order
    pub failures: Vec<FailureCount>,
    pub frame_buffer: FrameBufferReport,
    pub traces: Vec<TraceReport>,
    pub methods: Vec<MethodReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCount {
    pub kind: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameBufferReport {
    pub used: usize,
    pub capacity: usize,
    pub overflowed: bool,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    pub samples: u64,
    pub percent: f64,
    /// Leaf first; empty if the frames were lost to arena overflow
    pub frames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReport {
    pub samples: u64,
    pub percent: f64,
    pub name: String,
}

/// JSON exporter for a session snapshot
pub struct JsonExporter {
    max_traces: usize,
    max_methods: usize,
}

impl JsonExporter {
    /// Keep at most `max_traces` traces and `max_methods` methods; 0 keeps all
    pub fn new(max_traces: usize, max_methods: usize) -> Self {
        Self { max_traces, max_methods }
    }

    fn limit(max: usize) -> usize {
        if max == 0 {
            usize::MAX
        } else {
            max
        }
    }

    #[must_use]
    pub fn build(&self, snapshot: &Snapshot<'_>, namer: &FrameNamer<'_>) -> ProfileSnapshot {
        let failures = FailureKind::ALL
            .iter()
            .map(|&kind| FailureCount {
                kind: kind.title().trim_end_matches(':').to_string(),
                count: snapshot.failure_count(kind),
            })
            .collect();

        let traces = snapshot
            .top_traces(Self::limit(self.max_traces))
            .into_iter()
            .map(|entry| TraceReport {
                samples: entry.samples,
                percent: snapshot.percent(entry.samples),
                frames: snapshot
                    .trace_frames(entry)
                    .unwrap_or_default()
                    .iter()
                    .map(|frame| namer.name(frame, NameStyle::Dotted))
                    .collect(),
            })
            .collect();

        let methods = snapshot
            .top_methods(Self::limit(self.max_methods))
            .into_iter()
            .map(|entry| MethodReport {
                samples: entry.samples,
                percent: snapshot.percent(entry.samples),
                name: namer.name(&entry.frame, NameStyle::Dotted),
            })
            .collect();

        ProfileSnapshot {
            total_samples: snapshot.samples,
            failures,
            frame_buffer: FrameBufferReport {
                used: snapshot.frame_buffer.used,
                capacity: snapshot.frame_buffer.capacity,
                overflowed: snapshot.frame_buffer.overflowed,
                usage_percent: snapshot.frame_buffer.percent(),
            },
            traces,
            methods,
        }
    }

    /// Export the snapshot as pretty-printed JSON
    ///
    /// This method accepts any type implementing `Write`, so the profile can
    /// go to a file, a socket or an in-memory buffer.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails
    pub fn export<W: Write>(&self, mut writer: W, snapshot: &Snapshot<'_>, namer: &FrameNamer<'_>) -> Result<(), ProfilerError> {
        serde_json::to_writer_pretty(&mut writer, &self.build(snapshot, namer))?;
        writeln!(writer)?;
        Ok(())
    }
}

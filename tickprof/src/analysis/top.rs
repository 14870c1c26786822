//! Hottest traces and methods

use std::io::{self, Write};

use crate::aggregation::Snapshot;

use super::naming::{FrameNamer, NameStyle};

/// Up to `max` traces by descending sample count, each leaf first
///
/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_top_traces(
    out: &mut dyn Write,
    snapshot: &Snapshot<'_>,
    namer: &FrameNamer<'_>,
    max: usize,
) -> io::Result<()> {
    for entry in snapshot.top_traces(max) {
        writeln!(out, "Samples: {} ({:.2}%)", entry.samples, snapshot.percent(entry.samples))?;
        for (i, frame) in snapshot.trace_frames(entry).unwrap_or_default().iter().enumerate() {
            writeln!(out, "  [{i:2}] {}", namer.name(frame, NameStyle::Dotted))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Up to `max` top-of-stack methods by descending sample count
///
/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_top_methods(
    out: &mut dyn Write,
    snapshot: &Snapshot<'_>,
    namer: &FrameNamer<'_>,
    max: usize,
) -> io::Result<()> {
    for entry in snapshot.top_methods(max) {
        writeln!(
            out,
            "{:>10} ({:.2}%) {}",
            entry.samples,
            snapshot.percent(entry.samples),
            namer.name(&entry.frame, NameStyle::Dotted)
        )?;
    }
    Ok(())
}

//! Collapsed-stack output for flame graph tools
//!
//! One line per distinct trace, root first:
//!
//! ```text
//! java/lang/Thread.run;com/example/Worker.loop;write 42
//! ```

use std::io::{self, Write};

use crate::aggregation::Snapshot;

use super::naming::{FrameNamer, NameStyle};

/// Write every trace with stored frames in collapsed-stack form
///
/// Traces whose frames were lost to arena overflow are skipped.
///
/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_flamegraph(out: &mut dyn Write, snapshot: &Snapshot<'_>, namer: &FrameNamer<'_>) -> io::Result<()> {
    let mut line = String::new();
    for entry in &snapshot.traces {
        let Some(frames) = snapshot.trace_frames(entry) else {
            continue;
        };

        line.clear();
        for (i, frame) in frames.iter().rev().enumerate() {
            if i > 0 {
                line.push(';');
            }
            line.push_str(&namer.name(frame, NameStyle::Slashed));
        }
        writeln!(out, "{line} {}", entry.samples)?;
    }
    Ok(())
}

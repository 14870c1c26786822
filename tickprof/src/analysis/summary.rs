//! Execution profile summary: totals, failure breakdown, arena usage

use std::io::{self, Write};

use tickprof_common::FailureKind;

use crate::aggregation::Snapshot;

/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_summary(out: &mut dyn Write, snapshot: &Snapshot<'_>) -> io::Result<()> {
    writeln!(out, "--- Execution profile ---")?;
    writeln!(out, "{:<22} {}", "Total:", snapshot.samples)?;

    for kind in FailureKind::ALL {
        let count = snapshot.failure_count(kind);
        if count > 0 {
            writeln!(out, "{:<22} {} ({:.2}%)", kind.title(), count, snapshot.percent(count))?;
        }
    }
    writeln!(out)?;

    if snapshot.frame_buffer.overflowed {
        writeln!(out, "Frame buffer overflowed! Consider increasing its size.")?;
    } else {
        writeln!(out, "{:<22} {:.2}%", "Frame buffer usage:", snapshot.frame_buffer.percent())?;
    }
    writeln!(out)
}

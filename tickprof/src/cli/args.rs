//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use tickprof_common::{DEFAULT_FRAME_BUFFER, DEFAULT_INTERVAL_NS};

use crate::session::DumpOptions;

#[derive(Parser, Debug)]
#[command(
    name = "tickprof",
    about = "Sample this process's own CPU stacks and print a profile",
    after_help = "\
EXAMPLES:
    tickprof --duration 5 --summary --methods 20     Five seconds, summary and hot methods
    tickprof --flamegraph --file out.collapsed       Collapsed stacks for flamegraph.pl
    tickprof --threads 8 --interval 1000000 --json   Eight busy threads, 1 ms sampling"
)]
pub struct Args {
    /// Sampling interval in nanoseconds of CPU time
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_NS)]
    pub interval: i64,

    /// Frame buffer capacity in frames
    #[arg(long, default_value_t = DEFAULT_FRAME_BUFFER)]
    pub framebuf: usize,

    /// Stop after N seconds (0 = until Ctrl+C)
    #[arg(short, long, default_value = "3")]
    pub duration: u64,

    /// Number of busy worker threads to profile
    #[arg(short, long, default_value = "4")]
    pub threads: usize,

    /// Dump collapsed stacks
    #[arg(long)]
    pub flamegraph: bool,

    /// Dump the execution summary
    #[arg(long)]
    pub summary: bool,

    /// Dump the N hottest traces
    #[arg(long, value_name = "N", default_value = "0")]
    pub traces: usize,

    /// Dump the N hottest methods
    #[arg(long, value_name = "N", default_value = "0")]
    pub methods: usize,

    /// Dump a JSON profile
    #[arg(long)]
    pub json: bool,

    /// Write the dump to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Reports to dump; summary plus top 10 traces and methods if none chosen
    #[must_use]
    pub fn dump_options(&self) -> DumpOptions {
        let options = DumpOptions {
            flamegraph: self.flamegraph,
            summary: self.summary,
            traces: self.traces,
            methods: self.methods,
            json: self.json,
        };
        if options.is_empty() {
            DumpOptions { summary: true, traces: 10, methods: 10, ..DumpOptions::default() }
        } else {
            options
        }
    }
}

//! # tickprof - Self-profiling demo
//!
//! Starts a few CPU-bound worker threads, samples the whole process with
//! `SIGPROF` for a while, then dumps the profile:
//!
//! ```text
//! start ──► workers spin ──► duration elapsed / Ctrl+C ──► stop ──► dump
//! ```
//!
//! There is no managed runtime here, so every trace is native and every
//! sample also counts as a `Non-Java` failure in the summary.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::hint::black_box;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickprof::cli::Args;
use tickprof::host::Host;
use tickprof::profiling::signal;
use tickprof::session::{Action, Profiler, ProfilerConfig};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[inline(never)]
fn hash_rounds(seed: u64, rounds: u32) -> u64 {
    let mut h = seed;
    for _ in 0..rounds {
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
    }
    h
}

#[inline(never)]
fn sort_batch(seed: u64, len: usize) -> u64 {
    let mut values: Vec<u64> = (0..len as u64).map(|i| hash_rounds(seed ^ i, 4)).collect();
    values.sort_unstable();
    values[len / 2]
}

#[inline(never)]
fn workload(worker: usize, stop: &AtomicBool) -> u64 {
    let mut acc = worker as u64;
    while !stop.load(Ordering::Relaxed) {
        acc = acc.wrapping_add(if acc % 2 == 0 { hash_rounds(acc, 50_000) } else { sort_batch(acc, 4096) });
    }
    black_box(acc)
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let config = ProfilerConfig { interval_ns: args.interval, frame_buffer: args.framebuf, ..ProfilerConfig::default() };
    // The signal handler needs a profiler that outlives every thread
    let profiler: &'static Profiler = Box::leak(Box::new(Profiler::new(config, Host::native())));
    signal::register(profiler);

    profiler.start(args.interval, args.framebuf).context("Failed to start profiling")?;
    if !quiet {
        eprintln!(
            "tickprof v{}: sampling {} threads every {} ns",
            env!("CARGO_PKG_VERSION"),
            args.threads,
            args.interval
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    let workers: Vec<_> = (0..args.threads)
        .map(|worker| {
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || workload(worker, &stop))
        })
        .collect();

    let limit = async {
        if args.duration > 0 {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    let exit_reason = tokio::select! {
        () = limit => "duration limit reached",
        _ = tokio::signal::ctrl_c() => "interrupted",
    };

    let elapsed = profiler.stop().context("Profiler stopped unexpectedly")?;
    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        worker.await.context("Worker thread panicked")?;
    }
    signal::unregister();
    info!("{exit_reason} after {:.1}s", elapsed.as_secs_f64());

    if !quiet {
        eprintln!("{exit_reason}: {:.1}s, {} samples", elapsed.as_secs_f64(), profiler.total_samples());
    }

    let mut stdout = io::stdout().lock();
    profiler
        .run(Action::Dump(args.dump_options()), args.file.as_deref(), &mut stdout)
        .context("Failed to write profile")?;

    if let Some(path) = args.file.as_deref() {
        if !quiet {
            println!("saved: {}", path.display());
        }
    }
    Ok(())
}

//! Session controller
//!
//! ```text
//!            start(interval, frames)
//!   ┌──────┐ ─────────────────────────► ┌─────────┐
//!   │ IDLE │                            │ RUNNING │
//!   └──────┘ ◄───────────────────────── └─────────┘
//!       ▲      stop() / dump()               │
//!       │                                    │ interrupts
//!   reports                           record_sample()
//! ```
//!
//! Transitions happen under one mutex. The sampler never takes it: it only
//! checks an atomic flag, then works on the session tables lock-free.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::analysis::{write_flamegraph, write_summary, write_top_methods, write_top_traces, FrameNamer};
use crate::domain::{ProfilerError, Tid};
use crate::export::JsonExporter;
use crate::host::Host;
use crate::jit::JitIndex;
use crate::profiling::{CallContext, ThreadFilter};
use crate::symbolization::SymbolTable;

use super::config::{Action, DumpOptions, ProfilerConfig};
use super::tables::SessionTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running { since: Instant },
}

pub struct Profiler {
    config: ProfilerConfig,
    host: Host,
    jit: JitIndex,
    thread_filter: ThreadFilter,
    tables: SessionTables,
    /// Gate checked by the sampler; mirrors `state` but lock-free
    running: AtomicBool,
    state: Mutex<State>,
}

impl Profiler {
    #[must_use]
    pub fn new(config: ProfilerConfig, host: Host) -> Self {
        Self {
            tables: SessionTables::new(config.table_capacity),
            config,
            host,
            jit: JitIndex::new(),
            thread_filter: ThreadFilter::new(),
            running: AtomicBool::new(false),
            state: Mutex::new(State::Idle),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Generated-code ranges; the host VM reports compilations here
    #[must_use]
    pub fn jit(&self) -> &JitIndex {
        &self.jit
    }

    #[must_use]
    pub fn thread_filter(&self) -> &ThreadFilter {
        &self.thread_filter
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset all session data and begin sampling every `interval_ns`
    ///
    /// # Errors
    /// - [`ProfilerError::InvalidInterval`] if `interval_ns` is not positive
    /// - [`ProfilerError::AlreadyRunning`] if a session is in progress
    /// - [`ProfilerError::InterruptSource`] if the interrupt source cannot be armed
    pub fn start(&self, interval_ns: i64, frame_buffer: usize) -> Result<(), ProfilerError> {
        if interval_ns <= 0 {
            return Err(ProfilerError::InvalidInterval(interval_ns));
        }

        let mut state = self.lock_state();
        if let State::Running { since } = *state {
            return Err(ProfilerError::AlreadyRunning(since.elapsed().as_secs()));
        }

        let symbols = self.host.symbols.load().unwrap_or_else(|e| {
            warn!("Native symbols unavailable, frames will show raw addresses: {e:#}");
            SymbolTable::default()
        });
        debug!("Loaded {} native symbols from {} libraries", symbols.symbol_count(), symbols.libraries().len());
        self.tables.reset(frame_buffer, symbols);

        self.running.store(true, Ordering::Release);
        if let Err(e) = self.host.source.arm(interval_ns) {
            self.running.store(false, Ordering::Release);
            return Err(e);
        }

        *state = State::Running { since: Instant::now() };
        info!("Profiling started: interval {interval_ns} ns, frame buffer {frame_buffer} frames");
        Ok(())
    }

    /// Stop sampling and return how long the session ran
    ///
    /// # Errors
    /// Returns [`ProfilerError::NotActive`] if no session is running; nothing
    /// is changed in that case.
    pub fn stop(&self) -> Result<Duration, ProfilerError> {
        let mut state = self.lock_state();
        self.stop_locked(&mut state)
    }

    fn stop_locked(&self, state: &mut State) -> Result<Duration, ProfilerError> {
        let State::Running { since } = *state else {
            return Err(ProfilerError::NotActive);
        };
        self.host.source.disarm();
        self.running.store(false, Ordering::Release);
        *state = State::Idle;

        let elapsed = since.elapsed();
        info!("Profiling stopped after {:.1}s, {} samples", elapsed.as_secs_f64(), self.total_samples());
        Ok(elapsed)
    }

    /// Time since `start`, if a session is running
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match *self.lock_state() {
            State::Running { since } => Some(since.elapsed()),
            State::Idle => None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.elapsed().is_some()
    }

    #[must_use]
    pub fn status(&self) -> String {
        match self.elapsed() {
            Some(elapsed) => format!("Profiler is running for {} seconds", elapsed.as_secs()),
            None => "Profiler is not active".to_string(),
        }
    }

    /// Interrupts seen since the last `start`, failed and skipped ones included
    #[must_use]
    pub fn total_samples(&self) -> u64 {
        self.tables.samples()
    }

    /// Sampler entry point, called from the interrupt handler
    ///
    /// Does nothing unless a session is running and the thread filter
    /// accepts `tid`. Never blocks or allocates.
    pub fn record_sample(&self, context: &CallContext, tid: Option<Tid>) {
        if !self.running.load(Ordering::Acquire) || !self.thread_filter.accept(tid) {
            return;
        }
        self.tables.record(context, self.host.walker.as_ref(), self.host.memory.as_ref(), &self.jit);
    }

    /// Stop sampling if needed, then write the selected reports
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails
    pub fn dump(&self, out: &mut dyn Write, options: &DumpOptions) -> Result<(), ProfilerError> {
        let mut state = self.lock_state();
        if self.stop_locked(&mut state).is_ok() {
            debug!("Dump stopped the running session");
        }
        self.write_reports(out, options)
    }

    /// Write the selected reports of a stopped session
    ///
    /// # Errors
    /// - [`ProfilerError::StillRunning`] if sampling is in progress
    /// - I/O or serialization errors from `out`
    pub fn report(&self, out: &mut dyn Write, options: &DumpOptions) -> Result<(), ProfilerError> {
        let state = self.lock_state();
        if *state != State::Idle {
            return Err(ProfilerError::StillRunning);
        }
        self.write_reports(out, options)
    }

    // Caller holds the state lock with the session idle
    fn write_reports(&self, out: &mut dyn Write, options: &DumpOptions) -> Result<(), ProfilerError> {
        self.tables.with_snapshot(|snapshot| {
            let namer = FrameNamer::new(self.host.methods.as_ref(), snapshot.symbols, &self.jit);
            debug!(
                "Dumping {} traces, {} methods from {} samples",
                snapshot.traces.len(),
                snapshot.methods.len(),
                snapshot.samples
            );

            if options.flamegraph {
                write_flamegraph(out, snapshot, &namer)?;
            }
            if options.summary {
                write_summary(out, snapshot)?;
            }
            if options.traces > 0 {
                write_top_traces(out, snapshot, &namer, options.traces)?;
            }
            if options.methods > 0 {
                write_top_methods(out, snapshot, &namer, options.methods)?;
            }
            if options.json {
                JsonExporter::new(options.traces, options.methods).export(&mut *out, snapshot, &namer)?;
            }
            out.flush()?;
            Ok(())
        })
    }

    /// Perform `action`, writing its textual response to `out`
    ///
    /// Refused starts and stops are answered in text, not as errors.
    ///
    /// # Errors
    /// Returns an error if writing fails or the interrupt source cannot be armed
    pub fn execute(&self, action: Action, out: &mut dyn Write) -> Result<(), ProfilerError> {
        match action {
            Action::Start { interval_ns, frame_buffer } => match self.start(interval_ns, frame_buffer) {
                Ok(()) => writeln!(out, "Profiling started with interval {interval_ns} ns")?,
                Err(e @ (ProfilerError::AlreadyRunning(_) | ProfilerError::InvalidInterval(_))) => {
                    writeln!(out, "{e}")?;
                }
                Err(e) => return Err(e),
            },
            Action::Stop => match self.stop() {
                Ok(elapsed) => writeln!(out, "Profiling stopped after {} seconds", elapsed.as_secs())?,
                Err(e) => writeln!(out, "{e}")?,
            },
            Action::Status => writeln!(out, "{}", self.status())?,
            Action::Dump(options) => self.dump(out, &options)?,
        }
        Ok(())
    }

    /// Like [`Profiler::execute`], but to `file` (truncated) when given
    ///
    /// # Errors
    /// [`ProfilerError::OutputOpen`] if `file` cannot be created, otherwise
    /// as [`Profiler::execute`]
    pub fn run(&self, action: Action, file: Option<&Path>, stdout: &mut dyn Write) -> Result<(), ProfilerError> {
        let Some(path) = file else {
            return self.execute(action, stdout);
        };
        let file = File::create(path)
            .map_err(|source| ProfilerError::OutputOpen { path: path.to_path_buf(), source })?;
        debug!("Writing output to {}", path.display());

        let mut writer = BufWriter::new(file);
        self.execute(action, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualSource;

    fn profiler(source: &ManualSource) -> Profiler {
        let host = Host::native().with_symbols(SymbolTable::default()).with_source(source.clone());
        Profiler::new(ProfilerConfig { table_capacity: 64, ..ProfilerConfig::default() }, host)
    }

    fn execute(profiler: &Profiler, action: Action) -> String {
        let mut out = Vec::new();
        profiler.execute(action, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_start_stop_cycle() {
        let source = ManualSource::new();
        let profiler = profiler(&source);

        profiler.start(1_000_000, 100).unwrap();
        assert!(source.is_armed());
        assert_eq!(source.interval_ns(), 1_000_000);
        assert!(profiler.is_running());

        profiler.stop().unwrap();
        assert!(!source.is_armed());
        assert!(!profiler.is_running());
    }

    #[test]
    fn test_rejected_starts_do_not_arm() {
        let source = ManualSource::new();
        let profiler = profiler(&source);

        assert!(matches!(profiler.start(0, 100), Err(ProfilerError::InvalidInterval(0))));
        assert!(matches!(profiler.start(-5, 100), Err(ProfilerError::InvalidInterval(-5))));
        assert_eq!(source.arm_calls(), 0);

        profiler.start(10, 100).unwrap();
        assert!(matches!(profiler.start(10, 100), Err(ProfilerError::AlreadyRunning(0))));
        assert_eq!(source.arm_calls(), 1);
    }

    #[test]
    fn test_stop_when_idle_is_not_active() {
        let source = ManualSource::new();
        let profiler = profiler(&source);

        assert!(matches!(profiler.stop(), Err(ProfilerError::NotActive)));
        assert_eq!(source.disarm_calls(), 0);
    }

    #[test]
    fn test_execute_messages() {
        let source = ManualSource::new();
        let profiler = profiler(&source);

        assert_eq!(execute(&profiler, Action::Status), "Profiler is not active\n");
        assert_eq!(execute(&profiler, Action::Stop), "Profiler is not active\n");
        assert_eq!(
            execute(&profiler, Action::Start { interval_ns: 5000, frame_buffer: 10 }),
            "Profiling started with interval 5000 ns\n"
        );
        assert_eq!(
            execute(&profiler, Action::Start { interval_ns: 5000, frame_buffer: 10 }),
            "Profiler is already running for 0 seconds\n"
        );
        assert_eq!(execute(&profiler, Action::Status), "Profiler is running for 0 seconds\n");
        assert_eq!(execute(&profiler, Action::Stop), "Profiling stopped after 0 seconds\n");
    }

    #[test]
    fn test_samples_ignored_while_idle() {
        let source = ManualSource::new();
        let profiler = profiler(&source);

        profiler.record_sample(&CallContext::default(), None);
        assert_eq!(profiler.total_samples(), 0);

        profiler.start(10, 100).unwrap();
        profiler.record_sample(&CallContext::default(), None);
        assert_eq!(profiler.total_samples(), 1);
    }

    #[test]
    fn test_report_refused_while_running() {
        let source = ManualSource::new();
        let profiler = profiler(&source);
        profiler.start(10, 100).unwrap();

        let mut out = Vec::new();
        assert!(matches!(profiler.report(&mut out, &DumpOptions::standard()), Err(ProfilerError::StillRunning)));

        profiler.dump(&mut out, &DumpOptions::standard()).unwrap();
        assert!(!profiler.is_running());
        assert!(String::from_utf8(out).unwrap().starts_with("--- Execution profile ---\n"));
    }

    #[test]
    fn test_filtered_thread_is_not_sampled() {
        let source = ManualSource::new();
        let profiler = profiler(&source);
        profiler.thread_filter().set_enabled(true);
        profiler.thread_filter().add(Tid(7));
        profiler.start(10, 100).unwrap();

        profiler.record_sample(&CallContext::default(), Some(Tid(8)));
        assert_eq!(profiler.total_samples(), 0);
        profiler.record_sample(&CallContext::default(), Some(Tid(7)));
        profiler.record_sample(&CallContext::default(), None);
        assert_eq!(profiler.total_samples(), 2);
    }
}

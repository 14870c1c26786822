//! Profiler and dump configuration

use tickprof_common::{DEFAULT_FRAME_BUFFER, DEFAULT_INTERVAL_NS, MAX_CALLTRACES};

/// Settings fixed for the lifetime of a `Profiler`, plus start defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Slots in each of the call-trace and method tables
    pub table_capacity: usize,

    /// Default sampling interval for [`Action::Start`]
    pub interval_ns: i64,

    /// Default frame arena capacity for [`Action::Start`]
    pub frame_buffer: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self { table_capacity: MAX_CALLTRACES, interval_ns: DEFAULT_INTERVAL_NS, frame_buffer: DEFAULT_FRAME_BUFFER }
    }
}

/// Which reports a dump writes, in this order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    pub flamegraph: bool,
    pub summary: bool,
    /// Top N traces; 0 disables
    pub traces: usize,
    /// Top N methods; 0 disables
    pub methods: usize,
    pub json: bool,
}

impl DumpOptions {
    /// Summary plus the 200 hottest traces and methods
    #[must_use]
    pub fn standard() -> Self {
        Self { summary: true, traces: 200, methods: 200, ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.flamegraph && !self.summary && self.traces == 0 && self.methods == 0 && !self.json
    }
}

/// A single command to the profiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start { interval_ns: i64, frame_buffer: usize },
    Stop,
    Status,
    Dump(DumpOptions),
}

impl Action {
    /// Start with the configured defaults
    #[must_use]
    pub fn start(config: &ProfilerConfig) -> Self {
        Action::Start { interval_ns: config.interval_ns, frame_buffer: config.frame_buffer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::default();
        assert_eq!(config.table_capacity, 65536);
        assert_eq!(Action::start(&config), Action::Start { interval_ns: 10_000_000, frame_buffer: 1_000_000 });
    }

    #[test]
    fn test_dump_options_empty() {
        assert!(DumpOptions::default().is_empty());
        assert!(!DumpOptions::standard().is_empty());
        assert!(!DumpOptions { json: true, ..DumpOptions::default() }.is_empty());
    }
}

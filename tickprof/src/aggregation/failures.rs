//! Classified failure counters

use std::sync::atomic::{AtomicU64, Ordering};

use tickprof_common::FailureKind;

#[derive(Default)]
pub struct FailureCounters {
    counts: [AtomicU64; FailureKind::COUNT],
}

impl FailureCounters {
    pub fn record(&self, kind: FailureKind) {
        self.counts[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self, kind: FailureKind) -> u64 {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    /// Sum over every kind
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    #[must_use]
    pub fn values(&self) -> [u64; FailureKind::COUNT] {
        std::array::from_fn(|i| self.counts[i].load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let failures = FailureCounters::default();
        failures.record(FailureKind::GcActive);
        failures.record(FailureKind::GcActive);
        failures.record(FailureKind::Skipped);

        assert_eq!(failures.get(FailureKind::GcActive), 2);
        assert_eq!(failures.total(), 3);
        assert_eq!(failures.values()[FailureKind::Skipped.index()], 1);

        failures.reset();
        assert_eq!(failures.total(), 0);
    }
}

//! Call-trace table: sample counts keyed by full-trace hash
//!
//! The first thread to claim a hash copies the trace into the frame arena
//! and records where it went. Everyone else only bumps the counter. If the
//! arena is full the slot is still claimed and counted, but has no frames.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tickprof_common::StackFrame;

use super::arena::FrameArena;
use super::hash::hash_call_trace;
use super::probe::{self, Slot};
use super::snapshot::TraceEntry;

#[derive(Default)]
struct TraceSlot {
    hash: AtomicU64,
    samples: AtomicU64,
    start_frame: AtomicUsize,
    /// Zero when the frames could not be stored
    num_frames: AtomicUsize,
}

impl Slot for TraceSlot {
    fn key(&self) -> &AtomicU64 {
        &self.hash
    }

    fn counter(&self) -> &AtomicU64 {
        &self.samples
    }
}

pub struct CallTraceTable {
    slots: Box<[TraceSlot]>,
}

impl CallTraceTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { slots: (0..capacity).map(|_| TraceSlot::default()).collect() }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Count one sample of `frames`, storing them on first sight
    ///
    /// Returns false if the trace was dropped because every slot is taken.
    pub fn store(&self, frames: &[StackFrame], arena: &FrameArena) -> bool {
        let hash = hash_call_trace(frames);
        probe::increment(&self.slots, hash, hash, |slot| {
            if let Some(range) = arena.store(frames) {
                slot.start_frame.store(range.start, Ordering::Release);
                slot.num_frames.store(range.len(), Ordering::Release);
            }
        })
    }

    /// Zero every slot
    pub fn clear(&self) {
        for slot in &*self.slots {
            slot.hash.store(0, Ordering::Relaxed);
            slot.samples.store(0, Ordering::Relaxed);
            slot.start_frame.store(0, Ordering::Relaxed);
            slot.num_frames.store(0, Ordering::Relaxed);
        }
    }

    /// Copy out every claimed slot with at least one sample, in table order
    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.slots
            .iter()
            .filter(|slot| slot.hash.load(Ordering::Acquire) != 0)
            .filter_map(|slot| {
                let samples = slot.samples.load(Ordering::Acquire);
                if samples == 0 {
                    return None;
                }
                let len = slot.num_frames.load(Ordering::Acquire);
                let frames = (len > 0).then(|| {
                    let start = slot.start_frame.load(Ordering::Acquire);
                    Range { start, end: start + len }
                });
                Some(TraceEntry { samples, frames })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(ids: &[u64]) -> Vec<StackFrame> {
        ids.iter().map(|&id| StackFrame::java(id, 0)).collect()
    }

    #[test]
    fn test_repeat_trace_shares_slot_and_frames() {
        let mut arena = FrameArena::new(64);
        let table = CallTraceTable::new(16);

        for _ in 0..3 {
            assert!(table.store(&trace(&[3, 2, 1]), &arena));
        }
        assert!(table.store(&trace(&[4, 1]), &arena));

        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        let hot = entries.iter().find(|e| e.samples == 3).unwrap();
        let range = hot.frames.clone().unwrap();
        let ids: Vec<u64> = arena.frames()[range].iter().map(|f| f.method_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(arena.used(), 5);
    }

    #[test]
    fn test_arena_overflow_keeps_counting() {
        let arena = FrameArena::new(2);
        let table = CallTraceTable::new(16);

        assert!(table.store(&trace(&[1, 2, 3]), &arena));
        assert!(table.store(&trace(&[1, 2, 3]), &arena));

        let entries = table.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].samples, 2);
        assert!(entries[0].frames.is_none());
        assert!(arena.overflowed());
    }

    #[test]
    fn test_full_table_drops_new_traces() {
        let arena = FrameArena::new(64);
        let table = CallTraceTable::new(2);

        assert!(table.store(&trace(&[1]), &arena));
        assert!(table.store(&trace(&[2]), &arena));
        assert!(!table.store(&trace(&[3]), &arena));
        assert!(table.store(&trace(&[1]), &arena));
        assert_eq!(table.entries().iter().map(|e| e.samples).sum::<u64>(), 3);
    }

    #[test]
    fn test_clear() {
        let arena = FrameArena::new(64);
        let table = CallTraceTable::new(8);
        table.store(&trace(&[1]), &arena);
        table.clear();
        assert!(table.entries().is_empty());
    }
}

//! Method table: sample counts for the top-of-stack frame alone

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use tickprof_common::StackFrame;

use crate::domain::MethodId;

use super::hash::hash_method;
use super::probe::{self, Slot};
use super::snapshot::MethodEntry;

#[derive(Default)]
struct MethodSlot {
    method_id: AtomicU64,
    samples: AtomicU64,
    /// Byte-code index (or native marker) of the first observation
    bci: AtomicI32,
}

impl Slot for MethodSlot {
    fn key(&self) -> &AtomicU64 {
        &self.method_id
    }

    fn counter(&self) -> &AtomicU64 {
        &self.samples
    }
}

pub struct MethodTable {
    slots: Box<[MethodSlot]>,
}

impl MethodTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { slots: (0..capacity).map(|_| MethodSlot::default()).collect() }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Count one sample whose leaf frame is `frame`
    ///
    /// Unknown frames (method id 0) collide with the empty-slot sentinel and
    /// are not counted. Returns false if the sample was not recorded.
    pub fn store(&self, frame: StackFrame) -> bool {
        if !MethodId(frame.method_id).is_valid() {
            return false;
        }
        probe::increment(&self.slots, hash_method(frame.method_id), frame.method_id, |slot| {
            slot.bci.store(frame.bci, Ordering::Release);
        })
    }

    /// Zero every slot
    pub fn clear(&self) {
        for slot in &*self.slots {
            slot.method_id.store(0, Ordering::Relaxed);
            slot.samples.store(0, Ordering::Relaxed);
            slot.bci.store(0, Ordering::Relaxed);
        }
    }

    /// Copy out every claimed slot with at least one sample, in table order
    #[must_use]
    pub fn entries(&self) -> Vec<MethodEntry> {
        self.slots
            .iter()
            .filter_map(|slot| {
                let method_id = slot.method_id.load(Ordering::Acquire);
                let samples = slot.samples.load(Ordering::Acquire);
                if method_id == 0 || samples == 0 {
                    return None;
                }
                let bci = slot.bci.load(Ordering::Acquire);
                Some(MethodEntry { samples, frame: StackFrame { bci, method_id } })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_bci_is_kept() {
        let table = MethodTable::new(16);
        assert!(table.store(StackFrame::java(42, 7)));
        assert!(table.store(StackFrame::java(42, 19)));

        let entries = table.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].samples, 2);
        assert_eq!(entries[0].frame, StackFrame::java(42, 7));
    }

    #[test]
    fn test_unknown_method_is_not_counted() {
        let table = MethodTable::new(16);
        assert!(!table.store(StackFrame::java(0, 0)));
        assert!(table.entries().is_empty());
    }

    #[test]
    fn test_native_frames_are_keyed_by_symbol() {
        let table = MethodTable::new(16);
        table.store(StackFrame::native(0x4000));
        table.store(StackFrame::native(0x4000));
        table.store(StackFrame::native(0x5000));

        let mut counts: Vec<u64> = table.entries().iter().map(|e| e.samples).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);
    }
}

//! Frame arena: one append-only buffer holding every stored trace's frames
//!
//! Writers reserve a contiguous range with a CAS loop on the cursor and then
//! own it outright, so frames are copied without further synchronization.
//! The arena is never compacted; the whole thing is replaced at session start.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tickprof_common::StackFrame;

pub struct FrameArena {
    slots: Box<[UnsafeCell<StackFrame>]>,
    cursor: AtomicUsize,
    overflow: AtomicBool,
}

// SAFETY: a slot is written only by the thread whose reservation covers it,
// and reads need `&mut self`.
#[allow(unsafe_code)]
unsafe impl Sync for FrameArena {}

impl FrameArena {
    /// Allocate an arena holding up to `capacity` frames
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| UnsafeCell::new(StackFrame::default())).collect();
        Self { slots, cursor: AtomicUsize::new(0), overflow: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Frames reserved so far
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// True once any reservation has been refused for lack of space
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    /// Reserve `len` frames, returning the range now owned by the caller
    ///
    /// A request that does not fit sets the overflow flag and leaves the
    /// cursor untouched.
    pub fn reserve(&self, len: usize) -> Option<Range<usize>> {
        let capacity = self.slots.len();
        let mut start = self.cursor.load(Ordering::Relaxed);

        loop {
            let end = match start.checked_add(len) {
                Some(end) if end <= capacity => end,
                _ => {
                    self.overflow.store(true, Ordering::Release);
                    return None;
                }
            };

            match self.cursor.compare_exchange_weak(start, end, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Some(start..end),
                Err(current) => start = current,
            }
        }
    }

    /// Reserve space for `frames` and copy them in
    pub fn store(&self, frames: &[StackFrame]) -> Option<Range<usize>> {
        let range = self.reserve(frames.len())?;
        for (slot, frame) in self.slots[range.clone()].iter().zip(frames) {
            // SAFETY: `range` was handed to this thread alone by `reserve`
            #[allow(unsafe_code)]
            unsafe {
                *slot.get() = *frame;
            }
        }
        Some(range)
    }

    /// All frames written so far
    ///
    /// Taking `&mut self` proves no writer is mid-copy.
    pub fn frames(&mut self) -> &[StackFrame] {
        let used = (*self.cursor.get_mut()).min(self.slots.len());
        let cells = &self.slots[..used];
        // SAFETY: UnsafeCell<T> has the layout of T and we hold exclusive access
        #[allow(unsafe_code)]
        unsafe {
            &*(std::ptr::from_ref::<[UnsafeCell<StackFrame>]>(cells) as *const [StackFrame])
        }
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java(ids: &[u64]) -> Vec<StackFrame> {
        ids.iter().map(|&id| StackFrame::java(id, 0)).collect()
    }

    #[test]
    fn test_store_and_read_back() {
        let mut arena = FrameArena::new(8);
        let a = arena.store(&java(&[1, 2, 3])).unwrap();
        let b = arena.store(&java(&[4, 5])).unwrap();
        assert_eq!(a, 0..3);
        assert_eq!(b, 3..5);
        assert_eq!(arena.used(), 5);

        let frames = arena.frames();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[3].method_id, 4);
    }

    #[test]
    fn test_overflow_leaves_cursor_alone() {
        let arena = FrameArena::new(4);
        assert!(arena.store(&java(&[1, 2, 3])).is_some());
        assert!(!arena.overflowed());

        assert!(arena.store(&java(&[4, 5])).is_none());
        assert!(arena.overflowed());
        assert_eq!(arena.used(), 3);

        // A smaller trace that still fits is accepted; the flag stays set
        assert_eq!(arena.store(&java(&[6])), Some(3..4));
        assert!(arena.overflowed());
        assert!(arena.reserve(1).is_none());
        assert_eq!(arena.used(), 4);
    }

    #[test]
    fn test_zero_capacity() {
        let mut arena = FrameArena::new(0);
        assert!(arena.store(&java(&[1])).is_none());
        assert!(arena.overflowed());
        assert!(arena.frames().is_empty());
    }

    #[test]
    fn test_concurrent_reservations_never_overlap() {
        let arena = FrameArena::new(10_000);
        let ranges: Vec<Range<usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let arena = &arena;
                    s.spawn(move || {
                        (0..500).filter_map(|i| arena.reserve(1 + (i + t) % 7)).collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let mut sorted = ranges.clone();
        sorted.sort_by_key(|r| r.start);
        for pair in sorted.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }

        let total: usize = ranges.iter().map(ExactSizeIterator::len).sum();
        assert!(total <= arena.capacity());
        assert_eq!(total, arena.used());
        assert!(arena.overflowed());
    }
}

//! Open-addressed claim-or-find over a fixed slot array

use std::sync::atomic::{AtomicU64, Ordering};

/// A table slot with a zero-sentinel key and a sample counter
pub(crate) trait Slot {
    fn key(&self) -> &AtomicU64;
    fn counter(&self) -> &AtomicU64;
}

/// Find the slot holding `key`, or claim an empty one for it
///
/// Probing starts at `hash % slots.len()` and moves forward by one, wrapping.
/// Only the thread whose CAS claims an empty slot runs `init`, and it does so
/// before returning, so its payload stores precede its own counter
/// increment. Returns `None` when a full lap finds neither the key nor an
/// empty slot.
pub(crate) fn claim<S: Slot>(slots: &[S], hash: u64, key: u64, init: impl FnOnce(&S)) -> Option<&S> {
    debug_assert_ne!(key, 0, "zero is the empty-slot sentinel");
    if slots.is_empty() {
        return None;
    }

    let bucket = (hash % slots.len() as u64) as usize;
    let mut i = bucket;

    loop {
        let slot = &slots[i];
        let current = slot.key().load(Ordering::Acquire);

        if current == key {
            return Some(slot);
        }

        if current == 0 {
            if slot.key().compare_exchange(0, key, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                init(slot);
                return Some(slot);
            }
            // Lost the race: the slot now holds someone's key, possibly ours
            continue;
        }

        i += 1;
        if i == slots.len() {
            i = 0;
        }
        if i == bucket {
            return None;
        }
    }
}

/// Find, claim and count in one step; returns false if the table is full
pub(crate) fn increment<S: Slot>(slots: &[S], hash: u64, key: u64, init: impl FnOnce(&S)) -> bool {
    match claim(slots, hash, key, init) {
        Some(slot) => {
            slot.counter().fetch_add(1, Ordering::Release);
            true
        }
        None => false,
    }
}

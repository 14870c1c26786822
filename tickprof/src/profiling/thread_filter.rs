//! Per-thread sampling filter
//!
//! A bitmap of thread ids split into pages that are allocated the first
//! time a thread on them is added. `accept` only ever reads, so it is safe
//! from the signal handler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::domain::Tid;

/// Highest thread id the filter can hold (Linux `pid_max` limit)
const MAX_THREAD_ID: u32 = 1 << 22;
const BITS_PER_PAGE: u32 = 1 << 16;
const WORDS_PER_PAGE: usize = (BITS_PER_PAGE / 64) as usize;
const PAGE_COUNT: usize = (MAX_THREAD_ID / BITS_PER_PAGE) as usize;

type Page = Box<[AtomicU64]>;

pub struct ThreadFilter {
    enabled: AtomicBool,
    pages: Box<[OnceLock<Page>]>,
}

impl Default for ThreadFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn position(tid: Tid) -> Option<(usize, usize, u64)> {
    if tid.0 >= MAX_THREAD_ID {
        return None;
    }
    let page = (tid.0 / BITS_PER_PAGE) as usize;
    let bit = tid.0 % BITS_PER_PAGE;
    Some((page, (bit / 64) as usize, 1 << (bit % 64)))
}

impl ThreadFilter {
    #[must_use]
    pub fn new() -> Self {
        Self { enabled: AtomicBool::new(false), pages: (0..PAGE_COUNT).map(|_| OnceLock::new()).collect() }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// While disabled, every thread is sampled
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Include `tid`; ids above the supported range are ignored
    pub fn add(&self, tid: Tid) {
        let Some((page, word, mask)) = position(tid) else {
            log::warn!("Thread filter cannot hold {tid}");
            return;
        };
        let words = self.pages[page].get_or_init(|| (0..WORDS_PER_PAGE).map(|_| AtomicU64::new(0)).collect());
        words[word].fetch_or(mask, Ordering::AcqRel);
    }

    pub fn remove(&self, tid: Tid) {
        if let Some((page, word, mask)) = position(tid) {
            if let Some(words) = self.pages[page].get() {
                words[word].fetch_and(!mask, Ordering::AcqRel);
            }
        }
    }

    /// Should a sample on `tid` be recorded
    ///
    /// Without a thread id there is nothing to filter on, so the sample is
    /// accepted.
    #[must_use]
    pub fn accept(&self, tid: Option<Tid>) -> bool {
        if !self.enabled() {
            return true;
        }
        let Some(tid) = tid else {
            return true;
        };
        position(tid).is_some_and(|(page, word, mask)| {
            self.pages[page].get().is_some_and(|words| words[word].load(Ordering::Acquire) & mask != 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_accepts_everything() {
        let filter = ThreadFilter::new();
        assert!(filter.accept(Some(Tid(17))));
        assert!(filter.accept(None));
    }

    #[test]
    fn test_enabled_accepts_added_threads_only() {
        let filter = ThreadFilter::new();
        filter.set_enabled(true);
        filter.add(Tid(17));
        filter.add(Tid(200_000));

        assert!(filter.accept(Some(Tid(17))));
        assert!(filter.accept(Some(Tid(200_000))));
        assert!(!filter.accept(Some(Tid(18))));
        assert!(!filter.accept(Some(Tid(70_000))));
        assert!(filter.accept(None));

        filter.remove(Tid(17));
        assert!(!filter.accept(Some(Tid(17))));
    }

    #[test]
    fn test_out_of_range_thread_is_rejected() {
        let filter = ThreadFilter::new();
        filter.set_enabled(true);
        filter.add(Tid(MAX_THREAD_ID));
        assert!(!filter.accept(Some(Tid(MAX_THREAD_ID))));
    }

    #[test]
    fn test_pages_allocated_lazily() {
        let filter = ThreadFilter::new();
        filter.set_enabled(true);
        assert!(!filter.accept(Some(Tid(5))));
        assert!(filter.pages.iter().all(|p| p.get().is_none()));

        filter.add(Tid(5));
        assert_eq!(filter.pages.iter().filter(|p| p.get().is_some()).count(), 1);
    }
}

//! Non-overlapping address ranges mapped to values

use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct RangeMap<T> {
    /// start → (end, value)
    entries: BTreeMap<usize, (usize, T)>,
}

impl<T> Default for RangeMap<T> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

impl<T> RangeMap<T> {
    /// Map `start..start + len` to `value`
    ///
    /// Any existing range overlapping the new one is evicted first; code
    /// cache memory is reused after its previous owner is gone.
    pub fn insert(&mut self, start: usize, len: usize, value: T) {
        let end = start.saturating_add(len.max(1));

        let stale: Vec<usize> = self
            .entries
            .range(..end)
            .rev()
            .take_while(|(_, (entry_end, _))| *entry_end > start)
            .map(|(&entry_start, _)| entry_start)
            .collect();
        for entry_start in stale {
            self.entries.remove(&entry_start);
        }

        self.entries.insert(start, (end, value));
    }

    /// Remove the range starting exactly at `start` if `matches` accepts it
    pub fn remove_if(&mut self, start: usize, matches: impl FnOnce(&T) -> bool) -> Option<T> {
        if matches(&self.entries.get(&start)?.1) {
            self.entries.remove(&start).map(|(_, value)| value)
        } else {
            None
        }
    }

    /// Point lookup: the range starting exactly at `start`
    #[must_use]
    pub fn get(&self, start: usize) -> Option<&T> {
        self.entries.get(&start).map(|(_, value)| value)
    }

    /// The range enclosing `addr`
    #[must_use]
    pub fn find(&self, addr: usize) -> Option<(Range<usize>, &T)> {
        let (&start, (end, value)) = self.entries.range(..=addr).next_back()?;
        (addr < *end).then_some((start..*end, value))
    }
}

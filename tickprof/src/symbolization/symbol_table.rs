//! Native symbol tables
//!
//! One [`CodeCache`] per loaded library, each holding that library's
//! function symbols sorted by absolute start address. Lookups are binary
//! searches over immutable vectors, so they are safe from a signal handler.

use std::cmp::Ordering;

/// A function symbol at its runtime address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSymbol {
    pub start: usize,

    /// Zero when the symbol table gives no size; such a symbol extends to
    /// the next one
    pub size: usize,
    pub name: Box<str>,
}

impl NativeSymbol {
    pub fn new(start: usize, size: usize, name: impl Into<Box<str>>) -> Self {
        Self { start, size, name: name.into() }
    }
}

/// Symbols of one loaded library
#[derive(Debug, Clone)]
pub struct CodeCache {
    name: String,
    start: usize,
    end: usize,
    symbols: Vec<NativeSymbol>,
}

impl CodeCache {
    /// Build a cache for the library mapped at `start..end`
    ///
    /// Symbols at address zero are discarded: zero is the unknown-frame
    /// marker.
    pub fn new(name: impl Into<String>, start: usize, end: usize, mut symbols: Vec<NativeSymbol>) -> Self {
        symbols.retain(|s| s.start != 0);
        symbols.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.size.cmp(&a.size)));
        symbols.dedup_by_key(|s| s.start);
        Self { name: name.into(), start, end, symbols }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The symbol enclosing `addr`
    #[must_use]
    pub fn lookup(&self, addr: usize) -> Option<&NativeSymbol> {
        let idx = self.symbols.partition_point(|s| s.start <= addr);
        let symbol = self.symbols.get(idx.checked_sub(1)?)?;
        if symbol.size == 0 || addr < symbol.start + symbol.size {
            Some(symbol)
        } else {
            None
        }
    }

    /// The symbol starting exactly at `start`
    #[must_use]
    pub fn symbol_at(&self, start: usize) -> Option<&NativeSymbol> {
        self.symbols
            .binary_search_by(|s| s.start.cmp(&start))
            .ok()
            .map(|idx| &self.symbols[idx])
    }
}

/// All native libraries of the process, as of the last session start
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    libraries: Vec<CodeCache>,
}

impl SymbolTable {
    #[must_use]
    pub fn new(mut libraries: Vec<CodeCache>) -> Self {
        libraries.sort_by(|a, b| a.start.cmp(&b.start));
        Self { libraries }
    }

    #[must_use]
    pub fn libraries(&self) -> &[CodeCache] {
        &self.libraries
    }

    /// Total number of symbols across all libraries
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.libraries.iter().map(CodeCache::len).sum()
    }

    fn library_for(&self, addr: usize) -> Option<&CodeCache> {
        self.libraries
            .binary_search_by(|lib| {
                if lib.end <= addr {
                    Ordering::Less
                } else if lib.start > addr {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .ok()
            .map(|idx| &self.libraries[idx])
    }

    /// Start address of the symbol enclosing `pc`; this is the identity a
    /// native frame is stored under
    #[must_use]
    pub fn lookup(&self, pc: usize) -> Option<usize> {
        self.library_for(pc)?.lookup(pc).map(|s| s.start)
    }

    /// Name of the symbol starting at `start`
    #[must_use]
    pub fn name_of(&self, start: usize) -> Option<&str> {
        self.library_for(start)?.symbol_at(start).map(|s| &*s.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new(vec![
            CodeCache::new(
                "/usr/lib/libjvm.so",
                0x7000,
                0x9000,
                vec![NativeSymbol::new(0x7100, 0x100, "JavaCalls::call"), NativeSymbol::new(0x7400, 0, "os::javaTimeNanos")],
            ),
            CodeCache::new(
                "/usr/bin/java",
                0x1000,
                0x2000,
                vec![NativeSymbol::new(0x1800, 0x40, "main"), NativeSymbol::new(0x1100, 0x10, "_start")],
            ),
        ])
    }

    #[test]
    fn test_lookup_enclosing_symbol() {
        let table = table();
        assert_eq!(table.lookup(0x1100), Some(0x1100));
        assert_eq!(table.lookup(0x180f), Some(0x1800));
        assert_eq!(table.lookup(0x7150), Some(0x7100));
        assert_eq!(table.name_of(0x7100), Some("JavaCalls::call"));
    }

    #[test]
    fn test_lookup_gaps_and_outside() {
        let table = table();
        // Between _start's end and main
        assert_eq!(table.lookup(0x1200), None);
        // Before the first symbol of a library
        assert_eq!(table.lookup(0x7000), None);
        // No library at all
        assert_eq!(table.lookup(0x3000), None);
        assert_eq!(table.name_of(0x3000), None);
    }

    #[test]
    fn test_unsized_symbol_extends_to_library_end() {
        let table = table();
        assert_eq!(table.lookup(0x8fff), Some(0x7400));
        assert_eq!(table.name_of(0x7400), Some("os::javaTimeNanos"));
    }

    #[test]
    fn test_zero_address_symbols_dropped() {
        let cache = CodeCache::new("lib", 0, 0x100, vec![NativeSymbol::new(0, 0x10, "null")]);
        assert!(cache.is_empty());
        assert_eq!(cache.name(), "lib");
    }
}

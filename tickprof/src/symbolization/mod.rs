//! # Native Symbol Resolution
//!
//! Maps raw program counters from the native part of a trace to the
//! function symbol that contains them.
//!
//! ## Flow
//!
//! ```text
//! session start
//!   └─► /proc/self/maps ──► executable file mappings
//!         └─► ELF .symtab + .dynsym (object crate)
//!               └─► relocate by load bias ──► CodeCache per library
//!                     └─► SymbolTable (immutable for the session)
//!
//! interrupt
//!   └─► SymbolTable::lookup(pc) ──► symbol start address (frame identity)
//!
//! report
//!   └─► SymbolTable::name_of(start) ──► name ──► demangle
//! ```
//!
//! The load bias is `mapping start - (segment vaddr + (mapping offset -
//! segment offset))`, which is zero for non-PIE executables.
//!
//! ## Module Structure
//!
//! - **`memory_maps`**: `/proc/<pid>/maps` parsing
//! - **`symbol_table`**: Sorted per-library symbol arrays and lookups
//! - **`loader`**: ELF parsing and the [`SymbolLoader`] seam

pub mod loader;
pub mod memory_maps;
pub mod symbol_table;

pub use loader::{ProcMapsLoader, SymbolLoader};
pub use memory_maps::{parse_executable_mappings, MemoryRange};
pub use symbol_table::{CodeCache, NativeSymbol, SymbolTable};

/// Demangle a native symbol name for display
///
/// Rust symbols (legacy and v0) are demangled without hashes; anything else
/// is returned as is.
#[must_use]
pub fn demangle_symbol(symbol: &str) -> String {
    match rustc_demangle::try_demangle(symbol) {
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => symbol.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demangle_rust_symbol() {
        let name = demangle_symbol("_ZN4core3fmt5write17h0123456789abcdefE");
        assert_eq!(name, "core::fmt::write");
    }

    #[test]
    fn test_plain_symbol_unchanged() {
        assert_eq!(demangle_symbol("JVM_Sleep"), "JVM_Sleep");
    }
}

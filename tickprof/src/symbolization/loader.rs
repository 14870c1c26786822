//! Symbol table loading
//!
//! Reads every executable mapping listed in `/proc/self/maps`, parses the
//! backing ELF file with the `object` crate and relocates its function
//! symbols by the mapping's load bias.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use object::{elf, Object, ObjectSegment, ObjectSymbol, SegmentFlags, SymbolKind};
use std::fs;
use std::path::PathBuf;

use super::memory_maps::{read_executable_mappings, Mapping};
use super::symbol_table::{CodeCache, NativeSymbol, SymbolTable};

/// Source of a fresh [`SymbolTable`], consulted on every session start
pub trait SymbolLoader: Send + Sync {
    /// # Errors
    /// Returns an error if no table could be built at all
    fn load(&self) -> Result<SymbolTable>;
}

/// A fixed table, mostly useful for tests and for embedders that resolve
/// symbols themselves
impl SymbolLoader for SymbolTable {
    fn load(&self) -> Result<SymbolTable> {
        Ok(self.clone())
    }
}

/// Loads symbols of the current process from its maps file
pub struct ProcMapsLoader {
    maps_path: PathBuf,
}

impl ProcMapsLoader {
    pub fn new(maps_path: impl Into<PathBuf>) -> Self {
        Self { maps_path: maps_path.into() }
    }
}

impl Default for ProcMapsLoader {
    fn default() -> Self {
        Self::new("/proc/self/maps")
    }
}

impl SymbolLoader for ProcMapsLoader {
    fn load(&self) -> Result<SymbolTable> {
        let mappings = read_executable_mappings(&self.maps_path)?;

        let mut libraries = Vec::with_capacity(mappings.len());
        for mapping in &mappings {
            match load_library(mapping) {
                Ok(cache) => {
                    debug!("{}: {} symbols", cache.name(), cache.len());
                    libraries.push(cache);
                }
                Err(e) => warn!("Skipping symbols of {}: {e:#}", mapping.path),
            }
        }

        let table = SymbolTable::new(libraries);
        info!(
            "Loaded {} native symbols from {} libraries",
            table.symbol_count(),
            table.libraries().len()
        );
        Ok(table)
    }
}

/// Parse one mapped ELF file into a [`CodeCache`] at its runtime addresses
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if no loadable
/// segment covers the mapping's file offset
pub fn load_library(mapping: &Mapping) -> Result<CodeCache> {
    let data = fs::read(&mapping.path).with_context(|| format!("Failed to read {}", mapping.path))?;
    let file = object::File::parse(&*data).context("Failed to parse object file")?;

    let bias = load_bias(&file, mapping).context("No loadable segment covers the mapping")?;

    let mut symbols = Vec::new();
    for symbol in file.symbols().chain(file.dynamic_symbols()) {
        if symbol.kind() != SymbolKind::Text || !symbol.is_definition() {
            continue;
        }
        let Ok(name) = symbol.name() else { continue };
        if name.is_empty() {
            continue;
        }
        let Some(start) = usize::try_from(symbol.address().wrapping_add(bias)).ok() else {
            continue;
        };
        let size = usize::try_from(symbol.size()).unwrap_or(0);
        symbols.push(NativeSymbol::new(start, size, name));
    }

    let start = usize::try_from(mapping.range.start).context("Mapping start out of range")?;
    let end = usize::try_from(mapping.range.end).context("Mapping end out of range")?;
    Ok(CodeCache::new(mapping.path.clone(), start, end, symbols))
}

/// File and link-time placement of one `PT_LOAD` segment
#[derive(Debug, Clone, Copy)]
struct LoadSegment {
    file_offset: u64,
    file_size: u64,
    align: u64,
    address: u64,
    executable: bool,
}

impl LoadSegment {
    fn from_object<'data>(segment: &impl ObjectSegment<'data>) -> Self {
        let (file_offset, file_size) = segment.file_range();
        let executable = matches!(segment.flags(), SegmentFlags::Elf { p_flags } if p_flags & elf::PF_X != 0);
        Self { file_offset, file_size, align: segment.align(), address: segment.address(), executable }
    }

    /// The loader maps from the aligned-down file offset, so the mapping
    /// may start before the segment itself
    fn maps_offset(&self, offset: u64) -> bool {
        let mask = self.align.max(1).next_power_of_two() - 1;
        offset >= self.file_offset & !mask && offset < self.file_offset + self.file_size.max(1)
    }
}

/// Difference between runtime and link-time addresses
///
/// Zero for non-PIE executables.
fn load_bias(file: &object::File<'_>, mapping: &Mapping) -> Option<u64> {
    let segments: Vec<LoadSegment> = file.segments().map(|s| LoadSegment::from_object(&s)).collect();
    bias_from_segments(&segments, mapping)
}

/// Bias from the segment that the mapping at `mapping.offset` loads
///
/// Executable segments win over the read-only one whose tail shares the
/// same file page; among several, the one starting last in the file.
fn bias_from_segments(segments: &[LoadSegment], mapping: &Mapping) -> Option<u64> {
    let segment = segments
        .iter()
        .filter(|s| s.maps_offset(mapping.offset))
        .max_by_key(|s| (s.executable, s.file_offset))?;
    // runtime(x) = base + (x - offset) and link(x) = address + (x - file_offset)
    Some(
        mapping
            .base
            .wrapping_add(segment.file_offset)
            .wrapping_sub(mapping.offset)
            .wrapping_sub(segment.address),
    )
}

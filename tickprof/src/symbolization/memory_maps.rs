//! Memory mapping utilities for process address space analysis
//!
//! This module parses `/proc/self/maps` to find the executable, file-backed
//! mappings of the running process. Each one is a library (or the main
//! binary) whose symbol table the sampler can resolve native frames against.

use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Executable mapping of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub path: String,

    /// Union of all executable mappings of `path`
    pub range: MemoryRange,

    /// Start address and file offset of the lowest executable mapping
    pub base: u64,
    pub offset: u64,
}

/// Parse maps text into one [`Mapping`] per executable file
///
/// Lines look like `start-end perms offset dev inode pathname`. Anonymous
/// and pseudo mappings (`[vdso]`, `[stack]`) are skipped, as are malformed
/// lines.
#[must_use]
pub fn parse_executable_mappings(maps: &str) -> Vec<Mapping> {
    let mut by_path: BTreeMap<&str, Mapping> = BTreeMap::new();

    for line in maps.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 || !parts[1].contains('x') || !parts[5].starts_with('/') {
            continue;
        }

        let Some((start, end)) = parts[0].split_once('-') else { continue };
        let (Ok(start), Ok(end), Ok(offset)) = (
            u64::from_str_radix(start, 16),
            u64::from_str_radix(end, 16),
            u64::from_str_radix(parts[2], 16),
        ) else {
            continue;
        };

        // Paths may contain spaces
        let path = line
            .find(parts[5])
            .map_or(parts[5], |idx| line[idx..].trim_end());

        by_path
            .entry(path)
            .and_modify(|m| {
                if start < m.range.start {
                    m.base = start;
                    m.offset = offset;
                }
                m.range.start = m.range.start.min(start);
                m.range.end = m.range.end.max(end);
            })
            .or_insert_with(|| Mapping {
                path: path.to_string(),
                range: MemoryRange { start, end },
                base: start,
                offset,
            });
    }

    by_path.into_values().collect()
}

/// Read and parse a maps file (normally `/proc/self/maps`)
///
/// # Errors
/// Returns an error if the file cannot be read
pub fn read_executable_mappings(maps_path: &Path) -> Result<Vec<Mapping>> {
    let maps = fs::read_to_string(maps_path)
        .with_context(|| format!("Failed to read {}", maps_path.display()))?;
    let mappings = parse_executable_mappings(&maps);
    info!("Found {} executable mappings in {}", mappings.len(), maps_path.display());
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d4c6a00000-55d4c6a2e000 r--p 00000000 08:01 1048602 /usr/bin/app
55d4c6a2e000-55d4c6b1f000 r-xp 0002e000 08:01 1048602 /usr/bin/app
7f1a2c000000-7f1a2c021000 rw-p 00000000 00:00 0
7f1a2d228000-7f1a2d3bd000 r-xp 00028000 08:01 1835166 /usr/lib/x86_64-linux-gnu/libc.so.6
7f1a2d500000-7f1a2d501000 r-xp 00000000 08:01 1835170 /opt/my libs/libspace.so
7ffd3a9f1000-7ffd3a9f3000 r-xp 00000000 00:00 0 [vdso]
garbage line
";

    #[test]
    fn test_memory_range_contains() {
        let range = MemoryRange { start: 0x1000, end: 0x2000 };

        assert!(range.contains(0x1000));
        assert!(range.contains(0x1500));
        assert!(range.contains(0x1FFF));
        assert!(!range.contains(0x0FFF));
        assert!(!range.contains(0x2000));
        assert!(!range.contains(0x2001));
    }

    #[test]
    fn test_parse_executable_mappings() {
        let mappings = parse_executable_mappings(MAPS);
        let paths: Vec<&str> = mappings.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/opt/my libs/libspace.so", "/usr/bin/app", "/usr/lib/x86_64-linux-gnu/libc.so.6"]
        );

        let app = &mappings[1];
        assert_eq!(app.range, MemoryRange { start: 0x55d4_c6a2_e000, end: 0x55d4_c6b1_f000 });
        assert_eq!(app.base, 0x55d4_c6a2_e000);
        assert_eq!(app.offset, 0x2e000);
    }

    #[test]
    fn test_parse_self_maps() {
        // Linux only; other platforms have no /proc
        if let Ok(mappings) = read_executable_mappings(Path::new("/proc/self/maps")) {
            assert!(!mappings.is_empty());
        }
    }
}

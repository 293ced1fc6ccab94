//! Memory regions and placement requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access kind of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    Ram,
    Rom,
    Io,
    /// Non-occupying alias of another region, for linker scripts only.
    Linker,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegionKind::Ram => "ram",
            RegionKind::Rom => "rom",
            RegionKind::Io => "io",
            RegionKind::Linker => "linker",
        };
        f.write_str(s)
    }
}

/// A named half-open address range `[origin, origin + size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryRegion {
    pub name: String,
    pub origin: u64,
    pub size: u64,
    pub kind: RegionKind,
    pub cached: bool,
    /// For `Linker` regions, the region being aliased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, origin: u64, size: u64, kind: RegionKind) -> Self {
        Self {
            name: name.into(),
            origin,
            size,
            kind,
            cached: kind != RegionKind::Io,
            alias_of: None,
        }
    }

    /// Exclusive end address (saturating).
    pub fn end(&self) -> u64 {
        self.origin.saturating_add(self.size)
    }

    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.origin && addr < self.end()
    }

    /// Start of the shared range, if any.
    pub fn overlap_start(&self, other: &MemoryRegion) -> Option<u64> {
        (self.origin < other.end() && other.origin < self.end())
            .then(|| self.origin.max(other.origin))
    }

    /// Required origin alignment: the size rounded up to a power of two.
    pub fn alignment(&self) -> u64 {
        self.size.checked_next_power_of_two().unwrap_or(1 << 63)
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} 0x{:08x}-0x{:08x} {:<6}{}",
            self.name,
            self.origin,
            self.end(),
            self.kind,
            if self.cached { " cached" } else { "" }
        )?;
        if let Some(target) = &self.alias_of {
            write!(f, " (alias of {target})")?;
        }
        Ok(())
    }
}

/// Where a requested region goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Explicit bus address.
    Fixed(u64),
    /// Linker alias at `target.origin + offset`.
    AliasOf { target: String, offset: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_half_open() {
        let a = MemoryRegion::new("a", 0x0, 0x1000, RegionKind::Ram);
        let b = MemoryRegion::new("b", 0x1000, 0x1000, RegionKind::Ram);
        let c = MemoryRegion::new("c", 0x0800, 0x1000, RegionKind::Ram);
        assert_eq!(a.overlap_start(&b), None);
        assert_eq!(a.overlap_start(&c), Some(0x0800));
        assert_eq!(b.overlap_start(&c), Some(0x1000));
        assert!(a.contains(0xfff));
        assert!(!a.contains(0x1000));
    }

    #[test]
    fn alignment_rounds_up() {
        assert_eq!(MemoryRegion::new("r", 0, 0x2000, RegionKind::Ram).alignment(), 0x2000);
        assert_eq!(MemoryRegion::new("r", 0, 0x3000, RegionKind::Ram).alignment(), 0x4000);
    }

    #[test]
    fn io_regions_are_uncached() {
        assert!(!MemoryRegion::new("csr", 0xf000_0000, 0x10000, RegionKind::Io).cached);
        assert!(MemoryRegion::new("sram", 0x1000_0000, 0x2000, RegionKind::Ram).cached);
    }
}

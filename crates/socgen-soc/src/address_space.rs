//! Ordered, non-overlapping set of named regions.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SocError};
use crate::region::{MemoryRegion, RegionKind};

/// An uncached window of the bus reserved for IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IoWindow {
    pub origin: u64,
    pub size: u64,
}

impl IoWindow {
    pub fn end(&self) -> u64 {
        self.origin.saturating_add(self.size)
    }

    fn contains(&self, region: &MemoryRegion) -> bool {
        region.origin >= self.origin && region.end() <= self.end()
    }

    fn overlaps(&self, region: &MemoryRegion) -> bool {
        region.origin < self.end() && self.origin < region.end()
    }
}

/// Region name to region, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressSpace {
    address_width: u32,
    io_windows: Vec<IoWindow>,
    regions: Vec<MemoryRegion>,
}

impl AddressSpace {
    pub fn new(address_width: u32, io_windows: Vec<IoWindow>) -> Self {
        Self {
            address_width,
            io_windows,
            regions: Vec::new(),
        }
    }

    pub fn address_width(&self) -> u32 {
        self.address_width
    }

    pub fn io_windows(&self) -> &[IoWindow] {
        &self.io_windows
    }

    /// Regions in insertion order.
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn get(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Validate `region` against the current contents and append it.
    pub fn insert(&mut self, region: MemoryRegion) -> Result<()> {
        if self.get(&region.name).is_some() {
            return Err(SocError::DuplicateRegion(region.name));
        }
        self.check_region(&region)?;
        for existing in &self.regions {
            self.check_pair(existing, &region)?;
        }
        debug!("region {region}");
        self.regions.push(region);
        Ok(())
    }

    /// Re-check every region and every pair from scratch.
    pub fn validate(&self) -> Result<()> {
        for (i, a) in self.regions.iter().enumerate() {
            if self.regions[..i].iter().any(|r| r.name == a.name) {
                return Err(SocError::DuplicateRegion(a.name.clone()));
            }
            self.check_region(a)?;
            for b in &self.regions[..i] {
                self.check_pair(b, a)?;
            }
        }
        Ok(())
    }

    fn check_region(&self, region: &MemoryRegion) -> Result<()> {
        if region.size == 0 {
            return Err(SocError::EmptyRegion(region.name.clone()));
        }
        let limit = 1u128 << self.address_width.min(64);
        let end = region.origin as u128 + region.size as u128;
        if end > limit {
            return Err(SocError::OutOfAddressSpace {
                name: region.name.clone(),
                end: end.min(u64::MAX as u128) as u64,
                address_width: self.address_width,
            });
        }

        if let Some(target_name) = &region.alias_of {
            let target = self
                .get(target_name)
                .ok_or_else(|| SocError::UnknownRegion(target_name.clone()))?;
            if region.origin < target.origin || region.end() > target.end() {
                return Err(SocError::AliasOutOfBounds {
                    name: region.name.clone(),
                    target: target.name.clone(),
                    offset: region.origin.saturating_sub(target.origin),
                    size: region.size,
                    target_size: target.size,
                });
            }
            return Ok(());
        }

        let alignment = region.alignment();
        if region.origin % alignment != 0 {
            return Err(SocError::MisalignedRegion {
                name: region.name.clone(),
                origin: region.origin,
                alignment,
            });
        }
        if region.kind == RegionKind::Io && !self.io_windows.iter().any(|w| w.contains(region)) {
            return Err(SocError::IoOutsideWindow(region.name.clone()));
        }
        if region.cached && self.io_windows.iter().any(|w| w.overlaps(region)) {
            return Err(SocError::CachedIoRegion(region.name.clone()));
        }
        Ok(())
    }

    // `b` is the later region of the pair.
    fn check_pair(&self, a: &MemoryRegion, b: &MemoryRegion) -> Result<()> {
        match (a.is_alias(), b.is_alias()) {
            (false, false) => match a.overlap_start(b) {
                Some(overlap_start) => Err(SocError::RegionConflict {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    overlap_start,
                }),
                None => Ok(()),
            },
            (true, true) => Ok(()),
            (true, false) => check_alias(a, b),
            (false, true) => check_alias(b, a),
        }
    }
}

fn check_alias(alias: &MemoryRegion, region: &MemoryRegion) -> Result<()> {
    if alias.alias_of.as_deref() == Some(region.name.as_str()) {
        return Ok(());
    }
    if alias.overlap_start(region).is_some() {
        return Err(SocError::AliasCollision {
            alias: alias.name.clone(),
            region: region.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> AddressSpace {
        AddressSpace::new(
            32,
            vec![IoWindow {
                origin: 0x8000_0000,
                size: 0x8000_0000,
            }],
        )
    }

    fn alias(name: &str, target: &str, origin: u64, size: u64) -> MemoryRegion {
        MemoryRegion {
            alias_of: Some(target.into()),
            ..MemoryRegion::new(name, origin, size, RegionKind::Linker)
        }
    }

    #[test]
    fn disjoint_regions_accepted() {
        let mut s = space();
        s.insert(MemoryRegion::new("rom", 0x0, 0x20000, RegionKind::Rom)).unwrap();
        s.insert(MemoryRegion::new("sram", 0x1000_0000, 0x2000, RegionKind::Ram)).unwrap();
        s.insert(MemoryRegion::new("csr", 0xf000_0000, 0x10000, RegionKind::Io)).unwrap();
        assert!(s.validate().is_ok());
        let names: Vec<_> = s.regions().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["rom", "sram", "csr"]);
    }

    #[test]
    fn overlap_names_both_regions() {
        let mut s = space();
        s.insert(MemoryRegion::new("main_ram", 0x4000_0000, 0x1000_0000, RegionKind::Ram))
            .unwrap();
        let err = s
            .insert(MemoryRegion::new("extra", 0x4800_0000, 0x0800_0000, RegionKind::Ram))
            .unwrap_err();
        assert_eq!(
            err,
            SocError::RegionConflict {
                first: "main_ram".into(),
                second: "extra".into(),
                overlap_start: 0x4800_0000,
            }
        );
        assert!(err.to_string().contains("main_ram"));
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn rejects_malformed_regions() {
        let mut s = space();
        assert!(matches!(
            s.insert(MemoryRegion::new("z", 0x0, 0, RegionKind::Ram)),
            Err(SocError::EmptyRegion(_))
        ));
        assert!(matches!(
            s.insert(MemoryRegion::new("m", 0x1000, 0x2000, RegionKind::Ram)),
            Err(SocError::MisalignedRegion { alignment: 0x2000, .. })
        ));
        assert!(matches!(
            s.insert(MemoryRegion::new("io", 0x1000_0000, 0x1000, RegionKind::Io)),
            Err(SocError::IoOutsideWindow(_))
        ));
        assert!(matches!(
            s.insert(MemoryRegion::new("ram", 0x9000_0000, 0x1000, RegionKind::Ram)),
            Err(SocError::CachedIoRegion(_))
        ));
        s.insert(MemoryRegion::new("a", 0x0, 0x1000, RegionKind::Ram)).unwrap();
        assert!(matches!(
            s.insert(MemoryRegion::new("a", 0x2000, 0x1000, RegionKind::Ram)),
            Err(SocError::DuplicateRegion(_))
        ));
    }

    #[test]
    fn out_of_address_space() {
        let mut s = AddressSpace::new(16, vec![]);
        assert!(matches!(
            s.insert(MemoryRegion::new("big", 0x0, 0x2_0000, RegionKind::Ram)),
            Err(SocError::OutOfAddressSpace { .. })
        ));
    }

    #[test]
    fn alias_inside_target() {
        let mut s = space();
        s.insert(MemoryRegion::new("spiflash", 0x2000_0000, 0x10_0000, RegionKind::Rom))
            .unwrap();
        s.insert(alias("rom", "spiflash", 0x2005_0000, 0x8000)).unwrap();
        assert!(s.get("rom").unwrap().is_alias());

        let err = s
            .insert(alias("late", "spiflash", 0x200f_c000, 0x8000))
            .unwrap_err();
        assert!(matches!(err, SocError::AliasOutOfBounds { .. }));
        assert!(matches!(
            s.insert(alias("x", "nope", 0x0, 0x10)),
            Err(SocError::UnknownRegion(_))
        ));
    }

    #[test]
    fn region_over_alias_conflicts_with_target() {
        let mut s = space();
        s.insert(MemoryRegion::new("flash", 0x0, 0x40_0000, RegionKind::Rom)).unwrap();
        s.insert(alias("rom", "flash", 0x5_0000, 0x8000)).unwrap();
        let err = s
            .insert(MemoryRegion::new("sram", 0x5_0000, 0x2000, RegionKind::Ram))
            .unwrap_err();
        assert!(matches!(err, SocError::RegionConflict { ref first, .. } if first == "flash"));
    }

    #[test]
    fn validate_rechecks_everything() {
        let mut s = space();
        s.regions.push(MemoryRegion::new("flash", 0x0, 0x1_0000, RegionKind::Rom));
        s.regions.push(alias("rom", "flash", 0x8000, 0x8000));
        assert!(s.validate().is_ok());
        s.regions.push(MemoryRegion::new("sram", 0x8000, 0x8000, RegionKind::Ram));
        assert!(matches!(
            s.validate(),
            Err(SocError::RegionConflict { .. })
        ));
    }
}

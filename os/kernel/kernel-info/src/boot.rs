//! # Boot Memory Map
//!
//! The boot collaborator hands the kernel a list of `(base, length, kind)`
//! regions and a reported amount of usable memory. The memory subsystem reads
//! this exactly once to decide which physical frames exist.

use crate::memory::{ADDRESS_SPACE_PAGES, PAGE_SIZE};

/// Upper bound of regions kept from the firmware map.
pub const MAX_MEMORY_REGIONS: usize = 64;

/// Type of a physical memory region, following the multiboot numbering.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemoryRegionKind {
    Available,
    Reserved,
    AcpiReclaimable,
    AcpiNvs,
    Defective,
}

impl MemoryRegionKind {
    /// Decode a multiboot memory map `type` field. Unknown values are reserved.
    #[must_use]
    pub const fn from_multiboot(kind: u32) -> Self {
        match kind {
            1 => Self::Available,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::Defective,
            _ => Self::Reserved,
        }
    }

    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// A physical memory range reported by the firmware.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryRegion {
    pub base: u64,
    pub length: u64,
    pub kind: MemoryRegionKind,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(base: u64, length: u64, kind: MemoryRegionKind) -> Self {
        Self { base, length, kind }
    }

    /// Exclusive end address.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    /// Frame indices overlapped by this region, clamped to the 32-bit space.
    #[must_use]
    pub fn frames(&self) -> core::ops::Range<usize> {
        clamp_frame(self.base / u64::from(PAGE_SIZE))
            ..clamp_frame(self.end().div_ceil(u64::from(PAGE_SIZE)))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_frame(frame: u64) -> usize {
    frame.min(ADDRESS_SPACE_PAGES as u64) as usize
}

/// The memory map could not take another region.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("boot memory map is full")]
pub struct MemoryMapFull;

/// Memory map handed over by the boot collaborator.
#[derive(Debug, Clone)]
pub struct BootMemoryMap {
    regions: [MemoryRegion; MAX_MEMORY_REGIONS],
    len: usize,
    dropped: usize,
    usable_bytes: u64,
}

impl Default for BootMemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BootMemoryMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: [MemoryRegion::new(0, 0, MemoryRegionKind::Reserved); MAX_MEMORY_REGIONS],
            len: 0,
            dropped: 0,
            usable_bytes: 0,
        }
    }

    /// Append a region. Zero-length regions are dropped.
    ///
    /// # Errors
    /// [`MemoryMapFull`] once [`MAX_MEMORY_REGIONS`] regions are stored.
    pub fn push(&mut self, region: MemoryRegion) -> Result<(), MemoryMapFull> {
        if region.length == 0 {
            return Ok(());
        }
        let slot = self.regions.get_mut(self.len).ok_or(MemoryMapFull)?;
        *slot = region;
        self.len += 1;
        Ok(())
    }

    /// Record the total usable memory the firmware reports separately from the map.
    pub const fn set_usable_bytes(&mut self, bytes: u64) {
        self.usable_bytes = bytes;
    }

    #[must_use]
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions[..self.len]
    }

    /// Regions the loader reported that did not fit.
    ///
    /// Frames they describe are not covered by an available region and so
    /// stay claimed.
    #[must_use]
    pub const fn dropped_regions(&self) -> usize {
        self.dropped
    }

    /// Neither regions nor a usable size were reported.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0 && self.usable_bytes == 0
    }

    /// Usable bytes: the sum of available regions, or the separately
    /// reported size when the map carries no regions.
    #[must_use]
    pub fn usable_bytes(&self) -> u64 {
        if self.len == 0 {
            return self.usable_bytes;
        }
        self.regions()
            .iter()
            .filter(|r| r.kind.is_usable())
            .map(|r| r.length)
            .sum()
    }

    /// Number of frames from address zero to the top of installed RAM.
    ///
    /// Every frame at or above this index does not exist and must never be
    /// handed out.
    #[must_use]
    pub fn installed_frames(&self) -> usize {
        let top = if self.len == 0 {
            self.usable_bytes
        } else {
            self.regions()
                .iter()
                .filter(|r| r.kind.is_usable())
                .map(MemoryRegion::end)
                .max()
                .unwrap_or(0)
        };
        clamp_frame(top / u64::from(PAGE_SIZE))
    }

    /// Parse a multiboot (v1) memory map buffer.
    ///
    /// Each entry is `size: u32, base: u64, length: u64, type: u32`, with
    /// `size` not counting itself. `mem_lower_kib` and `mem_upper_kib` are
    /// the basic memory fields, used as the usable size.
    ///
    /// Regions past [`MAX_MEMORY_REGIONS`] are counted in
    /// [`dropped_regions`](Self::dropped_regions) and otherwise ignored.
    #[must_use]
    pub fn from_multiboot(mmap: &[u8], mem_lower_kib: u32, mem_upper_kib: u32) -> Self {
        let mut map = Self::new();
        map.set_usable_bytes((u64::from(mem_lower_kib) + u64::from(mem_upper_kib)) * 1024);

        let mut rest = mmap;
        while let Some((size, entry)) = split_u32(rest) {
            let Some(entry) = entry.get(..size as usize) else {
                break;
            };
            if let Some(region) = parse_multiboot_entry(entry)
                && map.push(region).is_err()
            {
                map.dropped += 1;
            }
            rest = &rest[4 + size as usize..];
        }
        map
    }
}

fn split_u32(bytes: &[u8]) -> Option<(u32, &[u8])> {
    let (head, tail) = bytes.split_first_chunk::<4>()?;
    Some((u32::from_le_bytes(*head), tail))
}

fn parse_multiboot_entry(entry: &[u8]) -> Option<MemoryRegion> {
    let (base, entry) = entry.split_first_chunk::<8>()?;
    let (length, entry) = entry.split_first_chunk::<8>()?;
    let (kind, _) = split_u32(entry)?;
    Some(MemoryRegion::new(
        u64::from_le_bytes(*base),
        u64::from_le_bytes(*length),
        MemoryRegionKind::from_multiboot(kind),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(base: u64, len: u64, kind: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&20u32.to_le_bytes());
        v.extend_from_slice(&base.to_le_bytes());
        v.extend_from_slice(&len.to_le_bytes());
        v.extend_from_slice(&kind.to_le_bytes());
        v
    }

    #[test]
    fn parses_multiboot_entries() {
        let mut buf = entry(0, 0x9_FC00, 1);
        buf.extend(entry(0x9_FC00, 0x400, 2));
        buf.extend(entry(0x10_0000, 0xF0_0000, 1));

        let map = BootMemoryMap::from_multiboot(&buf, 639, 15 * 1024);
        assert_eq!(map.regions().len(), 3);
        assert_eq!(map.regions()[1].kind, MemoryRegionKind::Reserved);
        assert_eq!(map.installed_frames(), 0x1000);
        assert_eq!(map.usable_bytes(), 0x9_FC00 + 0xF0_0000);
    }

    #[test]
    fn truncated_entry_stops_parsing() {
        let mut buf = entry(0x10_0000, 0x10_0000, 1);
        buf.extend_from_slice(&20u32.to_le_bytes());
        buf.extend_from_slice(&[0; 6]);
        let map = BootMemoryMap::from_multiboot(&buf, 0, 0);
        assert_eq!(map.regions().len(), 1);
    }

    #[test]
    fn oversized_map_keeps_the_first_regions() {
        let mut buf = entry(0, 0x9_FC00, 1);
        buf.extend(entry(0x80_0000, 0x1_0000, 4));
        buf.extend(entry(0x10_0000, 0xF0_0000, 1));
        for i in 0..63u64 {
            buf.extend(entry(0x100_0000 + i * 0x1000, 0x1000, 2));
        }

        let map = BootMemoryMap::from_multiboot(&buf, 639, 15 * 1024);
        assert_eq!(map.regions().len(), MAX_MEMORY_REGIONS);
        assert_eq!(map.dropped_regions(), 2);
        assert_eq!(map.regions()[1].kind, MemoryRegionKind::AcpiNvs);
        assert_eq!(map.installed_frames(), 0x1000);
    }

    #[test]
    fn falls_back_to_reported_size() {
        let mut map = BootMemoryMap::new();
        assert!(map.is_empty());
        map.set_usable_bytes(16 * 1024 * 1024);
        assert!(!map.is_empty());
        assert_eq!(map.installed_frames(), 4096);
    }

    #[test]
    fn regions_above_four_gib_are_clamped() {
        let region = MemoryRegion::new(0xFFFF_0000, 0x2_0000_0000, MemoryRegionKind::Available);
        assert_eq!(region.frames(), 0xFFFF0..ADDRESS_SPACE_PAGES);
    }

    #[test]
    fn rejects_too_many_regions() {
        let mut map = BootMemoryMap::new();
        for i in 0..MAX_MEMORY_REGIONS as u64 {
            map.push(MemoryRegion::new(i * 0x1000, 0x1000, MemoryRegionKind::Available))
                .expect("fits");
        }
        assert_eq!(
            map.push(MemoryRegion::new(0, 1, MemoryRegionKind::Reserved)),
            Err(MemoryMapFull)
        );
    }
}

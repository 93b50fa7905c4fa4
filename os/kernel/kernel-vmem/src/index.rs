use kernel_memory_addresses::{PageOffset, VirtualAddress};

/// Index into the Page Directory (VA bits `[31:22]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DirectoryIndex(u16);

/// Index into a Page Table (VA bits `[21:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TableIndex(u16);

impl DirectoryIndex {
    /// Extract bits `[31:22]` of `va`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self((va.as_u32() >> 22) as u16)
    }

    /// Construct from a raw value.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 1024);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// First virtual address covered by this slot.
    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new((self.0 as u32) << 22)
    }
}

impl TableIndex {
    /// Extract bits `[21:12]` of `va`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    /// Construct from a raw value.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 1024);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Decompose a virtual address into directory index, table index and page offset.
#[inline]
#[must_use]
pub const fn split(va: VirtualAddress) -> (DirectoryIndex, TableIndex, PageOffset) {
    (DirectoryIndex::from(va), TableIndex::from(va), va.offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_higher_half() {
        let (dir, table, off) = split(VirtualAddress::new(0xC010_2ABC));
        assert_eq!(dir.as_usize(), 0x300);
        assert_eq!(table.as_usize(), 0x102);
        assert_eq!(off.as_u32(), 0xABC);
    }

    #[test]
    fn split_extremes() {
        let (dir, table, off) = split(VirtualAddress::new(0xFFFF_FFFF));
        assert_eq!((dir.as_usize(), table.as_usize(), off.as_u32()), (1023, 1023, 0xFFF));
        let (dir, table, off) = split(VirtualAddress::zero());
        assert_eq!((dir.as_usize(), table.as_usize(), off.as_u32()), (0, 0, 0));
    }

    #[test]
    fn directory_base() {
        assert_eq!(DirectoryIndex::new(768).base(), VirtualAddress::new(0xC000_0000));
    }
}

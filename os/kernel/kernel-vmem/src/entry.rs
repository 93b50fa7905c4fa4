use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// A 32-bit paging entry in its raw bitfield form.
///
/// Page directory entries and page table entries share this layout; the
/// `large_page` bit is only meaningful in a directory entry and is never
/// set here.
///
/// | Bits  | Name              | Meaning |
/// |-------|-------------------|---------|
/// | 0     | `P`               | Present |
/// | 1     | `RW`              | Writable |
/// | 2     | `US`              | User-mode accessible |
/// | 3     | `PWT`             | Write-through caching |
/// | 4     | `PCD`             | Cache disable |
/// | 5     | `A`               | Accessed |
/// | 6     | `D`               | Dirty (table entries only) |
/// | 7     | `PS` / `PAT`      | 4 MiB page in a directory entry |
/// | 8     | `G`               | Global |
/// | 9–11  | OS available      | Ignored by the CPU |
/// | 12–31 | `frame`           | Physical frame number |
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    pub present: bool,
    pub writable: bool,
    pub user_access: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub large_page: bool,
    pub global_translation: bool,
    #[bits(3)]
    pub os_available: u8,
    /// Physical address bits 31‒12.
    #[bits(20)]
    pub frame: u32,
}

impl PageEntryBits {
    /// Physical base address held by this entry.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame() << 12)
    }

    /// Store a 4 KiB-aligned physical base address.
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_frame(pa.as_u32() >> 12);
    }

    /// Permission bits for `flags`, without `present` and without an address.
    #[inline]
    #[must_use]
    pub const fn from_map_flags(flags: MapFlags) -> Self {
        Self::new()
            .with_writable(flags.contains(MapFlags::WRITABLE))
            .with_user_access(flags.contains(MapFlags::USER))
            .with_write_through(flags.contains(MapFlags::WRITE_THROUGH))
            .with_cache_disabled(flags.contains(MapFlags::CACHE_DISABLE))
            .with_global_translation(flags.contains(MapFlags::GLOBAL))
    }
}

bitflags::bitflags! {
    /// Permissions and caching of a new 4 KiB mapping.
    ///
    /// An empty set is a read-only, supervisor-only, cached page.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct MapFlags: u32 {
        /// Writes are allowed.
        const WRITABLE      = 1 << 1;
        /// Accessible from ring 3.
        const USER          = 1 << 2;
        /// Write-through caching; typically used for MMIO.
        const WRITE_THROUGH = 1 << 3;
        /// Caching disabled.
        const CACHE_DISABLE = 1 << 4;
        /// Survives CR3 reloads when CR4.PGE is set.
        const GLOBAL        = 1 << 8;

        /// Read/write, supervisor only.
        const KERNEL_RW = Self::WRITABLE.bits();
    }
}

/// A single Page Table entry (PTE), mapping one 4 KiB page.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PageTableEntry(PageEntryBits);

impl PageTableEntry {
    /// Create a zero (non-present) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// Create a present entry mapping `frame` with `flags`.
    #[inline]
    #[must_use]
    pub const fn make(frame: PhysicalPage, flags: MapFlags) -> Self {
        let mut bits = PageEntryBits::from_map_flags(flags);
        bits.set_present(true);
        bits.set_physical_address(frame.base());
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, the mapped frame.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> Option<PhysicalPage> {
        if self.is_present() {
            Some(self.frame_unchecked())
        } else {
            None
        }
    }

    /// The frame field regardless of the present bit.
    #[inline]
    #[must_use]
    pub const fn frame_unchecked(self) -> PhysicalPage {
        PhysicalPage::from_index(self.0.frame())
    }

    /// Expose the underlying bitfield.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    /// Construct from a raw value. No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PTE({:#010X})", self.raw())
    }
}

/// A single Page Directory entry (PDE), pointing at one page table.
#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PageDirectoryEntry(PageEntryBits);

impl PageDirectoryEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// Present, read/write, supervisor-only entry for the table at `table`.
    ///
    /// `table` must be 4 KiB-aligned.
    #[inline]
    #[must_use]
    pub const fn make_table(table: PhysicalAddress) -> Self {
        let mut bits = PageEntryBits::new().with_present(true).with_writable(true);
        bits.set_physical_address(table);
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, the physical address of the page table.
    #[inline]
    #[must_use]
    pub const fn table(self) -> Option<PhysicalAddress> {
        if self.is_present() {
            Some(self.0.physical_address())
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

impl core::fmt::Debug for PageDirectoryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PDE({:#010X})", self.raw())
    }
}

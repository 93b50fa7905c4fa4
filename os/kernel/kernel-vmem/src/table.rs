//! # Page Directory and Page Table
//!
//! Both are 4 KiB-aligned arrays of 1024 32-bit entries. The CPU reads them
//! directly; writing an entry of an active mapping requires TLB maintenance
//! by the caller.

use crate::{DirectoryIndex, PageDirectoryEntry, PageTableEntry, TableIndex};
use kernel_info::memory::PAGE_ENTRIES;

/// The Page Table: 1024 entries, 4 KiB-aligned.
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; PAGE_ENTRIES],
}

/// The Page Directory: 1024 entries, 4 KiB-aligned.
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PageDirectoryEntry; PAGE_ENTRIES],
}

impl PageTable {
    /// Create a fully zeroed Page Table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageTableEntry::zero(); PAGE_ENTRIES],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PageTableEntry {
        self.entries[i.as_usize()]
    }

    /// Caller must handle any required TLB invalidation when changing active mappings.
    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PageTableEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Mark every entry non-present.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(PageTableEntry::zero());
    }

    pub fn iter(&self) -> impl Iterator<Item = PageTableEntry> + '_ {
        self.entries.iter().copied()
    }
}

impl PageDirectory {
    /// Create a fully zeroed Page Directory (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageDirectoryEntry::zero(); PAGE_ENTRIES],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: DirectoryIndex) -> PageDirectoryEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: DirectoryIndex, e: PageDirectoryEntry) {
        self.entries[i.as_usize()] = e;
    }
}

const _: () = {
    assert!(size_of::<PageTable>() == 4096);
    assert!(size_of::<PageDirectory>() == 4096);
};

use core::mem::{MaybeUninit, offset_of};
use kernel_bitmap::BitIndex;
use kernel_info::memory::{ADDRESS_SPACE_PAGES, PAGE_ENTRIES, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};
use kernel_vmem::{DirectoryIndex, PageDirectory, PageTable};

/// Words in a bitmap covering every page of the 32-bit address space.
pub const BITMAP_WORDS: usize = BitIndex::words_for(ADDRESS_SPACE_PAGES);

/// Page tables backing directory slots `0..1023`; the last slot is recursive.
pub const TABLE_COUNT: usize = PAGE_ENTRIES - 1;

/// All storage the memory subsystem owns: the page directory, one page table
/// per non-recursive directory slot, and the frame and virtual page bitmaps.
///
/// An all-zero arena is valid: every entry is non-present and every bitmap
/// bit is clear.
#[repr(C, align(4096))]
pub struct PagingArena {
    pub(crate) directory: PageDirectory,
    pub(crate) tables: [PageTable; TABLE_COUNT],
    pub(crate) frame_words: [u32; BITMAP_WORDS],
    pub(crate) page_words: [u32; BITMAP_WORDS],
}

impl PagingArena {
    /// Physical frames the arena occupies.
    pub const FRAMES: usize = size_of::<Self>().div_ceil(PAGE_SIZE as usize);

    /// Zero `slot` in place and hand out the arena.
    ///
    /// The arena is too large for the stack; callers keep it in static
    /// storage or on the heap.
    pub fn init_zeroed(slot: &mut MaybeUninit<Self>) -> &mut Self {
        // SAFETY: all-zero bytes are a valid PagingArena (see type docs).
        unsafe {
            slot.as_mut_ptr().write_bytes(0, 1);
            slot.assume_init_mut()
        }
    }

    /// Physical address of the table behind `dir`, given the arena's physical base.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn table_phys(base: PhysicalAddress, dir: DirectoryIndex) -> PhysicalAddress {
        let offset = offset_of!(Self, tables) + dir.as_usize() * size_of::<PageTable>();
        PhysicalAddress::new(base.as_u32() + offset as u32)
    }

    /// Frames covered by an arena whose first byte is at `base`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn frames(base: PhysicalAddress) -> impl Iterator<Item = PhysicalPage> {
        let first = base.page().index();
        (first..first + Self::FRAMES as u32).map(PhysicalPage::from_index)
    }
}

const _: () = {
    assert!(offset_of!(PagingArena, directory) == 0);
    assert!(offset_of!(PagingArena, tables) == PAGE_SIZE as usize);
    assert!(size_of::<PagingArena>().is_multiple_of(PAGE_SIZE as usize));
};

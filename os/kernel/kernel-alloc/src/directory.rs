//! The virtual page directory: the single authority over every mapping in
//! the kernel's address space.
//!
//! ## Initialization order
//!
//! All of this runs before the paging unit is switched on:
//!
//! 1. Zero every page table and point directory slots `0..1023` at them.
//! 2. Point slot 1023 at the directory itself and mark the last 4 MiB
//!    claimed in both bitmaps.
//! 3. Claim the frames of the arena holding the directory, the tables and
//!    the bitmaps.
//! 4. Identity-map the first 1 MiB.
//! 5. Map the kernel image at its higher-half link address.
//! 6. Register the page-fault handler.
//! 7. Load CR3 and set CR0.PG.
//!
//! [`VirtualPageDirectory::init`] runs the whole sequence; the individual
//! steps are public for callers that need to interleave their own work.

use crate::arena::{PagingArena, TABLE_COUNT};
use crate::fault::{MemoryFault, fatal};
use crate::frame_alloc::FrameAllocator;
use crate::page_fault::{FaultHandler, InterruptRegistry, PAGE_FAULT_VECTOR};
use kernel_bitmap::BitIndex;
use kernel_info::boot::BootMemoryMap;
use kernel_info::memory::{
    ADDRESS_SPACE_PAGES, EARLY_IDENTITY_LIMIT, KERNEL_BASE, PAGE_ENTRIES, PAGE_SIZE, RECURSIVE_SLOT,
};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};
use kernel_vmem::{
    DirectoryIndex, MapFlags, PageDirectory, PageDirectoryEntry, PageTable, PageTableEntry,
    PagingUnit, recursive, split,
};

/// Link-time placement of the kernel image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KernelImage {
    /// First byte of the image (virtual, higher half).
    pub start: VirtualAddress,
    /// One past the last byte of the image.
    pub end: VirtualAddress,
    /// Offset between the image's virtual and physical addresses.
    pub kernel_base: u32,
}

impl KernelImage {
    #[must_use]
    pub const fn new(start: VirtualAddress, end: VirtualAddress) -> Self {
        Self {
            start,
            end,
            kernel_base: KERNEL_BASE,
        }
    }

    /// Physical address `va` of the image was loaded at.
    #[must_use]
    pub const fn to_physical(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(va.as_u32() - self.kernel_base)
    }
}

/// Owner of the page directory, its page tables and both bitmaps.
pub struct VirtualPageDirectory<'a, U: PagingUnit> {
    directory: &'a mut PageDirectory,
    tables: &'a mut [PageTable; TABLE_COUNT],
    pages: BitIndex<'a>,
    frames: FrameAllocator<'a>,
    directory_phys: PhysicalAddress,
    unit: U,
    paging_enabled: bool,
    mapped: usize,
}

impl<'a, U: PagingUnit> VirtualPageDirectory<'a, U> {
    /// Run the full initialization protocol and switch paging on.
    ///
    /// `arena_phys` is the physical address the arena lives at.
    ///
    /// # Safety
    /// On real hardware the image and stack the caller executes from must be
    /// covered by `image` or the identity-mapped first 1 MiB, and `arena_phys`
    /// must be the arena's true physical address.
    pub unsafe fn init<R: InterruptRegistry>(
        arena: &'a mut PagingArena,
        arena_phys: PhysicalAddress,
        memory_map: &BootMemoryMap,
        image: &KernelImage,
        unit: U,
        registry: &mut R,
        fault_handler: FaultHandler,
    ) -> Self {
        let mut this = Self::new(arena, arena_phys, memory_map, unit);
        this.identity_map_low_memory();
        this.map_kernel_image(image);
        registry.register(PAGE_FAULT_VECTOR, fault_handler);
        // SAFETY: forwarded from the caller.
        unsafe { this.activate() };
        this
    }

    /// Steps 1 to 3: link the tables, install the recursive slot and claim
    /// the arena's own frames. Nothing is mapped yet.
    pub fn new(
        arena: &'a mut PagingArena,
        arena_phys: PhysicalAddress,
        memory_map: &BootMemoryMap,
        unit: U,
    ) -> Self {
        debug_assert!(arena_phys.is_aligned(), "arena must be page aligned");
        let PagingArena {
            directory,
            tables,
            frame_words,
            page_words,
        } = arena;

        let frames = FrameAllocator::from_memory_map(frame_words, memory_map);
        page_words.fill(0);
        let pages = BitIndex::new(page_words, ADDRESS_SPACE_PAGES);

        let mut this = Self {
            directory,
            tables,
            pages,
            frames,
            directory_phys: arena_phys,
            unit,
            paging_enabled: false,
            mapped: 0,
        };
        this.link_tables();
        this.install_recursive_slot();
        this.claim_arena();
        this
    }

    #[allow(clippy::cast_possible_truncation)]
    fn link_tables(&mut self) {
        for (slot, table) in self.tables.iter_mut().enumerate() {
            table.clear();
            let dir = DirectoryIndex::new(slot as u16);
            let table_phys = PagingArena::table_phys(self.directory_phys, dir);
            self.directory.set(dir, PageDirectoryEntry::make_table(table_phys));
        }
    }

    fn install_recursive_slot(&mut self) {
        self.directory.set(
            recursive::SLOT,
            PageDirectoryEntry::make_table(self.directory_phys),
        );
        let window = RECURSIVE_SLOT * PAGE_ENTRIES..ADDRESS_SPACE_PAGES;
        self.pages.set_range(window.clone());
        self.frames.reserve(window);
    }

    fn claim_arena(&mut self) {
        for frame in PagingArena::frames(self.directory_phys) {
            self.frames.claim(frame);
        }
    }

    /// Step 4: map every page below 1 MiB to itself.
    pub fn identity_map_low_memory(&mut self) {
        log::info!("Identity mapping 0x00000000..{EARLY_IDENTITY_LIMIT:#010X}");
        for index in 0..EARLY_IDENTITY_LIMIT / PAGE_SIZE {
            let frame = PhysicalPage::from_index(index);
            self.map(VirtualAddress::new(frame.base().as_u32()), frame, MapFlags::KERNEL_RW);
        }
    }

    /// Step 5: map `[image.start, image.end)` to where it was loaded.
    pub fn map_kernel_image(&mut self, image: &KernelImage) {
        log::info!(
            "Mapping kernel image {}..{} to {}",
            image.start,
            image.end,
            image.to_physical(image.start)
        );
        let first = image.start.page().index();
        let last = image.end.as_u32().div_ceil(PAGE_SIZE);
        for index in first..last {
            let page = VirtualPage::from_index(index);
            let frame = image.to_physical(page.base()).page();
            self.map(page.base(), frame, MapFlags::KERNEL_RW);
        }
    }

    /// Step 7: load the directory and enable paging.
    ///
    /// # Safety
    /// See [`init`](Self::init).
    pub unsafe fn activate(&mut self) {
        log::info!("Enabling paging with directory at {}", self.directory_phys);
        // SAFETY: forwarded from the caller.
        unsafe {
            self.unit.load_directory(self.directory_phys);
            self.unit.enable_paging();
        }
        self.paging_enabled = true;
    }

    /// Install `va -> frame`.
    ///
    /// Fatal if `va` is not page aligned or already mapped.
    pub fn map(&mut self, va: VirtualAddress, frame: PhysicalPage, flags: MapFlags) {
        if !va.is_aligned() {
            fatal(MemoryFault::Misaligned(va));
        }
        let (dir, index, _) = split(va);
        let Some(table) = self.tables.get_mut(dir.as_usize()) else {
            fatal(MemoryFault::AlreadyMapped(va));
        };
        if table.get(index).is_present() {
            fatal(MemoryFault::AlreadyMapped(va));
        }
        table.set(index, PageTableEntry::make(frame, flags));

        let page = va.page();
        self.frames.claim(frame);
        self.pages.set(page.index() as usize);
        self.mapped += 1;
        if self.paging_enabled {
            self.unit.invalidate_page(page);
        }
        log::trace!("Mapped {va} -> {}", frame.base());
    }

    /// Remove the mapping of the page containing `va` and release its frame.
    ///
    /// The page is expected to be mapped; unmapping a free page clears its
    /// bit and entry but has no frame to release. Unmapping inside the
    /// recursive window is fatal.
    pub fn unmap(&mut self, va: VirtualAddress) {
        let page = va.page();
        let (dir, index, _) = split(page.base());
        let Some(table) = self.tables.get_mut(dir.as_usize()) else {
            fatal(MemoryFault::ReservedWindow(va));
        };
        let entry = table.get(index);
        table.set(index, PageTableEntry::zero());

        if let Some(frame) = entry.frame() {
            self.frames.release(frame);
            self.mapped -= 1;
            log::trace!("Unmapped {} (was {})", page.base(), frame.base());
        } else {
            log::warn!("Unmapping {} which is not mapped", page.base());
        }
        self.pages.clear(page.index() as usize);
        if self.paging_enabled {
            self.unit.invalidate_page(page);
        }
    }

    /// The page table entry translating `va`.
    ///
    /// Inside the recursive window the directory acts as the page table.
    #[must_use]
    pub fn entry(&self, va: VirtualAddress) -> PageTableEntry {
        let (dir, index, _) = split(va);
        match self.tables.get(dir.as_usize()) {
            Some(table) => table.get(index),
            None => {
                #[allow(clippy::cast_possible_truncation)]
                let slot = DirectoryIndex::new(index.as_usize() as u16);
                PageTableEntry::from_raw(self.directory.get(slot).raw())
            }
        }
    }

    /// Physical address `va` translates to, if mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.entry(va).frame().map(|frame| frame.join(va.offset()))
    }

    #[must_use]
    pub fn is_mapped(&self, va: VirtualAddress) -> bool {
        self.entry(va).is_present()
    }

    /// Whether the virtual page is claimed in the virtual page bitmap.
    #[must_use]
    pub fn is_page_claimed(&self, page: VirtualPage) -> bool {
        self.pages.test(page.index() as usize)
    }

    /// Lowest start of `n` free contiguous virtual pages.
    ///
    /// # Panics
    /// If `n` is zero or above [`BitIndex::MAX_RUN`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn find_free_virtual_run(&self, n: usize) -> Option<VirtualPage> {
        self.pages
            .find_first_clear_run(n)
            .map(|i| VirtualPage::from_index(i as u32))
    }

    /// Lowest free physical frame.
    #[must_use]
    pub fn find_free_physical_frame(&self) -> Option<PhysicalPage> {
        self.frames.next_free()
    }

    #[must_use]
    pub const fn frames(&self) -> &FrameAllocator<'a> {
        &self.frames
    }

    /// Pages currently mapped through this directory.
    #[must_use]
    pub const fn mapped_pages(&self) -> usize {
        self.mapped
    }

    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        self.directory_phys
    }

    #[must_use]
    pub const fn paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    #[must_use]
    pub const fn paging_unit(&self) -> &U {
        &self.unit
    }

    /// Directory entry of slot `dir`.
    #[must_use]
    pub const fn directory_entry(&self, dir: DirectoryIndex) -> PageDirectoryEntry {
        self.directory.get(dir)
    }

    /// Page table behind slot `dir`; `None` for the recursive slot.
    #[must_use]
    pub fn table(&self, dir: DirectoryIndex) -> Option<&PageTable> {
        self.tables.get(dir.as_usize())
    }
}

impl<U: PagingUnit> core::fmt::Debug for VirtualPageDirectory<'_, U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualPageDirectory")
            .field("directory_phys", &self.directory_phys)
            .field("paging_enabled", &self.paging_enabled)
            .field("mapped", &self.mapped)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

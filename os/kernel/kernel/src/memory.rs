//! # Kernel Memory Singleton
//!
//! Owns the paging arena and the one [`PageAllocator`] of the running kernel,
//! and exposes [`get_pages`] / [`free_pages`] to everything else.

use core::mem::MaybeUninit;
use kernel_alloc::{
    InterruptRegistry, KernelImage, PageAllocator, PagingArena, VirtualPageDirectory,
    page_fault_handler,
};
use kernel_info::boot::BootMemoryMap;
use kernel_info::memory::kernel_virt_to_phys;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::{IrqSpinLock, SyncOnceCell};
use kernel_vmem::X86PagingUnit;
use kernel_vmem::recursive::{self, Walk};

unsafe extern "C" {
    static __kernel_start: u8;
    static __kernel_end: u8;
}

/// Directory, tables and bitmaps. Part of `.bss`, so inside the kernel image.
static mut ARENA: MaybeUninit<PagingArena> = MaybeUninit::uninit();

static PAGES: SyncOnceCell<IrqSpinLock<PageAllocator<'static, X86PagingUnit>>> =
    SyncOnceCell::new();

/// Build the kernel's address space, register the page-fault handler and
/// switch paging on.
///
/// # Safety
/// Call once, from the boot CPU, while the boot page directory still maps
/// the kernel image and the memory the boot loader handed over.
pub unsafe fn init(memory_map: &BootMemoryMap, registry: &mut impl InterruptRegistry) {
    // SAFETY: linker-defined symbols; only their addresses are used.
    let image = unsafe {
        KernelImage::new(
            VirtualAddress::from_ptr(&raw const __kernel_start),
            VirtualAddress::from_ptr(&raw const __kernel_end),
        )
    };
    let arena_va = VirtualAddress::from_ptr(&raw const ARENA);
    let arena_phys = PhysicalAddress::new(kernel_virt_to_phys(arena_va.as_u32()));
    log::info!("Paging arena at {arena_va} ({arena_phys}), {} frames", PagingArena::FRAMES);

    // SAFETY: `init` runs once; nothing else touches ARENA.
    let arena = PagingArena::init_zeroed(unsafe { &mut *(&raw mut ARENA) });

    // SAFETY: the image and the boot stack (in .bss) are covered by `image`.
    let directory = unsafe {
        VirtualPageDirectory::init(
            arena,
            arena_phys,
            memory_map,
            &image,
            X86PagingUnit,
            registry,
            page_fault_handler,
        )
    };
    log::info!(
        "Paging enabled: {} pages mapped, {} frames free",
        directory.mapped_pages(),
        directory.frames().free_frames()
    );

    if PAGES.set(IrqSpinLock::new(PageAllocator::new(directory))).is_err() {
        log::error!("Memory subsystem initialized twice");
    }
}

/// Whether [`init`] has completed and the recursive window is live.
pub fn is_active() -> bool {
    PAGES.is_initialized()
}

/// Map `size / 4096 + 1` fresh pages and return the first one's address.
///
/// `None` if the memory subsystem is not up or memory is exhausted.
pub fn get_pages(size: usize) -> Option<VirtualAddress> {
    PAGES.get()?.with_lock(|pages| pages.get_pages(size))
}

/// Unmap the pages returned by [`get_pages`] for the same `size`.
pub fn free_pages(base: VirtualAddress, size: usize) {
    match PAGES.get() {
        Some(pages) => pages.with_lock(|pages| pages.free_pages(base, size)),
        None => log::warn!("free_pages({base}, {size}) before memory init"),
    }
}

/// Translation of `va` as the CPU sees it, read through the recursive window.
pub fn walk(va: VirtualAddress) -> Walk {
    // SAFETY: only called once `is_active`; the window maps the directory
    // and every page table.
    recursive::walk(va, |addr| unsafe { addr.as_mut_ptr::<u32>().read_volatile() })
}

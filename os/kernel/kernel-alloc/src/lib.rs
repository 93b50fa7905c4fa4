//! # Kernel Page Allocation and Virtual Memory Management
//!
//! This crate owns the kernel's single address space: the page directory,
//! every page table, and the two bitmaps recording which physical frames and
//! which virtual pages are in use. The rest of the kernel only ever sees
//! [`PageAllocator::get_pages`] and [`PageAllocator::free_pages`].
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Page Allocator (facade)                │
//! │    • get_pages / free_pages                         │
//! │    • size → page count rounding                     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │            Virtual Page Directory                   │
//! │    • Two-level i386 paging, 4 KiB pages             │
//! │    • Recursive slot 1023                            │
//! │    • Virtual page bitmap                            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • One bit per 4 KiB frame of the 4 GiB space     │
//! │    • Seeded from the boot memory map                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Paging Arena ([`arena`])
//!
//! One page-aligned block holding the directory, 1023 page tables and both
//! bitmaps. Its frames are claimed before anything else is mapped, so the
//! subsystem never hands out its own storage.
//!
//! ### Physical Frame Allocator ([`frame_alloc`])
//!
//! * Frames above installed RAM and frames in reserved regions start claimed
//! * The lowest free frame is always chosen
//! * Every mapped frame is claimed exactly once
//!
//! ### Virtual Page Directory ([`directory`])
//!
//! * Identity maps the first 1 MiB and maps the kernel image in the higher half
//! * Installs the recursive slot, making the directory visible at `0xFFFFF000`
//! * Rejects unaligned or already-present mappings as fatal faults
//! * Invalidates the TLB entry of every page it changes once paging is on
//!
//! ### Page Faults ([`page_fault`])
//!
//! Vector 14 is terminal: the handler reports the faulting address, the
//! instruction pointer and the decoded error code, then halts.
//!
//! ## Error Model
//!
//! * Exhaustion of virtual space or physical memory is an ordinary
//!   [`PageAllocError`]; [`PageAllocator::get_pages`] turns it into `None`.
//! * A broken invariant is a [`MemoryFault`], raised through [`fatal`]. It
//!   is logged at error level and then panics.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::mem::MaybeUninit;
//! use kernel_alloc::{PageAllocator, PagingArena, VirtualPageDirectory};
//! use kernel_info::boot::BootMemoryMap;
//! use kernel_memory_addresses::{PhysicalAddress, VirtualPage};
//! use kernel_vmem::PagingUnit;
//!
//! struct Unit;
//!
//! impl PagingUnit for Unit {
//!     unsafe fn load_directory(&mut self, _: PhysicalAddress) {}
//!     unsafe fn enable_paging(&mut self) {}
//!     fn invalidate_page(&mut self, _: VirtualPage) {}
//! }
//!
//! let mut slot = Box::<PagingArena>::new_uninit();
//! let arena = PagingArena::init_zeroed(&mut slot);
//!
//! let mut map = BootMemoryMap::new();
//! map.set_usable_bytes(16 * 1024 * 1024);
//!
//! let directory = VirtualPageDirectory::new(arena, PhysicalAddress::new(0x40_0000), &map, Unit);
//! let mut pages = PageAllocator::new(directory);
//!
//! let buffer = pages.get_pages(8192).expect("memory available");
//! pages.free_pages(buffer, 8192);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod arena;
pub mod directory;
pub mod fault;
pub mod frame_alloc;
pub mod page_alloc;
pub mod page_fault;

pub use arena::PagingArena;
pub use directory::{KernelImage, VirtualPageDirectory};
pub use fault::{MemoryFault, fatal};
pub use frame_alloc::FrameAllocator;
pub use page_alloc::{PageAllocError, PageAllocator, pages_for};
pub use page_fault::{
    FaultHandler, InterruptRegistry, PAGE_FAULT_VECTOR, PageFault, PageFaultError,
    page_fault_handler,
};

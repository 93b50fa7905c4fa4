//! # Virtual Memory Support (i386)
//!
//! Hardware-defined structures for 32-bit two-level paging.
//!
//! ## What you get
//! - 4 KiB-aligned [`PageDirectory`] and [`PageTable`] wrappers, 1024 entries each.
//! - Typed entries ([`PageDirectoryEntry`], [`PageTableEntry`]) over a shared
//!   [`PageEntryBits`] bitfield.
//! - [`DirectoryIndex`] / [`TableIndex`] and [`split`] for address decomposition.
//! - [`MapFlags`] for the permissions of a new mapping.
//! - The [`recursive`] window addresses.
//! - The [`PagingUnit`] seam to the CPU (CR3, CR0.PG, `invlpg`).
//!
//! ## Virtual Address → Physical Address Walk
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! CR3 holds the physical address of the page directory. The directory entry
//! selected by bits 31‒22 points at a page table; the table entry selected by
//! bits 21‒12 holds the physical frame; bits 11‒0 select the byte inside it.
//!
//! ```text
//!  CR3 → PD[dir] → PT[table] → frame + offset
//! ```
//!
//! One directory entry spans 4 MiB, one table entry 4 KiB.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod entry;
mod index;
mod paging;
pub mod recursive;
mod table;

pub use crate::entry::{MapFlags, PageDirectoryEntry, PageEntryBits, PageTableEntry};
pub use crate::index::{DirectoryIndex, TableIndex, split};
pub use crate::paging::PagingUnit;
#[cfg(target_arch = "x86")]
pub use crate::paging::X86PagingUnit;
pub use crate::table::{PageDirectory, PageTable};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

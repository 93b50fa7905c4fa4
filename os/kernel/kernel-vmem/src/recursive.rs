//! # Recursive Page Directory Window
//!
//! The last directory slot points back at the directory itself. Once paging
//! is on, the CPU then treats the directory as the page table of the last
//! 4 MiB, and every page table becomes visible as an ordinary 4 KiB page:
//!
//! ```text
//! 0xFFC0_0000 + n * 0x1000   page table n
//! 0xFFFF_F000                the page directory
//! ```

use crate::{DirectoryIndex, PageDirectoryEntry, PageTableEntry, TableIndex};
use core::fmt;
use kernel_info::memory::{RECURSIVE_BASE, RECURSIVE_DIRECTORY, RECURSIVE_SLOT};
use kernel_memory_addresses::VirtualAddress;

/// Directory slot holding the self-reference.
#[allow(clippy::cast_possible_truncation)]
pub const SLOT: DirectoryIndex = DirectoryIndex::new(RECURSIVE_SLOT as u16);

/// Where the page directory is visible.
#[inline]
#[must_use]
pub const fn directory_address() -> VirtualAddress {
    VirtualAddress::new(RECURSIVE_DIRECTORY)
}

/// Where the page table behind directory slot `dir` is visible.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn table_address(dir: DirectoryIndex) -> VirtualAddress {
    VirtualAddress::new(RECURSIVE_BASE + (dir.as_usize() as u32) * 0x1000)
}

/// Where the page table entry translating `va` is visible.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn entry_address(va: VirtualAddress) -> VirtualAddress {
    let dir = DirectoryIndex::from(va);
    let table = TableIndex::from(va);
    VirtualAddress::new(table_address(dir).as_u32() + (table.as_usize() as u32) * 4)
}

/// Where the directory entry for slot `dir` is visible.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn directory_entry_address(dir: DirectoryIndex) -> VirtualAddress {
    VirtualAddress::new(RECURSIVE_DIRECTORY + (dir.as_usize() as u32) * 4)
}

/// Both levels of the translation of one address, as seen through the window.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Walk {
    pub va: VirtualAddress,
    pub dir: DirectoryIndex,
    pub table: TableIndex,
    pub pde: PageDirectoryEntry,
    /// `None` when the directory entry is not present.
    pub pte: Option<PageTableEntry>,
}

/// Walk the translation of `va`, reading entries through `read`.
///
/// `read` receives a window address and returns the 32-bit word stored
/// there. The table entry is only read when the directory entry is present.
pub fn walk(va: VirtualAddress, mut read: impl FnMut(VirtualAddress) -> u32) -> Walk {
    let dir = DirectoryIndex::from(va);
    let table = TableIndex::from(va);
    let pde = PageDirectoryEntry::from_raw(read(directory_entry_address(dir)));
    let pte = pde
        .is_present()
        .then(|| PageTableEntry::from_raw(read(entry_address(va))));
    Walk {
        va,
        dir,
        table,
        pde,
        pte,
    }
}

impl fmt::Display for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.pde.flags();
        writeln!(
            f,
            "PD[{:4}]={:#010X} P={} RW={} US={}",
            self.dir.as_usize(),
            self.pde.raw(),
            u8::from(flags.present()),
            u8::from(flags.writable()),
            u8::from(flags.user_access())
        )?;
        match self.pte {
            None => write!(f, "PT[----] (no table)"),
            Some(pte) => {
                let flags = pte.flags();
                write!(
                    f,
                    "PT[{:4}]={:#010X} P={} RW={} US={} A={} D={}",
                    self.table.as_usize(),
                    pte.raw(),
                    u8::from(flags.present()),
                    u8::from(flags.writable()),
                    u8::from(flags.user_access()),
                    u8::from(flags.accessed()),
                    u8::from(flags.dirty())
                )
            }
        }
    }
}

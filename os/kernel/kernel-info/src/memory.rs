//! # Memory Layout (i386)
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Identity mapped low memory     │ BIOS data, VGA, boot stack
//! 0x0010_0000 ├─────────────────────────────────┤ EARLY_IDENTITY_LIMIT / PHYS_LOAD
//!             │  Free virtual space             │
//! 0xC000_0000 ├─────────────────────────────────┤ KERNEL_BASE
//!             │  Kernel image (higher half)     │ VA = PA + KERNEL_BASE
//!             │  Free virtual space             │
//! 0xFFC0_0000 ├─────────────────────────────────┤ RECURSIVE_BASE
//!             │  Page tables via recursive slot │
//! 0xFFFF_F000 │  Page directory itself          │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```

/// Size of a page and of a physical frame.
pub const PAGE_SIZE: u32 = 4096;

/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 12;

/// Entries in a page directory and in a page table.
pub const PAGE_ENTRIES: usize = 1024;

/// Number of 4 KiB pages (and frames) in the 32-bit address space.
pub const ADDRESS_SPACE_PAGES: usize = PAGE_ENTRIES * PAGE_ENTRIES;

/// Where the kernel executes (VMA), matches the linker script.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const KERNEL_BASE: u32 = 0xC000_0000;

/// Where the kernel image is placed in *physical* memory (LMA).
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const PHYS_LOAD: u32 = 0x0010_0000; // 1 MiB

/// Everything below this physical address is identity mapped.
pub const EARLY_IDENTITY_LIMIT: u32 = 0x0010_0000; // 1 MiB

/// Page directory slot that maps the directory onto itself.
pub const RECURSIVE_SLOT: usize = PAGE_ENTRIES - 1;

/// First virtual address of the recursive window; page table `n` is visible
/// at `RECURSIVE_BASE + n * PAGE_SIZE`.
pub const RECURSIVE_BASE: u32 = 0xFFC0_0000;

/// Virtual address of the page directory once paging is on.
pub const RECURSIVE_DIRECTORY: u32 = 0xFFFF_F000;

/// Longest contiguous run of pages a single allocation can request.
pub const MAX_RUN_PAGES: usize = 32;

/// Size of the kernel's boot stack.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Translate a higher-half kernel address into its load address.
#[inline]
#[must_use]
pub const fn kernel_virt_to_phys(va: u32) -> u32 {
    va - KERNEL_BASE
}

const _: () = {
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(KERNEL_STACK_SIZE.is_multiple_of(PAGE_SIZE as usize));
    assert!(KERNEL_BASE.is_multiple_of(4 * 1024 * 1024));
    assert!(RECURSIVE_BASE as usize == RECURSIVE_SLOT << 22);
    assert!(RECURSIVE_DIRECTORY == RECURSIVE_BASE + (RECURSIVE_SLOT as u32) * PAGE_SIZE);
    assert!(PHYS_LOAD >= EARLY_IDENTITY_LIMIT);
    assert!(MAX_RUN_PAGES <= u32::BITS as usize);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_addresses_translate_by_fixed_offset() {
        assert_eq!(kernel_virt_to_phys(0xC010_0000), PHYS_LOAD);
        assert_eq!(kernel_virt_to_phys(KERNEL_BASE), 0);
    }

    #[test]
    fn recursive_window_is_last_four_mib() {
        assert_eq!(u32::MAX - RECURSIVE_BASE + 1, 4 * 1024 * 1024);
        assert_eq!(ADDRESS_SPACE_PAGES, 1 << 20);
    }
}

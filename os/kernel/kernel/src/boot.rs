//! # Multiboot (v1) Hand-off
//!
//! The boot loader leaves a magic value in `EAX` and the physical address of
//! a [`MultibootInfo`] in `EBX`. The memory subsystem only needs the memory
//! map out of it.

use bitfield_struct::bitfield;
use kernel_alloc::{MemoryFault, fatal};
use kernel_info::boot::BootMemoryMap;

/// Value in `EAX` when a multiboot-compliant loader started us.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Magic in the kernel's multiboot header.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Header flags: page-align modules, provide the memory map.
pub const MULTIBOOT_HEADER_FLAGS: u32 = 0b11;

/// Which [`MultibootInfo`] fields are valid.
#[bitfield(u32)]
pub struct MultibootFlags {
    /// `mem_lower` / `mem_upper` are valid.
    pub mem: bool,
    pub boot_device: bool,
    pub cmdline: bool,
    pub mods: bool,
    pub aout_syms: bool,
    pub elf_shdr: bool,
    /// `mmap_length` / `mmap_addr` are valid.
    pub mmap: bool,
    #[bits(25)]
    __: u32,
}

/// Leading part of the multiboot information structure.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct MultibootInfo {
    pub flags: MultibootFlags,
    /// KiB of memory below 1 MiB.
    pub mem_lower: u32,
    /// KiB of memory above 1 MiB.
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
}

impl MultibootInfo {
    /// Build the boot memory map from this structure and the bytes at
    /// `mmap_addr`.
    ///
    /// Fatal if the loader reported neither a memory map nor basic memory
    /// sizes.
    #[must_use]
    pub fn memory_map(&self, mmap: &[u8]) -> BootMemoryMap {
        let (lower, upper) = if self.flags.mem() {
            (self.mem_lower, self.mem_upper)
        } else {
            (0, 0)
        };
        let mmap = if self.flags.mmap() { mmap } else { &[] };

        let map = BootMemoryMap::from_multiboot(mmap, lower, upper);
        if map.dropped_regions() > 0 {
            log::warn!(
                "Boot memory map is full; {} regions left claimed",
                map.dropped_regions()
            );
        }
        if map.is_empty() {
            fatal(MemoryFault::MissingMemoryMap);
        }
        log::info!(
            "Boot memory map: {} regions, {} KiB usable",
            map.regions().len(),
            map.usable_bytes() / 1024
        );
        map
    }
}

/// Read the loader's hand-off.
///
/// # Safety
/// `info` must be the physical address passed in `EBX`, and it and the
/// memory map it points to must be readable at that address.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub unsafe fn read_memory_map(magic: u32, info: u32) -> BootMemoryMap {
    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        log::error!("Bad multiboot magic {magic:#010X}");
        fatal(MemoryFault::MissingMemoryMap);
    }
    // SAFETY: forwarded from the caller.
    let info = unsafe { &*(info as usize as *const MultibootInfo) };
    let mmap = if info.flags.mmap() {
        // SAFETY: forwarded from the caller.
        unsafe {
            core::slice::from_raw_parts(
                info.mmap_addr as usize as *const u8,
                info.mmap_length as usize,
            )
        }
    } else {
        &[]
    };
    info.memory_map(mmap)
}

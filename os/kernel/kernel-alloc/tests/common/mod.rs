#![allow(dead_code)]

use kernel_alloc::{
    FaultHandler, InterruptRegistry, KernelImage, PagingArena, VirtualPageDirectory,
    page_fault_handler,
};
use kernel_info::boot::{BootMemoryMap, MemoryRegion, MemoryRegionKind};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress, VirtualPage};
use kernel_vmem::PagingUnit;

pub const MIB: u64 = 1024 * 1024;

/// Where the tests pretend the arena was loaded.
pub const ARENA_PHYS: PhysicalAddress = PhysicalAddress::new(0x0040_0000);

/// Paging unit that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingUnit {
    pub loaded: Option<PhysicalAddress>,
    pub enable_calls: usize,
    pub invalidated: Vec<VirtualPage>,
}

impl PagingUnit for RecordingUnit {
    unsafe fn load_directory(&mut self, directory: PhysicalAddress) {
        self.loaded = Some(directory);
    }

    unsafe fn enable_paging(&mut self) {
        self.enable_calls += 1;
    }

    fn invalidate_page(&mut self, page: VirtualPage) {
        self.invalidated.push(page);
    }
}

#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pub vectors: Vec<u8>,
}

impl InterruptRegistry for RecordingRegistry {
    fn register(&mut self, vector: u8, _handler: FaultHandler) {
        self.vectors.push(vector);
    }
}

/// A zeroed arena that lives for the rest of the test binary.
pub fn arena() -> &'static mut PagingArena {
    PagingArena::init_zeroed(Box::leak(Box::<PagingArena>::new_uninit()))
}

/// 16 MiB machine: conventional memory, the BIOS hole, extended memory.
pub fn memory_map_16m() -> BootMemoryMap {
    let mut map = BootMemoryMap::new();
    map.push(MemoryRegion::new(0, 0x9_FC00, MemoryRegionKind::Available))
        .unwrap();
    map.push(MemoryRegion::new(0x9_FC00, 0x6_0400, MemoryRegionKind::Reserved))
        .unwrap();
    map.push(MemoryRegion::new(0x10_0000, 15 * MIB, MemoryRegionKind::Available))
        .unwrap();
    map
}

/// A one-page kernel linked at `0xC010_0000`, loaded at 1 MiB.
pub fn kernel_image() -> KernelImage {
    KernelImage::new(VirtualAddress::new(0xC010_0000), VirtualAddress::new(0xC010_1000))
}

/// Fully initialized directory on the 16 MiB machine.
pub fn booted() -> VirtualPageDirectory<'static, RecordingUnit> {
    booted_with(&mut RecordingRegistry::default())
}

pub fn booted_with(
    registry: &mut RecordingRegistry,
) -> VirtualPageDirectory<'static, RecordingUnit> {
    unsafe {
        VirtualPageDirectory::init(
            arena(),
            ARENA_PHYS,
            &memory_map_16m(),
            &kernel_image(),
            RecordingUnit::default(),
            registry,
            page_fault_handler,
        )
    }
}

pub const fn va(v: u32) -> VirtualAddress {
    VirtualAddress::new(v)
}

pub const fn pa(v: u32) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

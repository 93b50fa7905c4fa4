mod common;

use common::*;
use kernel_alloc::{PAGE_FAULT_VECTOR, PagingArena, VirtualPageDirectory};
use kernel_info::boot::{BootMemoryMap, MemoryRegion, MemoryRegionKind};
use kernel_memory_addresses::{PhysicalPage, VirtualPage};
use kernel_vmem::{DirectoryIndex, MapFlags, recursive};

#[test]
fn init_loads_directory_and_enables_paging() {
    let vpd = booted();
    assert!(vpd.paging_enabled());
    assert_eq!(vpd.paging_unit().loaded, Some(ARENA_PHYS));
    assert_eq!(vpd.paging_unit().enable_calls, 1);
    assert_eq!(vpd.directory_phys(), ARENA_PHYS);
}

#[test]
fn init_registers_page_fault_handler() {
    let mut registry = RecordingRegistry::default();
    let _vpd = booted_with(&mut registry);
    assert_eq!(registry.vectors, vec![PAGE_FAULT_VECTOR]);
    assert_eq!(PAGE_FAULT_VECTOR, 14);
}

#[test]
fn low_memory_is_identity_mapped() {
    let vpd = booted();
    assert_eq!(vpd.translate(va(0)), Some(pa(0)));
    assert_eq!(vpd.translate(va(0xB_8000)), Some(pa(0xB_8000)));
    assert_eq!(vpd.translate(va(0xF_FFFF)), Some(pa(0xF_FFFF)));
    assert!(!vpd.is_mapped(va(0x10_0000)));
}

#[test]
fn kernel_image_is_mapped_in_the_higher_half() {
    let vpd = booted();
    assert_eq!(vpd.translate(va(0xC010_0123)), Some(pa(0x10_0123)));
    assert!(!vpd.is_mapped(va(0xC010_1000)));
    assert!(vpd.frames().is_claimed(PhysicalPage::from_index(0x100)));
}

#[test]
fn recursive_slot_points_at_directory() {
    let vpd = booted();
    let slot = vpd.directory_entry(DirectoryIndex::new(1023));
    assert_eq!(slot.table(), Some(ARENA_PHYS));
    assert_eq!(slot, vpd.directory_entry(recursive::SLOT));

    // The directory sees itself as the last page of the window.
    assert_eq!(vpd.translate(va(0xFFFF_F000)), Some(ARENA_PHYS));
    // Page table 0 is the first page of the window.
    assert_eq!(
        vpd.translate(va(0xFFC0_0000)),
        vpd.directory_entry(DirectoryIndex::new(0)).table()
    );
    assert!(vpd.table(DirectoryIndex::new(1023)).is_none());
}

#[test]
fn recursive_window_is_claimed() {
    let vpd = booted();
    assert!(vpd.is_page_claimed(VirtualPage::from_index(1023 * 1024)));
    assert!(vpd.is_page_claimed(VirtualPage::from_index((1 << 20) - 1)));
    assert!(!vpd.is_page_claimed(VirtualPage::from_index(1023 * 1024 - 1)));
}

#[test]
fn recursive_window_frames_are_claimed_even_when_installed() {
    let mut map = BootMemoryMap::new();
    map.push(MemoryRegion::new(0, 0x9_FC00, MemoryRegionKind::Available))
        .unwrap();
    map.push(MemoryRegion::new(0x10_0000, 0xFFF0_0000, MemoryRegionKind::Available))
        .unwrap();

    let vpd = VirtualPageDirectory::new(arena(), ARENA_PHYS, &map, RecordingUnit::default());
    assert_eq!(vpd.frames().installed_frames(), 1 << 20);
    assert!(vpd.frames().is_claimed(PhysicalPage::from_index(0xFFC00)));
    assert!(vpd.frames().is_claimed(PhysicalPage::from_index(0xFFFFF)));
    assert!(!vpd.frames().is_claimed(PhysicalPage::from_index(0xFFBFF)));
    assert!(vpd.is_page_claimed(VirtualPage::from_index(0xFFC00)));
}

#[test]
fn arena_frames_are_claimed() {
    let vpd = booted();
    let first = ARENA_PHYS.page().index();
    let count = u32::try_from(PagingArena::FRAMES).unwrap();
    assert!(vpd.frames().is_claimed(PhysicalPage::from_index(first)));
    assert!(vpd.frames().is_claimed(PhysicalPage::from_index(first + count - 1)));
    assert!(!vpd.frames().is_claimed(PhysicalPage::from_index(first + count)));
}

#[test]
fn accounting_after_boot() {
    let vpd = booted();
    // 256 identity pages and one kernel page.
    assert_eq!(vpd.mapped_pages(), 257);
    assert_eq!(vpd.frames().installed_frames(), 4096);
    // 159 conventional + 3840 extended frames, less the low 1 MiB that is
    // now mapped, the arena and the kernel page.
    assert_eq!(vpd.frames().free_frames(), 3840 - PagingArena::FRAMES - 1);
}

#[test]
fn page_tables_live_in_the_arena() {
    let vpd = booted();
    let table0 = vpd.directory_entry(DirectoryIndex::new(0)).table().unwrap();
    let table1 = vpd.directory_entry(DirectoryIndex::new(1)).table().unwrap();
    assert_eq!(table0, pa(0x0040_1000));
    assert_eq!(table1, pa(0x0040_2000));
}

#[test]
#[should_panic(expected = "virtual address 0x00001000 is already mapped")]
fn remapping_identity_range_is_fatal() {
    let mut vpd = booted();
    vpd.map(va(0x1000), PhysicalPage::from_index(0x900), MapFlags::KERNEL_RW);
}

#[test]
#[should_panic(expected = "virtual address 0xC0100000 is already mapped")]
fn remapping_kernel_page_is_fatal() {
    let mut vpd = booted();
    vpd.map(va(0xC010_0000), PhysicalPage::from_index(0x900), MapFlags::KERNEL_RW);
}

#[test]
#[should_panic(expected = "cannot map unaligned virtual address 0x00800010")]
fn unaligned_map_is_fatal() {
    let mut vpd = booted();
    vpd.map(va(0x0080_0010), PhysicalPage::from_index(0x900), MapFlags::KERNEL_RW);
}

#[test]
#[should_panic(expected = "is already mapped")]
fn mapping_into_recursive_window_is_fatal() {
    let mut vpd = booted();
    vpd.map(va(0xFFC0_0000), PhysicalPage::from_index(0x900), MapFlags::KERNEL_RW);
}

#[test]
fn unused_address_accepts_a_mapping() {
    let mut vpd = booted();
    let frame = PhysicalPage::from_index(0x900);
    vpd.map(va(0x0080_0000), frame, MapFlags::KERNEL_RW);

    assert_eq!(vpd.translate(va(0x0080_0042)), Some(pa(0x0090_0042)));
    assert!(vpd.frames().is_claimed(frame));
    assert!(vpd.is_page_claimed(va(0x0080_0000).page()));
    assert_eq!(vpd.paging_unit().invalidated.last(), Some(&va(0x0080_0000).page()));

    let entry = vpd.entry(va(0x0080_0000));
    assert!(entry.flags().writable());
    assert!(!entry.flags().user_access());
}

#[test]
fn unmap_releases_frame_and_page() {
    let mut vpd = booted();
    let frame = PhysicalPage::from_index(0x900);
    let before = vpd.frames().free_frames();
    vpd.map(va(0x0080_0000), frame, MapFlags::KERNEL_RW);
    vpd.unmap(va(0x0080_0123));

    assert!(!vpd.is_mapped(va(0x0080_0000)));
    assert!(!vpd.frames().is_claimed(frame));
    assert!(!vpd.is_page_claimed(va(0x0080_0000).page()));
    assert_eq!(vpd.frames().free_frames(), before);
    assert_eq!(vpd.paging_unit().invalidated.len(), 2);
}

#[test]
#[should_panic(expected = "recursive page directory window")]
fn unmapping_recursive_window_is_fatal() {
    let mut vpd = booted();
    vpd.unmap(va(0xFFFF_F000));
}

#[test]
fn no_invalidation_before_paging_is_enabled() {
    let mut vpd =
        VirtualPageDirectory::new(arena(), ARENA_PHYS, &memory_map_16m(), RecordingUnit::default());
    vpd.identity_map_low_memory();
    vpd.map_kernel_image(&kernel_image());
    vpd.map(va(0x0080_0000), PhysicalPage::from_index(0x900), MapFlags::KERNEL_RW);
    vpd.unmap(va(0x0080_0000));
    assert!(!vpd.paging_enabled());
    assert!(vpd.paging_unit().invalidated.is_empty());
    assert_eq!(vpd.paging_unit().loaded, None);
}

#[test]
#[should_panic(expected = "no boot memory map")]
fn missing_memory_map_is_fatal() {
    let _vpd = VirtualPageDirectory::new(
        arena(),
        ARENA_PHYS,
        &BootMemoryMap::new(),
        RecordingUnit::default(),
    );
}

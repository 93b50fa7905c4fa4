mod common;

use common::*;
use kernel_alloc::{PageAllocError, PageAllocator, PagingArena, VirtualPageDirectory};
use kernel_info::boot::BootMemoryMap;
use kernel_memory_addresses::VirtualAddress;

fn allocator() -> PageAllocator<'static, RecordingUnit> {
    PageAllocator::new(booted())
}

#[test]
fn first_allocation_lands_above_low_memory() {
    let mut pages = allocator();
    let base = pages.get_pages(0).unwrap();
    assert_eq!(base, va(0x10_0000));
    // Frames below 1 MiB are mapped, 0x100000 holds the kernel.
    assert_eq!(pages.directory().translate(base), Some(pa(0x10_1000)));
}

#[test]
fn page_count_rounding() {
    let mut pages = allocator();
    for (size, expected) in [(0, 1), (4095, 1), (4096, 2), (4097, 2), (8192, 3)] {
        let before = pages.directory().mapped_pages();
        let base = pages.get_pages(size).unwrap();
        assert_eq!(pages.directory().mapped_pages() - before, expected, "size {size}");
        pages.free_pages(base, size);
        assert_eq!(pages.directory().mapped_pages(), before);
    }
}

#[test]
fn consecutive_allocations_are_adjacent() {
    let mut pages = allocator();
    let a = pages.get_pages(4096).unwrap();
    let b = pages.get_pages(0).unwrap();
    assert_eq!(b.as_u32(), a.as_u32() + 2 * 4096);
}

#[test]
fn every_page_is_mapped_and_aligned() {
    let mut pages = allocator();
    let base = pages.get_pages(3 * 4096).unwrap();
    assert!(base.is_aligned());
    for i in 0..4 {
        assert!(pages.directory().is_mapped(va(base.as_u32() + i * 4096)));
    }
    assert!(!pages.directory().is_mapped(va(base.as_u32() + 4 * 4096)));
}

#[test]
fn allocate_then_free_restores_state() {
    let mut pages = allocator();
    let free = pages.directory().frames().free_frames();
    let mapped = pages.directory().mapped_pages();

    let base = pages.get_pages(8192).unwrap();
    assert_eq!(pages.directory().frames().free_frames(), free - 3);
    pages.free_pages(base, 8192);

    assert_eq!(pages.directory().frames().free_frames(), free);
    assert_eq!(pages.directory().mapped_pages(), mapped);
    for i in 0..3 {
        let page = va(base.as_u32() + i * 4096);
        assert!(!pages.directory().is_mapped(page));
        assert!(!pages.directory().is_page_claimed(page.page()));
    }
    assert_eq!(pages.get_pages(8192), Some(base));
}

#[test]
fn freed_pages_are_invalidated() {
    let mut pages = allocator();
    let base = pages.get_pages(0).unwrap();
    pages.free_pages(base, 0);
    let invalidated = &pages.directory().paging_unit().invalidated;
    assert_eq!(invalidated.last(), Some(&base.page()));
}

#[test]
fn oversized_request_is_rejected() {
    let mut pages = allocator();
    let mapped = pages.directory().mapped_pages();
    assert_eq!(
        pages.try_get_pages(32 * 4096),
        Err(PageAllocError::RequestTooLarge { pages: 33, max: 32 })
    );
    assert_eq!(pages.get_pages(32 * 4096), None);
    assert_eq!(pages.directory().mapped_pages(), mapped);

    let base = pages.get_pages(31 * 4096).unwrap();
    assert_eq!(pages.directory().mapped_pages(), mapped + 32);
    pages.free_pages(base, 31 * 4096);
}

#[test]
fn physical_exhaustion_keeps_partial_mappings() {
    // Three frames beyond the arena, nothing else mapped.
    let mut map = BootMemoryMap::new();
    let frames = PagingArena::FRAMES as u64 + 3;
    map.set_usable_bytes(frames * 4096);
    let directory = VirtualPageDirectory::new(arena(), pa(0), &map, RecordingUnit::default());
    let mut pages = PageAllocator::new(directory);

    assert_eq!(
        pages.try_get_pages(4 * 4096),
        Err(PageAllocError::OutOfPhysicalMemory {
            base: VirtualAddress::zero(),
            mapped: 3,
        })
    );
    assert_eq!(pages.directory().mapped_pages(), 3);
    assert_eq!(pages.directory().frames().free_frames(), 0);
    for i in 0..3 {
        assert!(pages.directory().is_mapped(va(i * 4096)));
    }
    assert!(!pages.directory().is_mapped(va(3 * 4096)));

    assert_eq!(pages.get_pages(0), None);
}

#[test]
fn error_messages() {
    let err = PageAllocError::OutOfPhysicalMemory {
        base: va(0x10_0000),
        mapped: 2,
    };
    assert_eq!(
        err.to_string(),
        "physical memory exhausted after mapping 2 pages at 0x00100000"
    );
    assert_eq!(
        PageAllocError::OutOfVirtualSpace { pages: 4 }.to_string(),
        "no run of 4 free virtual pages"
    );
}

//! Physical frame allocator.
//!
//! One bit per 4 KiB frame of the 32-bit physical address space. A set bit
//! means the frame is claimed: either it backs exactly one mapping, or it
//! does not exist / must not be used (above installed RAM, firmware reserved).

use crate::fault::{MemoryFault, fatal};
use core::ops::Range;
use kernel_bitmap::BitIndex;
use kernel_info::boot::BootMemoryMap;
use kernel_info::memory::{ADDRESS_SPACE_PAGES, PAGE_SIZE};
use kernel_memory_addresses::PhysicalPage;

/// Bitmap-backed allocator of single physical frames.
pub struct FrameAllocator<'a> {
    bits: BitIndex<'a>,
    installed: usize,
}

impl<'a> FrameAllocator<'a> {
    /// Allocator over `words` where frames `0..installed` are free and
    /// everything above is claimed.
    ///
    /// # Panics
    /// If `words` cannot cover the 32-bit physical address space.
    pub fn new(words: &'a mut [u32], installed: usize) -> Self {
        let installed = installed.min(ADDRESS_SPACE_PAGES);
        words.fill(0);
        let mut bits = BitIndex::new(words, ADDRESS_SPACE_PAGES);
        bits.set_range(installed..ADDRESS_SPACE_PAGES);
        Self { bits, installed }
    }

    /// Allocator sized from the boot memory map.
    ///
    /// Only whole frames inside available regions start out free. Frames
    /// touched by a reserved region, frames in holes of the map and frames
    /// above the top of installed RAM start out claimed. A map without
    /// regions falls back to the reported usable size, counted from zero.
    ///
    /// A map with neither is fatal.
    pub fn from_memory_map(words: &'a mut [u32], map: &BootMemoryMap) -> Self {
        if map.is_empty() {
            fatal(MemoryFault::MissingMemoryMap);
        }

        let installed = map.installed_frames();
        if map.regions().is_empty() {
            return Self::new(words, installed);
        }

        words.fill(0);
        let mut bits = BitIndex::new(words, ADDRESS_SPACE_PAGES);
        bits.set_range(0..ADDRESS_SPACE_PAGES);

        let usable = map.regions().iter().filter(|r| r.kind.is_usable());
        for region in usable {
            bits.clear_range(inner_frames(region.base, region.end(), installed));
        }
        let reserved = map.regions().iter().filter(|r| !r.kind.is_usable());
        for region in reserved {
            let frames = region.frames();
            bits.set_range(frames.start.min(installed)..frames.end.min(installed));
        }

        let this = Self { bits, installed };
        log::info!(
            "Frame allocator: {} of {} installed frames free",
            this.free_frames(),
            this.installed
        );
        this
    }

    /// Frames from zero to the top of installed RAM.
    #[inline]
    #[must_use]
    pub const fn installed_frames(&self) -> usize {
        self.installed
    }

    /// Lowest free frame, without claiming it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_free(&self) -> Option<PhysicalPage> {
        self.bits
            .find_first_clear()
            .map(|i| PhysicalPage::from_index(i as u32))
    }

    /// Claim the lowest free frame. `None` once physical memory is exhausted.
    pub fn claim_next_free(&mut self) -> Option<PhysicalPage> {
        let frame = self.next_free()?;
        self.claim(frame);
        Some(frame)
    }

    /// Mark `frame` claimed.
    #[inline]
    pub fn claim(&mut self, frame: PhysicalPage) {
        self.bits.set(frame.index() as usize);
    }

    /// Mark every frame in `frames` claimed.
    pub fn reserve(&mut self, frames: Range<usize>) {
        self.bits.set_range(frames);
    }

    /// Return `frame` to the pool.
    ///
    /// The frame must have been claimed; releasing a free frame is a caller bug.
    pub fn release(&mut self, frame: PhysicalPage) {
        let index = frame.index() as usize;
        if cfg!(debug_assertions) && !self.bits.test(index) {
            log::warn!("Releasing {frame}, which is not claimed");
        }
        self.bits.clear(index);
    }

    #[inline]
    #[must_use]
    pub fn is_claimed(&self, frame: PhysicalPage) -> bool {
        self.bits.test(frame.index() as usize)
    }

    /// Frames that can still be claimed.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.bits.capacity() - self.bits.count_set()
    }

    /// Claimed frames below the top of installed RAM.
    #[must_use]
    pub fn claimed_frames(&self) -> usize {
        self.installed - self.free_frames()
    }
}

impl core::fmt::Debug for FrameAllocator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameAllocator")
            .field("installed", &self.installed)
            .field("free", &self.free_frames())
            .finish()
    }
}

/// Frames lying entirely inside `[start, end)`, capped at `limit`.
#[allow(clippy::cast_possible_truncation)]
fn inner_frames(start: u64, end: u64, limit: usize) -> Range<usize> {
    let page = u64::from(PAGE_SIZE);
    let first = start.div_ceil(page).min(limit as u64) as usize;
    let last = (end / page).min(limit as u64) as usize;
    first..last.max(first)
}

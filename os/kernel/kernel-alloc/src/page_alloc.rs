//! The allocation facade: the only memory API the rest of the kernel uses.

use crate::directory::VirtualPageDirectory;
use kernel_bitmap::BitIndex;
use kernel_info::memory::{MAX_RUN_PAGES, PAGE_SIZE};
use kernel_memory_addresses::{VirtualAddress, VirtualPage};
use kernel_vmem::{MapFlags, PagingUnit};

/// Why [`PageAllocator::try_get_pages`] returned nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageAllocError {
    #[error("request of {pages} pages exceeds the {max}-page run limit")]
    RequestTooLarge { pages: usize, max: usize },
    #[error("no run of {pages} free virtual pages")]
    OutOfVirtualSpace { pages: usize },
    #[error("physical memory exhausted after mapping {mapped} pages at {base}")]
    OutOfPhysicalMemory { base: VirtualAddress, mapped: usize },
}

/// Pages reserved for a request of `size` bytes.
///
/// Always one more than `size / PAGE_SIZE`, so an exact multiple of the page
/// size gets an extra page of slack. Callers rely on that slack.
#[inline]
#[must_use]
pub const fn pages_for(size: usize) -> usize {
    size / PAGE_SIZE as usize + 1
}

const _: () = assert!(MAX_RUN_PAGES == BitIndex::MAX_RUN);

/// Hands out freshly mapped, page-aligned kernel memory.
#[derive(Debug)]
pub struct PageAllocator<'a, U: PagingUnit> {
    directory: VirtualPageDirectory<'a, U>,
}

impl<'a, U: PagingUnit> PageAllocator<'a, U> {
    #[must_use]
    pub const fn new(directory: VirtualPageDirectory<'a, U>) -> Self {
        Self { directory }
    }

    /// Map [`pages_for(size)`](pages_for) contiguous virtual pages, each
    /// backed by its own frame, and return the first page's address.
    #[must_use]
    pub fn get_pages(&mut self, size: usize) -> Option<VirtualAddress> {
        self.try_get_pages(size).ok()
    }

    /// Like [`get_pages`](Self::get_pages), with the reason for failure.
    ///
    /// Frames need not be contiguous. If frames run out partway, the pages
    /// mapped so far stay mapped and claimed; the error says how many.
    ///
    /// # Errors
    /// See [`PageAllocError`].
    pub fn try_get_pages(&mut self, size: usize) -> Result<VirtualAddress, PageAllocError> {
        let pages = pages_for(size);
        log::debug!("get_pages({size}) -> {pages} pages");
        if pages > MAX_RUN_PAGES {
            log::warn!("Refusing {pages}-page request, limit is {MAX_RUN_PAGES}");
            return Err(PageAllocError::RequestTooLarge {
                pages,
                max: MAX_RUN_PAGES,
            });
        }

        let Some(run) = self.directory.find_free_virtual_run(pages) else {
            log::warn!("No {pages} contiguous free virtual pages");
            return Err(PageAllocError::OutOfVirtualSpace { pages });
        };

        let base = run.base();
        for (mapped, page) in run_pages(run, pages).enumerate() {
            let Some(frame) = self.directory.find_free_physical_frame() else {
                log::warn!("Out of physical memory; {mapped} pages at {base} stay mapped");
                return Err(PageAllocError::OutOfPhysicalMemory { base, mapped });
            };
            self.directory.map(page.base(), frame, MapFlags::KERNEL_RW);
        }
        Ok(base)
    }

    /// Unmap [`pages_for(size)`](pages_for) pages starting at `base` and
    /// release their frames.
    ///
    /// `base` and `size` must be exactly what was passed to and returned by
    /// [`get_pages`](Self::get_pages).
    pub fn free_pages(&mut self, base: VirtualAddress, size: usize) {
        let pages = pages_for(size);
        log::debug!("free_pages({base}, {size}) -> {pages} pages");
        for page in run_pages(base.page(), pages) {
            self.directory.unmap(page.base());
        }
    }

    #[must_use]
    pub const fn directory(&self) -> &VirtualPageDirectory<'a, U> {
        &self.directory
    }
}

#[allow(clippy::cast_possible_truncation)]
fn run_pages(first: VirtualPage, count: usize) -> impl Iterator<Item = VirtualPage> {
    let start = first.index();
    (start..start + count as u32).map(VirtualPage::from_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_always_adds_a_page() {
        assert_eq!(pages_for(0), 1);
        assert_eq!(pages_for(1), 1);
        assert_eq!(pages_for(4095), 1);
        assert_eq!(pages_for(4096), 2);
        assert_eq!(pages_for(4097), 2);
        assert_eq!(pages_for(8192), 3);
    }
}

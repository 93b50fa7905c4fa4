use crate::OFFSET_MASK;

/// Byte offset within a 4 KiB page (`0..4096`).
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset(u32);

impl PageOffset {
    /// Offset `value`, which must be below the page size; higher bits are
    /// dropped in release builds.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        debug_assert!(value <= OFFSET_MASK, "offset must be < page size");
        Self(value & OFFSET_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

use crate::{OFFSET_MASK, PAGE_SHIFT, PageOffset, PhysicalPage, VirtualPage};
use core::fmt;

macro_rules! address {
    ($(#[$meta:meta])* $name:ident, $page:ident, $tag:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            #[inline]
            #[must_use]
            pub const fn zero() -> Self {
                Self(0)
            }

            #[inline]
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0
            }

            /// The page containing this address.
            #[inline]
            #[must_use]
            pub const fn page(self) -> $page {
                $page::from_index(self.0 >> PAGE_SHIFT)
            }

            /// Byte position within [`page`](Self::page).
            #[inline]
            #[must_use]
            pub const fn offset(self) -> PageOffset {
                PageOffset::new(self.0 & OFFSET_MASK)
            }

            /// Whether this is the first byte of a page.
            #[inline]
            #[must_use]
            pub const fn is_aligned(self) -> bool {
                self.0 & OFFSET_MASK == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "(0x{:08X})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:08X}", self.0)
            }
        }
    };
}

address!(
    /// Address as issued by the CPU. Once paging is on it is translated
    /// through the page directory.
    VirtualAddress,
    VirtualPage,
    "VA"
);

address!(
    /// Address on the memory bus: installed RAM, firmware areas and the
    /// paging structures the CPU walks.
    PhysicalAddress,
    PhysicalPage,
    "PA"
);

impl VirtualAddress {
    /// Address of `ptr`. Lossless on the 32-bit target; on a wider host only
    /// the low 32 bits are kept.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.addr() as u32)
    }

    /// Raw pointer for this address. Only meaningful while the address is mapped.
    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as usize as *mut T
    }
}

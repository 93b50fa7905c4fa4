use crate::{PAGE_SHIFT, PageOffset, PhysicalAddress, VirtualAddress};
use core::fmt;

macro_rules! page {
    ($(#[$meta:meta])* $name:ident, $address:ident, $noun:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            /// The `index`-th page counted from address zero.
            ///
            /// The base wraps past the end of the 32-bit address space;
            /// callers keep `index < 1 << 20`.
            #[inline]
            #[must_use]
            pub const fn from_index(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.0
            }

            /// First byte of the page.
            #[inline]
            #[must_use]
            pub const fn base(self) -> $address {
                $address::new(self.0 << PAGE_SHIFT)
            }

            #[inline]
            #[must_use]
            pub const fn join(self, offset: PageOffset) -> $address {
                $address::new(self.base().as_u32() | offset.as_u32())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($noun, " {:#X}"), self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#X})"), self.0)
            }
        }
    };
}

page!(
    /// A 4 KiB page of the virtual address space, keyed by its virtual page number.
    VirtualPage,
    VirtualAddress,
    "page"
);

page!(
    /// A 4 KiB physical frame, keyed by its frame number.
    PhysicalPage,
    PhysicalAddress,
    "frame"
);

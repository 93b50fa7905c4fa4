//! # Typed i386 Addresses
//!
//! `u32` wrappers that keep virtual and physical addresses apart at compile
//! time. Without PSE the i386 paging unit maps nothing but 4 KiB pages, so
//! that is the only page granularity here.
//!
//! | Address | Page | Page index |
//! |---------|------|------------|
//! | [`VirtualAddress`] | [`VirtualPage`] | virtual page number, key of the page bitmap |
//! | [`PhysicalAddress`] | [`PhysicalPage`] | physical frame number, key of the frame bitmap |
//!
//! An address splits into its page and a [`PageOffset`]; the page joins an
//! offset back into the address.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xC000_1234);
//! let page = va.page();
//! assert_eq!(page.index(), 0xC0001);
//! assert_eq!(page.base(), VirtualAddress::new(0xC000_1000));
//! assert_eq!(va.offset().as_u32(), 0x234);
//! assert_eq!(page.join(va.offset()), va);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod address;
mod offset;
mod page;

pub use address::{PhysicalAddress, VirtualAddress};
pub use offset::PageOffset;
pub use page::{PhysicalPage, VirtualPage};

/// log2 of the page size.
pub const PAGE_SHIFT: u32 = 12;

/// Low bits of an address that select the byte within its page.
const OFFSET_MASK: u32 = (1 << PAGE_SHIFT) - 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_numbers() {
        let frame = PhysicalAddress::new(0x0040_0FFF).page();
        assert_eq!(frame.index(), 0x400);
        assert_eq!(frame.base(), PhysicalAddress::new(0x0040_0000));
        assert_eq!(PhysicalPage::from_index(0xFFFFF).base(), PhysicalAddress::new(0xFFFF_F000));
    }

    #[test]
    fn offsets_and_alignment() {
        let pa = PhysicalAddress::new(0x2000_0042);
        assert!(!pa.is_aligned());
        assert!(pa.page().base().is_aligned());
        assert_eq!(pa.page().join(pa.offset()), pa);
        assert_eq!(VirtualAddress::zero().offset(), PageOffset::new(0));
    }

    #[test]
    fn last_page_of_the_address_space() {
        let va = VirtualAddress::new(0xFFFF_FFFF);
        assert_eq!(va.page().index(), 0xFFFFF);
        assert_eq!(va.offset().as_u32(), 0xFFF);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn pointers_round_trip_on_the_low_bits() {
        let word = 0u32;
        let va = VirtualAddress::from_ptr(&raw const word);
        assert_eq!(va.as_mut_ptr::<u32>().addr() as u32, va.as_u32());
    }

    #[test]
    fn formatting() {
        assert_eq!(format!("{}", VirtualAddress::new(0xC000_0000)), "0xC0000000");
        assert_eq!(format!("{:?}", PhysicalAddress::new(0x1000)), "PA(0x00001000)");
        assert_eq!(format!("{}", PhysicalPage::from_index(0x101)), "frame 0x101");
        assert_eq!(format!("{:?}", VirtualPage::from_index(0xC0000)), "VirtualPage(0xC0000)");
    }
}

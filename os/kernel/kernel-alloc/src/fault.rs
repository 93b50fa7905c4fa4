//! Unrecoverable memory faults.
//!
//! Exhaustion is reported to the caller; everything here means the kernel's
//! own bookkeeping is broken and execution stops.

use kernel_memory_addresses::VirtualAddress;

/// A violated memory invariant. Raised through [`fatal`], never returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MemoryFault {
    #[error("cannot map unaligned virtual address {0}")]
    Misaligned(VirtualAddress),
    #[error("virtual address {0} is already mapped")]
    AlreadyMapped(VirtualAddress),
    #[error("no boot memory map was provided")]
    MissingMemoryMap,
    #[error("cannot unmap {0} inside the recursive page directory window")]
    ReservedWindow(VirtualAddress),
    #[error("page fault at {address} (eip {eip:#010X}): {reason}")]
    PageFault {
        address: VirtualAddress,
        eip: u32,
        reason: &'static str,
    },
}

/// Report `fault` and stop.
///
/// The message goes to the log first, then into a panic; the kernel's panic
/// handler prints it once more and halts the CPU.
#[cold]
#[track_caller]
pub fn fatal(fault: MemoryFault) -> ! {
    log::error!("{fault}");
    panic!("{fault}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "virtual address 0x00400000 is already mapped")]
    fn fatal_panics_with_message() {
        fatal(MemoryFault::AlreadyMapped(VirtualAddress::new(0x40_0000)));
    }

    #[test]
    fn page_fault_message() {
        let fault = MemoryFault::PageFault {
            address: VirtualAddress::new(0xDEAD_B000),
            eip: 0xC010_0042,
            reason: "Non-present page",
        };
        assert_eq!(
            fault.to_string(),
            "page fault at 0xDEADB000 (eip 0xC0100042): Non-present page"
        );
    }
}

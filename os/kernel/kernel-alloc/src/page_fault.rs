//! Page-fault policy.
//!
//! A fault on vector 14 is terminal: the handler decodes the context, reports
//! it and halts. Demand paging, copy-on-write or stack growth would replace
//! [`page_fault_handler`] with a different [`FaultHandler`].

use crate::fault::{MemoryFault, fatal};
use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::VirtualAddress;

/// Interrupt vector the CPU raises page faults on.
pub const PAGE_FAULT_VECTOR: u8 = 0x0E; // 14

/// Page-fault error code layout (32-bit protected mode).
///
/// Reference: Intel SDM Vol. 3A, §6.15 "Page-Fault Exception (#PF)".
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read or execute.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor (CPL 0–2).
    /// 1 = user mode (CPL 3).
    pub user: bool, // bit 2

    /// 1 = caused by reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch (only with PAE and NX).
    pub instruction_fetch: bool, // bit 4

    #[bits(27)]
    __: u32,
}

impl PageFaultError {
    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if !self.present() {
            "Non-present page (page not mapped)"
        } else if self.reserved_bit() {
            "Reserved bit set in a paging structure"
        } else if self.instruction_fetch() {
            "Instruction fetch on protected page"
        } else if self.write() {
            if self.user() {
                "User-mode write to protected page"
            } else {
                "Write access to protected page"
            }
        } else if self.user() {
            "User-mode read of supervisor page"
        } else {
            "Read access to protected page"
        }
    }
}

/// Everything the CPU tells us about a page fault.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageFault {
    /// Faulting linear address (CR2).
    pub address: VirtualAddress,
    /// Error code pushed by the CPU.
    pub error: PageFaultError,
    /// Instruction that faulted.
    pub eip: u32,
}

impl fmt::Display for PageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#PF at {} eip={:#010X} err={:#x}: {}",
            self.address,
            self.eip,
            self.error.into_bits(),
            self.error.explain()
        )
    }
}

/// Page-fault policy entry point.
pub type FaultHandler = fn(&PageFault) -> !;

/// The interrupt-dispatch collaborator handlers are registered with.
pub trait InterruptRegistry {
    fn register(&mut self, vector: u8, handler: FaultHandler);
}

/// Terminal page-fault policy: report and halt.
pub fn page_fault_handler(fault: &PageFault) -> ! {
    log::error!("{fault}");
    fatal(MemoryFault::PageFault {
        address: fault.address,
        eip: fault.eip,
        reason: fault.error.explain(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explains_error_codes() {
        assert_eq!(
            PageFaultError::from_bits(0b000).explain(),
            "Non-present page (page not mapped)"
        );
        assert_eq!(
            PageFaultError::from_bits(0b011).explain(),
            "Write access to protected page"
        );
        assert_eq!(
            PageFaultError::from_bits(0b101).explain(),
            "User-mode read of supervisor page"
        );
    }

    #[test]
    #[should_panic(expected = "page fault at 0xDEADB000")]
    fn handler_is_terminal() {
        page_fault_handler(&PageFault {
            address: VirtualAddress::new(0xDEAD_B000),
            error: PageFaultError::new().with_write(true),
            eip: 0xC010_0000,
        });
    }
}

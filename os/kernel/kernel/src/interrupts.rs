//! # i386 Interrupt Descriptor Table (IDT)
//!
//! 256 eight-byte gate descriptors. The table lives in a static and is
//! loaded once with `lidt`; gates are edited in place afterwards, which the
//! CPU picks up without reloading IDTR.
//!
//! ```text
//! 63            48 47 46 45 44 43    40 39      32
//! +---------------+--+-----+--+--------+---------+
//! | offset[31:16] |P | DPL |S |  type  |  zero   |
//! +---------------+--+-----+--+--------+---------+
//! 31            16 15                           0
//! +---------------+-----------------------------+
//! |   selector    |        offset[15:0]         |
//! +---------------+-----------------------------+
//! ```

pub mod page_fault;

use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};
use kernel_alloc::{FaultHandler, InterruptRegistry, PAGE_FAULT_VECTOR};
use kernel_sync::IrqSpinLock;

const _: () = assert!(size_of::<IdtEntry>() == 8);

/// The type/attribute byte of a gate.
#[bitfield(u8)]
pub struct IdtGateAttr {
    /// 0xE = 32-bit interrupt gate, 0xF = 32-bit trap gate.
    #[bits(4)]
    pub typ: u8,
    /// Must be zero for interrupt and trap gates.
    pub s: bool,
    #[bits(2)]
    pub dpl: u8,
    pub present: bool,
}

impl IdtGateAttr {
    /// Present, ring-0, 32-bit interrupt gate.
    #[inline]
    #[must_use]
    pub const fn kernel_interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_dpl(0).with_present(true)
    }
}

/// One 32-bit gate descriptor.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    zero: u8,
    attr: u8,
    offset_hi: u16,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        zero: 0,
        attr: 0,
        offset_hi: 0,
    };

    /// Gate to `handler` in code segment `selector`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(handler: u32, selector: u16, attr: IdtGateAttr) -> Self {
        Self {
            offset_lo: handler as u16,
            selector,
            zero: 0,
            attr: attr.into_bits(),
            offset_hi: (handler >> 16) as u16,
        }
    }

    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn handler(&self) -> u32 {
        (self.offset_hi as u32) << 16 | self.offset_lo as u32
    }

    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[must_use]
    pub const fn attr(&self) -> IdtGateAttr {
        IdtGateAttr::from_bits(self.attr)
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.attr().present()
    }
}

#[repr(C, align(8))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

impl Idt {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// Load this IDT into IDTR.
    ///
    /// # Safety
    /// Ring 0 only. The table must stay at this address for as long as
    /// interrupts can be delivered.
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    pub unsafe fn load(&self) {
        #[repr(C, packed)]
        struct Idtr {
            limit: u16,
            base: u32,
        }

        #[allow(clippy::cast_possible_truncation)]
        let idtr = Idtr {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as u32,
        };
        unsafe {
            core::arch::asm!(
                "lidt [{}]",
                in(reg) &raw const idtr,
                options(nostack, preserves_flags, readonly)
            );
        }
    }
}

impl Index<u8> for Idt {
    type Output = IdtEntry;
    fn index(&self, i: u8) -> &Self::Output {
        &self.entries[usize::from(i)]
    }
}

impl IndexMut<u8> for Idt {
    fn index_mut(&mut self, i: u8) -> &mut Self::Output {
        &mut self.entries[usize::from(i)]
    }
}

/// The kernel's interrupt table.
pub static IDT: IrqSpinLock<Idt> = IrqSpinLock::new(Idt::new());

/// Load [`IDT`]. Call once, before anything can fault.
///
/// # Safety
/// Ring 0 only.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub unsafe fn init() {
    IDT.with_lock(|idt| unsafe { idt.load() });
    log::info!("IDT loaded");
}

/// Registers handlers with an [`Idt`], pointing gates at the kernel's entry stubs.
pub struct IdtRegistry<'a> {
    idt: &'a mut Idt,
    selector: u16,
}

impl<'a> IdtRegistry<'a> {
    pub const fn new(idt: &'a mut Idt, selector: u16) -> Self {
        Self { idt, selector }
    }
}

impl InterruptRegistry for IdtRegistry<'_> {
    fn register(&mut self, vector: u8, handler: FaultHandler) {
        if vector != PAGE_FAULT_VECTOR {
            log::warn!("No entry stub for vector {vector}; not registering");
            return;
        }
        page_fault::set_handler(handler);
        self.idt[vector] = IdtEntry::new(
            page_fault::entry_stub_address(),
            self.selector,
            IdtGateAttr::kernel_interrupt_gate(),
        );
        log::info!("Page-fault handler registered on vector {vector}");
    }
}

/// Current code segment selector.
#[cfg(all(target_arch = "x86", target_os = "none"))]
#[must_use]
pub fn current_cs() -> u16 {
    let cs: u16;
    unsafe {
        core::arch::asm!("mov {0:x}, cs", out(reg) cs, options(nomem, nostack, preserves_flags));
    }
    cs
}

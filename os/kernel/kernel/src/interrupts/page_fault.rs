//! Vector 14 entry.
//!
//! The CPU pushes an error code, then `EIP`, `CS` and `EFLAGS`. The stub
//! passes a pointer to that frame to [`dispatch`], which reads CR2, dumps
//! what it can and hands over to the registered [`FaultHandler`]. Nothing
//! here returns to the faulting code.

use kernel_alloc::FaultHandler;
use kernel_sync::SyncOnceCell;

static HANDLER: SyncOnceCell<FaultHandler> = SyncOnceCell::new();

/// Install `handler` as the page-fault policy. The first registration wins.
pub fn set_handler(handler: FaultHandler) {
    if HANDLER.set(handler).is_err() {
        log::warn!("Page-fault handler already registered; keeping the first");
    }
}

/// What the CPU pushed, lowest address first.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct InterruptFrame {
    pub error: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Address to put into the vector 14 gate.
#[must_use]
#[allow(clippy::fn_to_numeric_cast_with_truncation)]
pub fn entry_stub_address() -> u32 {
    page_fault_entry as usize as u32
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[unsafe(naked)]
extern "C" fn page_fault_entry() {
    core::arch::naked_asm!(
        "cld",
        // [esp] is the error code; the frame starts there.
        "mov eax, esp",
        "push eax",
        "call {dispatch}",
        "2: cli",
        "hlt",
        "jmp 2b",
        dispatch = sym dispatch,
    )
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
extern "C" fn page_fault_entry() {}

#[cfg(all(target_arch = "x86", target_os = "none"))]
extern "C" fn dispatch(frame: &InterruptFrame) -> ! {
    use kernel_alloc::{PageFault, PageFaultError, page_fault_handler};
    use kernel_qemu::qemu_trace;
    use kernel_registers::cr0::Cr0;
    use kernel_registers::cr2::Cr2;
    use kernel_registers::cr3::Cr3;
    use kernel_registers::eflags::Eflags;
    use kernel_registers::LoadRegisterUnsafe;

    // SAFETY: ring 0, inside the fault handler.
    let (cr0, cr2, cr3) = unsafe { (Cr0::load_unsafe(), Cr2::load_unsafe(), Cr3::load_unsafe()) };
    let fault = PageFault {
        address: cr2.fault_address(),
        error: PageFaultError::from_bits(frame.error),
        eip: frame.eip,
    };

    qemu_trace!("\nPAGE FAULT: {fault}\n");
    qemu_trace!("{:#?}\n", fault.error);
    qemu_trace!(
        "CS={:#06X} {:?}\nCR0={:#010X} CR3={}\n",
        frame.cs,
        Eflags::from_bits(frame.eflags),
        cr0.into_bits(),
        cr3.directory_phys()
    );
    if crate::memory::is_active() {
        qemu_trace!("Table walk at CR2:\n{}\n", crate::memory::walk(fault.address));
    }

    let handler = HANDLER.get().copied().unwrap_or(page_fault_handler);
    handler(&fault)
}

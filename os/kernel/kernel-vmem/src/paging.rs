use kernel_memory_addresses::{PhysicalAddress, VirtualPage};

/// The CPU's paging unit.
///
/// Everything that touches CR0, CR3 or the TLB goes through this trait so the
/// page directory logic can run against a recording fake on the host.
pub trait PagingUnit {
    /// Point the paging unit at the directory at `directory`.
    ///
    /// # Safety
    /// `directory` must be the physical address of a fully built page
    /// directory that maps the currently executing code and stack.
    unsafe fn load_directory(&mut self, directory: PhysicalAddress);

    /// Turn on translation.
    ///
    /// # Safety
    /// A directory must have been loaded with [`load_directory`](Self::load_directory).
    unsafe fn enable_paging(&mut self);

    /// Drop any cached translation for `page`.
    fn invalidate_page(&mut self, page: VirtualPage);
}

/// The real 32-bit x86 paging unit.
#[cfg(target_arch = "x86")]
#[derive(Debug, Default)]
pub struct X86PagingUnit;

#[cfg(target_arch = "x86")]
impl PagingUnit for X86PagingUnit {
    unsafe fn load_directory(&mut self, directory: PhysicalAddress) {
        use kernel_registers::{StoreRegisterUnsafe, cr3::Cr3};
        log::debug!("Loading page directory at {directory} into CR3");
        unsafe { Cr3::from_directory_phys(directory, false, false).store_unsafe() };
    }

    unsafe fn enable_paging(&mut self) {
        use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe, cr0::Cr0};
        unsafe {
            let cr0 = Cr0::load_unsafe();
            cr0.with_pg_paging(true).store_unsafe();
        }
    }

    fn invalidate_page(&mut self, page: VirtualPage) {
        let va = page.base().as_u32();
        unsafe {
            core::arch::asm!("invlpg [{}]", in(reg) va, options(nostack, preserves_flags));
        }
    }
}

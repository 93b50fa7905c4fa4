//! # Boot Entry
//!
//! The loader jumps to `_start` at its physical address with paging off.
//! `_start` installs a temporary page directory made of 4 MiB pages that
//! maps the first 16 MiB both at 0 and at `KERNEL_BASE`, enables paging,
//! and continues in the higher half on the boot stack. From there
//! [`kernel_entry`] builds the real address space.

use crate::{boot, interrupts, memory};
use kernel_info::memory::{KERNEL_BASE, KERNEL_STACK_SIZE};
use kernel_qemu::{QemuLogger, qemu_trace};

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<KERNEL_STACK_SIZE> = Aligned([0; KERNEL_STACK_SIZE]);

static LOGGER: QemuLogger = QemuLogger::new(QemuLogger::default_level());

core::arch::global_asm!(
    r#"
    .section .multiboot, "a"
    .align 4
    .long {magic}
    .long {flags}
    .long -({magic} + {flags})

    .section .data.boot, "aw"
    .align 4096
boot_page_directory:
    .long 0x00000083, 0x00400083, 0x00800083, 0x00C00083
    .fill {kernel_slot} - 4, 4, 0
    .long 0x00000083, 0x00400083, 0x00800083, 0x00C00083
    .fill 1024 - {kernel_slot} - 4, 4, 0

    .section .text.boot, "ax"
    .global _start
_start:
    cli
    mov ecx, cr4
    or ecx, 0x10
    mov cr4, ecx
    mov ecx, offset boot_page_directory
    mov cr3, ecx
    mov ecx, cr0
    or ecx, 0x80000000
    mov cr0, ecx
    mov ecx, offset boot_higher_half
    jmp ecx

    .section .text, "ax"
boot_higher_half:
    mov esp, offset {stack} + {stack_size}
    xor ebp, ebp
    push ebx
    push eax
    call {entry}
boot_halt:
    cli
    hlt
    jmp boot_halt
    "#,
    magic = const boot::MULTIBOOT_HEADER_MAGIC,
    flags = const boot::MULTIBOOT_HEADER_FLAGS,
    kernel_slot = const KERNEL_BASE >> 22,
    stack = sym BOOT_STACK,
    stack_size = const KERNEL_STACK_SIZE,
    entry = sym kernel_entry,
);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    qemu_trace!("\nKERNEL PANIC: {info}\n");
    halt()
}

fn halt() -> ! {
    loop {
        unsafe { core::arch::asm!("cli; hlt", options(nomem, nostack)) };
    }
}

/// Higher-half entry, on the boot stack.
extern "C" fn kernel_entry(magic: u32, info: u32) -> ! {
    #[cfg(feature = "qemu")]
    qemu_trace!("Kernel reporting to QEMU!\n");
    if LOGGER.init().is_err() {
        qemu_trace!("Logger already installed\n");
    }

    // SAFETY: the boot directory identity maps the low 16 MiB.
    let memory_map = unsafe { boot::read_memory_map(magic, info) };

    // SAFETY: ring 0, interrupts are off.
    unsafe { interrupts::init() };
    let selector = interrupts::current_cs();
    interrupts::IDT.with_lock(|idt| {
        let mut registry = interrupts::IdtRegistry::new(idt, selector);
        // SAFETY: still on the boot directory, which maps the image.
        unsafe { memory::init(&memory_map, &mut registry) };
    });

    kernel_main()
}

fn kernel_main() -> ! {
    const SIZE: usize = 3 * 4096;

    match memory::get_pages(SIZE) {
        Some(base) => {
            let words = SIZE / size_of::<u32>();
            let ptr = base.as_mut_ptr::<u32>();
            // SAFETY: get_pages mapped more than SIZE bytes at `base`.
            let last = unsafe {
                for i in 0..words {
                    #[allow(clippy::cast_possible_truncation)]
                    ptr.add(i).write_volatile(i as u32);
                }
                ptr.add(words - 1).read_volatile()
            };
            log::info!("Allocated {SIZE} bytes at {base}, last word {last}");
            memory::free_pages(base, SIZE);
        }
        None => log::error!("Could not allocate {SIZE} bytes"),
    }

    log::info!("Boot complete, halting");
    halt()
}

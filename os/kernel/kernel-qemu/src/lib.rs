//! # QEMU Debug Console Support
//!
//! Output for a kernel running under QEMU, written byte by byte to the
//! `-debugcon` I/O port `0x402`. Works from the first instruction after boot:
//! no allocation, no paging, no interrupts needed.
//!
//! ## Components
//!
//! * [`QemuLogger`]: a `log::Log` implementation, one line per record in the
//!   form `[LEVEL] target: message`.
//! * [`qemu_trace!`]: `format!`-style output that bypasses `log`, for panic
//!   and fault paths.
//!
//! ## Feature System
//!
//! With the `enabled` feature (default) on a bare-metal x86 target every
//! byte goes to the port. Without it, or on any hosted target, output is
//! discarded; host builds therefore never execute `out`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::LevelFilter;
//!
//! static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);
//!
//! LOGGER.init().expect("logger initialization");
//! log::info!("Kernel subsystem initialized");
//! ```
//!
//! Capture the output on the host with:
//!
//! ```bash
//! qemu-system-i386 -kernel kernel.elf -debugcon stdio
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::{QemuLogger, write_record};

#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's debug console port.
    pub const QEMU_DEBUG_PORT: u16 = 0x402;

    #[cfg(all(feature = "enabled", target_arch = "x86", target_os = "none"))]
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[cfg(not(all(feature = "enabled", target_arch = "x86", target_os = "none")))]
    #[inline]
    pub const fn dbg_putc(_c: u8) {}

    /// `fmt::Write` over the debug port.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; the sink cannot fail.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

/// Write `format!`-style arguments straight to the debug port.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}

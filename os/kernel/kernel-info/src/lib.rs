//! # Kernel Configuration and Boot Interface
//!
//! Memory layout constants and the boot handoff data shared by the memory
//! subsystem, the kernel binary and its build script.
//!
//! * [`memory`]: page geometry, the higher-half kernel base, the identity
//!   mapped low region and the recursive page directory window.
//! * [`boot`]: the boot memory map the frame allocator is sized from.
//!
//! ### Build Script Integration
//! ```rust
//! use kernel_info::memory::{KERNEL_BASE, PHYS_LOAD};
//!
//! println!("cargo:rustc-link-arg=--defsym=KERNEL_BASE={:#x}", KERNEL_BASE);
//! println!("cargo:rustc-link-arg=--defsym=PHYS_LOAD={:#x}", PHYS_LOAD);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;

//! # Kernel Entry Point
//!
//! A multiboot-loaded, higher-half i386 kernel whose job is to bring up
//! paging and serve page allocations. On a hosted target only the
//! platform-independent parts are built, for tests.

#![cfg_attr(target_os = "none", no_std, no_main)]
#![cfg_attr(not(target_os = "none"), allow(dead_code))]
#![allow(unsafe_code)]

mod boot;
#[cfg(all(target_arch = "x86", target_os = "none"))]
mod entry;
mod interrupts;
#[cfg(all(target_arch = "x86", target_os = "none"))]
mod memory;

#[cfg(not(target_os = "none"))]
fn main() {
    println!("kernel: build for an i686 bare-metal target to get a bootable image");
}

//! # Kernel synchronization primitives
//!
//! The kernel runs on a single CPU, but interrupt handlers can preempt any
//! code that holds a lock. State shared with interrupt context goes behind an
//! [`IrqSpinLock`], which keeps interrupts off for as long as the lock is held.
//! Boot-time singletons are published through a [`SyncOnceCell`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
mod sync_once_cell;

pub use irq::{IrqGuard, IrqSpinLock, IrqSpinLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;

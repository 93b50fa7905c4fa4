//! Interrupt masking.
//!
//! On bare-metal i386 the guards below execute `cli`/`sti` and read `EFLAGS`
//! with `pushfd`. Everywhere else, host tests included, interrupts are
//! treated as permanently disabled and the guards do nothing.

use crate::{SpinLock, SpinLockGuard};
use core::ops::{Deref, DerefMut};

/// Interrupt enable flag in `EFLAGS`.
const EFLAGS_IF: u32 = 1 << 9;

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod arch {
    #[inline]
    pub fn eflags() -> u32 {
        let r: u32;
        unsafe { core::arch::asm!("pushfd; pop {}", out(reg) r, options(preserves_flags)) }
        r
    }

    #[inline]
    pub fn disable() {
        unsafe { core::arch::asm!("cli", options(nomem, nostack)) }
    }

    #[inline]
    pub fn enable() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack)) }
    }
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
mod arch {
    #[inline]
    pub const fn eflags() -> u32 {
        0
    }

    #[inline]
    pub const fn disable() {}

    #[inline]
    pub const fn enable() {}
}

/// Whether maskable interrupts are currently enabled.
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    arch::eflags() & EFLAGS_IF != 0
}

/// Disables hardware interrupts (`cli`).
///
/// # Privilege
/// Ring 0 only.
#[inline]
pub fn disable_interrupts() {
    arch::disable();
}

/// Enables hardware interrupts (`sti`).
///
/// # Privilege
/// Ring 0 only.
#[inline]
pub fn enable_interrupts() {
    arch::enable();
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` snapshots the `IF` bit. If interrupts were enabled, it
/// executes `cli`. On drop, it executes `sti` **only** if they were
/// previously enabled, so guards nest.
#[derive(Debug)]
pub struct IrqGuard {
    /// Whether interrupts were enabled (IF=1) when the guard was created.
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = interrupts_enabled();
        if enabled {
            disable_interrupts();
        }
        Self {
            were_enabled: enabled,
        }
    }

    /// Whether dropping this guard re-enables interrupts.
    #[must_use]
    pub const fn restores_interrupts(&self) -> bool {
        self.were_enabled
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            enable_interrupts();
        }
    }
}

/// A [`SpinLock`] that keeps interrupts disabled while held.
///
/// An interrupt handler that takes a plain spin lock already held by the code
/// it interrupted would spin forever on a single CPU. Masking interrupts for
/// the critical section rules that out.
///
/// # Examples
///
/// ```
/// use kernel_sync::IrqSpinLock;
///
/// static COUNTER: IrqSpinLock<u32> = IrqSpinLock::new(0);
///
/// COUNTER.with_lock(|c| *c += 1);
/// assert_eq!(*COUNTER.lock(), 1);
/// ```
#[derive(Debug)]
pub struct IrqSpinLock<T> {
    inner: SpinLock<T>,
}

impl<T> IrqSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: SpinLock::new(value),
        }
    }

    /// Disable interrupts, then spin until the lock is acquired.
    #[inline]
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T> {
        let irq = IrqGuard::new();
        let guard = self.inner.lock();
        IrqSpinLockGuard { guard, _irq: irq }
    }

    /// Try once. Interrupts are left as they were on failure.
    #[inline]
    pub fn try_lock(&self) -> Option<IrqSpinLockGuard<'_, T>> {
        let irq = IrqGuard::new();
        let guard = self.inner.try_lock()?;
        Some(IrqSpinLockGuard { guard, _irq: irq })
    }

    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock();
        f(&mut g)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

/// Guard of an [`IrqSpinLock`]. Unlocks first, then restores interrupts.
pub struct IrqSpinLockGuard<'a, T> {
    // Field order is drop order.
    guard: SpinLockGuard<'a, T>,
    _irq: IrqGuard,
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

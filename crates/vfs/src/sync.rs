//! TEAM_478: Locking and sleeping substrate.
//!
//! The lock types are the `spin` ones, re-exported so the rest of the crate
//! (and kernels embedding it) name a single API. The scheduler is not
//! available here, so the only blocking primitive the VFS needs (the forced
//! unmount backoff) goes through the [`Sleep`] hook.

use core::time::Duration;

pub use spin::{Mutex, MutexGuard, Once, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Blocks the calling thread for roughly the given duration.
///
/// Kernels hand the manager an implementation backed by their scheduler.
pub trait Sleep: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// TEAM_478: Busy-wait fallback used before a scheduler exists.
///
/// There is no clock at this layer, so the delay is approximated with a
/// calibrated number of spin-loop hints per microsecond.
#[derive(Debug, Clone, Copy)]
pub struct SpinSleep {
    spins_per_us: u32,
}

impl SpinSleep {
    pub const fn new(spins_per_us: u32) -> Self {
        Self { spins_per_us }
    }
}

impl Default for SpinSleep {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Sleep for SpinSleep {
    fn sleep(&self, duration: Duration) {
        let spins = duration
            .as_micros()
            .saturating_mul(u128::from(self.spins_per_us));
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }
}

/// TEAM_478: Host sleep, parks the OS thread.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

#[cfg(any(test, feature = "std"))]
impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

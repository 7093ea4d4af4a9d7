//! TEAM_478: The default console, the device behind stdio.

use alloc::sync::Arc;

use super::{DeviceRef, NullDevice};
use crate::sync::RwLock;

/// TEAM_478: Swappable handle to the console device.
///
/// Boot code installs the real serial driver once it is up; until then the
/// console is a [`NullDevice`]. Descriptor tables capture the device current
/// at their creation.
pub struct Console {
    device: RwLock<DeviceRef>,
}

impl Console {
    pub fn new(device: DeviceRef) -> Self {
        Self {
            device: RwLock::new(device),
        }
    }

    pub fn get(&self) -> DeviceRef {
        self.device.read().clone()
    }

    pub fn set(&self, device: DeviceRef) {
        *self.device.write() = device;
    }

    /// Interrupt-safe path: never blocks on the lock.
    pub fn emergency_write(&self, s: &str) {
        if let Some(device) = self.device.try_read() {
            device.emergency_write(s);
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Arc::new(NullDevice::new()))
    }
}

//! Settable device state.

use parking_lot::RwLock;

use crate::core::{BatteryLevel, DeviceState};

/// Device state held in memory and changed by the embedder.
#[derive(Debug)]
pub struct StaticDeviceState {
    state: RwLock<(BatteryLevel, bool)>,
}

impl Default for StaticDeviceState {
    fn default() -> Self {
        Self::new(BatteryLevel::Full, false)
    }
}

impl StaticDeviceState {
    /// Device at `level`, charging or not.
    #[must_use]
    pub fn new(level: BatteryLevel, charging: bool) -> Self {
        Self {
            state: RwLock::new((level, charging)),
        }
    }

    /// Update the battery level.
    pub fn set_battery_level(&self, level: BatteryLevel) {
        self.state.write().0 = level;
    }

    /// Update the charging flag.
    pub fn set_charging(&self, charging: bool) {
        self.state.write().1 = charging;
    }
}

impl DeviceState for StaticDeviceState {
    fn battery_level(&self) -> BatteryLevel {
        self.state.read().0
    }

    fn is_charging(&self) -> bool {
        self.state.read().1
    }
}

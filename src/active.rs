//! Currently active device profile.
//!
//! Subsystems hold an `Arc<DeviceProfile>` obtained from [`ActiveProfile::current`]
//! and keep using it for as long as they like. Re-provisioning resolves a new
//! raw configuration and swaps the reference in one step; a rejected
//! configuration leaves the previous profile in place.
//!
//! # Usage
//!
//! ```
//! use multirubro_node_esp32::{ActiveProfile, Board, RawConfig};
//!
//! let active = ActiveProfile::resolve(&RawConfig::factory_defaults(), Board::esp32()).unwrap();
//! let profile = active.current();
//! assert_eq!(profile.identity.device_id, "ESP32-001");
//! ```

use log::{info, warn};
use std::sync::{Arc, RwLock};

use crate::config::{resolve, Board, ConfigError, DeviceProfile, RawConfig};

/// Holder of the profile every subsystem reads.
#[derive(Debug)]
pub struct ActiveProfile {
    board: Board,
    profile: RwLock<Arc<DeviceProfile>>,
}

impl ActiveProfile {
    /// Wrap an already resolved profile.
    pub fn new(profile: DeviceProfile, board: Board) -> Self {
        Self {
            board,
            profile: RwLock::new(Arc::new(profile)),
        }
    }

    /// Resolve `raw` and make it the active profile.
    pub fn resolve(raw: &RawConfig, board: Board) -> Result<Self, ConfigError> {
        let profile = resolve(raw, &board)?;
        Ok(Self::new(profile, board))
    }

    /// Snapshot of the active profile.
    pub fn current(&self) -> Arc<DeviceProfile> {
        // A poisoned lock still holds a fully built profile
        match self.profile.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Board the profile was resolved against.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Resolve a new configuration and swap it in.
    ///
    /// On failure the current profile stays active and the violations are
    /// returned. Returns the newly active profile on success.
    pub fn reprovision(&self, raw: &RawConfig) -> Result<Arc<DeviceProfile>, ConfigError> {
        let profile = match resolve(raw, &self.board) {
            Ok(profile) => Arc::new(profile),
            Err(e) => {
                warn!(
                    "Re-provisioning rejected, keeping current profile: {} violation(s)",
                    e.len()
                );
                return Err(e);
            }
        };

        let mut guard = match self.profile.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::clone(&profile);
        info!(
            "Active profile replaced for device {}",
            profile.identity.device_id
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, ViolationKind};
    use std::thread;

    #[test]
    fn test_reprovision_swaps_profile() {
        let active =
            ActiveProfile::resolve(&RawConfig::factory_defaults(), Board::esp32()).unwrap();
        let before = active.current();

        let raw = RawConfig::factory_defaults().with(keys::DEVICE_ID, "ESP32-002");
        active.reprovision(&raw).unwrap();

        assert_eq!(active.current().identity.device_id, "ESP32-002");
        // Earlier snapshots are unaffected
        assert_eq!(before.identity.device_id, "ESP32-001");
    }

    #[test]
    fn test_rejected_reprovision_keeps_profile() {
        let active =
            ActiveProfile::resolve(&RawConfig::factory_defaults(), Board::esp32()).unwrap();

        let raw = RawConfig::factory_defaults().with(keys::MQTT_PORT, 0i64);
        let err = active.reprovision(&raw).unwrap_err();
        assert!(err.has(ViolationKind::OutOfRange, "mqttPort"));
        assert_eq!(active.current().network.mqtt.as_ref().unwrap().port, 1883);
    }

    #[test]
    fn test_concurrent_readers() {
        let active = Arc::new(
            ActiveProfile::resolve(&RawConfig::factory_defaults(), Board::esp32()).unwrap(),
        );

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let active = Arc::clone(&active);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let id = active.current().identity.device_id.clone();
                        assert!(id == "ESP32-001" || id == "ESP32-009");
                    }
                })
            })
            .collect();

        let raw = RawConfig::factory_defaults().with(keys::DEVICE_ID, "ESP32-009");
        active.reprovision(&raw).unwrap();

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(active.current().identity.device_id, "ESP32-009");
    }
}

//! Multi-rubro sensor node configuration library.
//!
//! Turns raw provisioning values into a validated, immutable
//! [`DeviceProfile`] for the node firmware. Everything except the NVS
//! storage layer is platform-independent and tested on the host.

pub mod active;
pub mod config;
#[cfg(feature = "esp32")]
pub mod persistence;
#[cfg(not(target_os = "espidf"))]
pub mod persistence_host;

/// Firmware version reported at startup.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used items
pub use active::ActiveProfile;
pub use config::{
    resolve, resolve_esp32, Board, ConfigError, DeviceProfile, RawConfig, RawValue, Violation,
    ViolationKind,
};

//! Node configuration.
//!
//! Raw provisioning values go in, a validated [`DeviceProfile`] comes out.
//!
//! # Components
//!
//! - [`keys`] - provisioning key names
//! - [`RawConfig`] - flat raw values from JSON, env-style pairs or factory defaults
//! - [`Board`] - per-board pin and ADC capabilities
//! - [`resolve`] / [`resolve_esp32`] - validation and profile construction
//! - [`ConfigError`] - every violation found in one resolution attempt

mod board;
mod device;
mod error;
pub mod keys;
mod network;
mod profile;
mod raw;
mod resolve;
mod secret;

pub use board::{Board, ESP32_MAX_ADC_VOLTAGE};
pub use device::{DeviceType, Rubro, SensorLimits};
pub use error::{ConfigError, Violation, ViolationKind};
pub use network::{
    ApiUrl, MqttEndpoint, NetworkSettings, Scheme, WifiConfig, DATA_ENDPOINT, MAX_PASSWORD_LEN,
    MAX_SSID_LEN, MIN_PASSWORD_LEN,
};
pub use profile::{
    AdcConfig, Calibration, DeviceProfile, Features, Identity, OtaSettings, PinMap, PinRole,
    SensorCalibration, Timing, Transport,
};
pub use raw::{RawConfig, RawConfigError, RawValue};
pub use resolve::{resolve, resolve_esp32};
pub use secret::Secret;

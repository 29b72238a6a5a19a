//! NVS persistence for the provisioning document.
//!
//! Stores the raw provisioning JSON in ESP32's Non-Volatile Storage (NVS) so
//! it survives reboots and can be replaced by a provisioning tool without
//! reflashing firmware.
//!
//! # Security
//!
//! The document holds WiFi, OTA and API credentials. Production devices
//! should enable NVS encryption.
//!
//! # Usage
//!
//! ```ignore
//! use multirubro_node_esp32::persistence;
//!
//! let mut nvs = persistence::init_nvs()?;
//! let raw = persistence::load_provisioning(&nvs).unwrap_or_else(RawConfig::factory_defaults);
//! ```

use esp_idf_svc::nvs::{EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use log::info;

use crate::config::RawConfig;

/// NVS namespace for node configuration.
const NVS_NAMESPACE: &str = "node_config";

/// NVS key for the provisioning document.
const PROVISIONING_KEY: &str = "provisioning";

/// Largest provisioning document accepted, in bytes.
const MAX_PROVISIONING_LEN: usize = 4096;

/// Load the provisioning document from NVS.
///
/// Returns `None` if nothing is stored or if the stored data is corrupted.
/// Errors are logged for debugging purposes.
pub fn load_provisioning(nvs: &EspNvs<NvsDefault>) -> Option<RawConfig> {
    let mut buf = vec![0u8; MAX_PROVISIONING_LEN];

    let bytes = match nvs.get_raw(PROVISIONING_KEY, &mut buf) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::debug!("No provisioning found in NVS");
            return None;
        }
        Err(e) => {
            log::warn!("Failed to read provisioning from NVS: {:?}", e);
            return None;
        }
    };

    let text = match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Stored provisioning is not valid UTF-8: {:?}", e);
            return None;
        }
    };

    match RawConfig::from_json_str(text) {
        Ok(raw) => Some(raw),
        Err(e) => {
            log::error!("Failed to parse stored provisioning: {}", e);
            None
        }
    }
}

/// Save the provisioning document to NVS.
pub fn save_provisioning(nvs: &mut EspNvs<NvsDefault>, raw: &RawConfig) -> Result<(), EspError> {
    let json = raw.to_json_value().to_string();
    if json.len() > MAX_PROVISIONING_LEN {
        log::error!(
            "Provisioning document too large for NVS: {} bytes (max {})",
            json.len(),
            MAX_PROVISIONING_LEN
        );
        return Err(EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_NVS_VALUE_TOO_LONG as i32 }>());
    }
    nvs.set_raw(PROVISIONING_KEY, json.as_bytes())?;
    info!("Provisioning saved to NVS ({} bytes)", json.len());
    Ok(())
}

/// Clear the stored provisioning document from NVS.
pub fn clear_provisioning(nvs: &mut EspNvs<NvsDefault>) -> Result<(), EspError> {
    nvs.remove(PROVISIONING_KEY)?;
    Ok(())
}

/// Initialize the NVS partition for node configuration.
pub fn init_nvs() -> Result<EspNvs<NvsDefault>, EspError> {
    use esp_idf_svc::nvs::EspNvsPartition;
    let partition = EspNvsPartition::<NvsDefault>::take()?;
    EspNvs::new(partition, NVS_NAMESPACE, true)
}
